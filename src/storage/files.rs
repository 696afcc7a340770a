//! Reading and writing plain-text requirement files.
//!
//! Every reader treats a missing or unreadable file as empty. Writes go to a
//! sibling temporary file first and are renamed into place, so a destination
//! is never left half-written.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Read a file's contents, or `None` if it cannot be read.
fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Expected requirements file not present at: {}", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

/// Read a list file: one entry per line, surrounding whitespace removed,
/// blank lines ignored.
///
/// Used for exclusion lists.
#[must_use]
pub fn read_list(path: &Path) -> Vec<String> {
    read_optional(path)
        .map(|content| parse_list(&content))
        .unwrap_or_default()
}

fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a pip requirements file.
///
/// Blank lines are skipped. `-r FILE` and `--requirement FILE` lines are
/// replaced by the lines of the referenced file, resolved relative to the
/// directory of the file that includes it. Everything else is kept verbatim.
#[must_use]
pub fn read_pip_file(path: &Path) -> Vec<String> {
    let mut stack = Vec::new();
    read_pip_file_nested(path, &mut stack)
}

fn read_pip_file_nested(path: &Path, stack: &mut Vec<PathBuf>) -> Vec<String> {
    let identity = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&identity) {
        tracing::warn!("Ignoring recursive include of {}", path.display());
        return Vec::new();
    }

    let Some(content) = read_optional(path) else {
        return Vec::new();
    };

    stack.push(identity);
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut lines = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match include_target(line) {
            Some(target) => {
                tracing::debug!("Including {target} from {}", path.display());
                lines.extend(read_pip_file_nested(&base.join(target), stack));
            }
            None => lines.push(line.to_string()),
        }
    }
    stack.pop();

    lines
}

/// The file named by an include directive, if the line is one.
fn include_target(line: &str) -> Option<&str> {
    let rest = line
        .strip_prefix("--requirement")
        .or_else(|| line.strip_prefix("-r"))?;
    let target = rest
        .strip_prefix('=')
        .unwrap_or(rest)
        .trim();
    (!target.is_empty()).then_some(target)
}

/// Read a bindep file.
///
/// Lines starting with `#` are skipped; remaining non-blank lines are kept
/// with surrounding whitespace removed.
#[must_use]
pub fn read_bindep_file(path: &Path) -> Vec<String> {
    read_optional(path)
        .map(|content| bindep_lines(content.lines()))
        .unwrap_or_default()
}

/// Apply the bindep line rules to already-split lines.
pub(crate) fn bindep_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref();
            if line.starts_with('#') {
                return None;
            }
            let line = line.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect()
}

/// Whether a file exists and contains anything besides whitespace.
#[must_use]
pub fn has_content(path: &Path) -> bool {
    fs::read_to_string(path).is_ok_and(|content| !content.trim().is_empty())
}

/// Write requirement lines to a file, one per line with a trailing newline.
///
/// Parent directories are created if needed. The file is replaced
/// atomically.
///
/// # Errors
///
/// Returns an error if the file or its parent directories cannot be
/// written.
pub fn write_requirements(path: &Path, lines: &[String]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut content = lines.join("\n");
    content.push('\n');

    let mut temp_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let result = write_synced(&temp_path, content.as_bytes())
        .and_then(|()| fs::rename(&temp_path, path));

    if result.is_err() {
        remove_temp_file(&temp_path);
    }
    result
}

fn write_synced(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn remove_temp_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove temporary file {}: {e}", path.display()),
    }
}
