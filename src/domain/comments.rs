//! Comment removal for Python requirement lines.
//!
//! | line (trimmed)                                | result                     |
//! |-----------------------------------------------|----------------------------|
//! | starts with `#`                               | dropped                    |
//! | `#` preceded by whitespace                    | comment removed            |
//! | `#` directly attached to a token (`.git#egg`) | kept, it is a URL fragment |
//! | empty after stripping                         | dropped                    |

use std::sync::LazyLock;

use regex::Regex;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s+)#.*$").expect("comment pattern is valid"));

/// Remove the comment from a single line, returning `None` if nothing is
/// left.
#[must_use]
pub fn strip_comment(line: &str) -> Option<String> {
    let stripped = COMMENT.replace(line.trim(), "");
    let stripped = stripped.trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Remove comments from a sequence of lines, dropping lines that are empty
/// afterwards.
///
/// The relative order of the surviving lines is preserved.
pub fn strip_comments<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| strip_comment(line.as_ref()))
        .collect()
}
