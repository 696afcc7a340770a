//! Requirement declarations of a single collection.
//!
//! A collection may carry `meta/execution-environment.yml` (or `.yaml`)
//! naming its requirement files:
//!
//! ```yaml
//! dependencies:
//!   python: requirements-ee.txt
//!   system: bindep-ee.txt
//! ```
//!
//! Entries may also be inline lists of requirement strings. Any kind not
//! named there falls back to the default file name in the collection root.

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    domain::RequirementKind,
    storage::files::{bindep_lines, has_content, read_bindep_file, read_pip_file},
};

/// Directory, relative to the collection root, holding the metadata file.
pub const METADATA_DIR: &str = "meta";

/// File stem of the execution-environment metadata file.
pub const METADATA_STEM: &str = "execution-environment";

/// Recognised metadata extensions, in order of precedence.
pub const METADATA_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Default Python requirements file name.
pub const DEFAULT_PYTHON_FILE: &str = "requirements.txt";

/// Default system requirements file name.
pub const DEFAULT_SYSTEM_FILE: &str = "bindep.txt";

/// Where a collection's requirements of one kind come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Source {
    /// A file, relative to the collection root.
    File(String),
    /// Requirements listed directly in the metadata.
    Inline(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    dependencies: Option<Dependencies>,
}

#[derive(Debug, Default, Deserialize)]
struct Dependencies {
    python: Option<Source>,
    system: Option<Source>,
}

/// The requirement declarations of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDefinition {
    root: PathBuf,
    metadata: Option<PathBuf>,
    python: Option<Source>,
    system: Option<Source>,
}

impl CollectionDefinition {
    /// Inspect the collection rooted at `root`.
    ///
    /// # Errors
    ///
    /// This method can fail if:
    ///
    /// - the metadata file exists but cannot be read or parsed
    /// - the metadata names a file by absolute path or outside the collection
    pub fn load(root: &Path) -> Result<Self, LoadError> {
        let metadata_path = METADATA_EXTENSIONS
            .iter()
            .map(|ext| {
                root.join(METADATA_DIR)
                    .join(format!("{METADATA_STEM}.{ext}"))
            })
            .find(|path| path.is_file());

        let dependencies = match &metadata_path {
            Some(path) => {
                tracing::debug!("Reading collection metadata from {}", path.display());
                read_metadata(path)?
            }
            None => Dependencies::default(),
        };

        let python = dependencies
            .python
            .or_else(|| default_source(root, DEFAULT_PYTHON_FILE));
        let system = dependencies
            .system
            .or_else(|| default_source(root, DEFAULT_SYSTEM_FILE));

        for source in [&python, &system].into_iter().flatten() {
            if let Source::File(file) = source {
                check_relative(root, file)?;
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            metadata: metadata_path,
            python,
            system,
        })
    }

    /// The collection root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The metadata file that was read, if any.
    #[must_use]
    pub fn metadata_path(&self) -> Option<&Path> {
        self.metadata.as_deref()
    }

    /// The declared source for a kind of requirement.
    #[must_use]
    pub const fn dependency(&self, kind: RequirementKind) -> Option<&Source> {
        match kind {
            RequirementKind::Python => self.python.as_ref(),
            RequirementKind::System => self.system.as_ref(),
        }
    }

    /// Read the raw requirement lines of a kind.
    ///
    /// Files that are declared but missing yield no lines.
    #[must_use]
    pub fn requirements(&self, kind: RequirementKind) -> Vec<String> {
        match (self.dependency(kind), kind) {
            (None, _) => Vec::new(),
            (Some(Source::File(file)), RequirementKind::Python) => {
                read_pip_file(&self.root.join(file))
            }
            (Some(Source::File(file)), RequirementKind::System) => {
                read_bindep_file(&self.root.join(file))
            }
            (Some(Source::Inline(lines)), RequirementKind::Python) => lines
                .iter()
                .filter(|line| !line.trim().is_empty())
                .cloned()
                .collect(),
            (Some(Source::Inline(lines)), RequirementKind::System) => bindep_lines(lines),
        }
    }
}

fn read_metadata(path: &Path) -> Result<Dependencies, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Dependencies::default());
    }
    let metadata: Option<Metadata> =
        serde_yaml::from_str(&content).map_err(|source| LoadError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(metadata
        .and_then(|metadata| metadata.dependencies)
        .unwrap_or_default())
}

fn default_source(root: &Path, file: &str) -> Option<Source> {
    has_content(&root.join(file)).then(|| Source::File(file.to_string()))
}

fn check_relative(root: &Path, file: &str) -> Result<(), LoadError> {
    let path = Path::new(file);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(LoadError::UnsafePath {
            collection: root.to_path_buf(),
            file: file.to_string(),
        });
    }
    Ok(())
}

/// Read the Python and system requirement lines of one collection.
///
/// # Errors
///
/// Returns an error if the collection metadata is invalid. Missing
/// requirement files are not an error.
pub fn process_collection(root: &Path) -> Result<(Vec<String>, Vec<String>), LoadError> {
    let definition = CollectionDefinition::load(root)?;
    Ok((
        definition.requirements(RequirementKind::Python),
        definition.requirements(RequirementKind::System),
    ))
}

/// Errors that can occur while reading a collection's declarations.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The metadata file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The metadata file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The metadata file is not valid YAML of the expected shape.
    #[error("Invalid collection metadata in {path}: {source}")]
    Metadata {
        /// The metadata file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },

    /// A requirements file is named by absolute path or escapes the
    /// collection.
    #[error(
        "Collection {collection} must reference requirements files by a path relative to its \
         root, got '{file}'"
    )]
    UnsafePath {
        /// The collection root.
        collection: PathBuf,
        /// The offending entry.
        file: String,
    },
}
