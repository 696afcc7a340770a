//! Walking a collections directory and gathering every declaration.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::{
    domain::{CollectionId, ExclusionError, ExclusionList, Introspection},
    storage::{
        collection::{LoadError, process_collection},
        files::{read_bindep_file, read_list, read_pip_file},
    },
};

/// Directory under the search root that holds `<namespace>/<name>`
/// collection directories.
pub const COLLECTIONS_DIR: &str = "ansible_collections";

/// Where collections are installed inside an execution environment.
pub const DEFAULT_COLLECTIONS_PATH: &str = "/usr/share/ansible/collections";

/// Files whose presence marks a directory as a collection.
pub const COLLECTION_MARKERS: [&str; 2] = ["galaxy.yml", "MANIFEST.json"];

/// Optional user-supplied inputs to [`process`].
///
/// Every file is optional; a missing file contributes nothing.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Extra Python requirements, attributed to `user`.
    pub user_pip: Option<PathBuf>,
    /// Extra system requirements, attributed to `user`.
    pub user_bindep: Option<PathBuf>,
    /// Python requirement names to exclude.
    pub exclude_pip: Option<PathBuf>,
    /// System requirement names to exclude.
    pub exclude_bindep: Option<PathBuf>,
    /// Collections whose requirements are ignored entirely.
    pub exclude_collections: Option<PathBuf>,
}

/// Find every collection directory under `root`, sorted by namespace and
/// then name.
#[must_use]
pub fn discover_collections(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root.join(COLLECTIONS_DIR))
        .min_depth(2)
        .max_depth(2)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            COLLECTION_MARKERS
                .iter()
                .any(|marker| entry.path().join(marker).is_file())
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Gather the requirements declared by every collection under `root`.
///
/// Collections matching the excluded-collections rules are skipped before
/// their files are read. The user and exclusion files in `options` are
/// recorded alongside the collection data; the result is not filtered.
///
/// # Errors
///
/// This function can fail if:
///
/// - a collection's metadata is invalid
/// - an excluded-collections rule is an invalid pattern
pub fn process(root: &Path, options: &Options) -> Result<Introspection, IntrospectError> {
    let excluded_collections = options
        .exclude_collections
        .as_deref()
        .map(read_list)
        .unwrap_or_default();
    let collection_rules = ExclusionList::new(&excluded_collections)?;

    let mut data = Introspection {
        excluded_collections,
        ..Introspection::default()
    };

    for path in discover_collections(root) {
        let id = match CollectionId::from_path(&path) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping collection at {}: {e}", path.display());
                continue;
            }
        };

        if collection_rules.matches(&id.to_string()) {
            tracing::debug!("Excluding all requirements from collection '{id}'");
            continue;
        }

        let (python, system) = process_collection(&path)?;
        tracing::info!(
            "Found collection {id} ({} python, {} system requirements)",
            python.len(),
            system.len()
        );

        if !python.is_empty() {
            data.python.insert(id.clone(), python);
        }
        if !system.is_empty() {
            data.system.insert(id, system);
        }
    }

    if let Some(path) = &options.user_pip {
        let lines = read_pip_file(path);
        if !lines.is_empty() {
            data.python.set_user(lines);
        }
    }
    if let Some(path) = &options.user_bindep {
        let lines = read_bindep_file(path);
        if !lines.is_empty() {
            data.system.set_user(lines);
        }
    }
    if let Some(path) = &options.exclude_pip {
        data.python.set_exclude(read_list(path));
    }
    if let Some(path) = &options.exclude_bindep {
        data.system.set_exclude(read_list(path));
    }

    Ok(data)
}

/// Errors that can occur while gathering requirements.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    /// A collection's declarations could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An exclusion rule is invalid.
    #[error(transparent)]
    Exclusion(#[from] ExclusionError),
}
