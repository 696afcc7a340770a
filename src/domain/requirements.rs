use std::fmt;

use serde::{Serialize, ser::SerializeMap};

use crate::domain::CollectionId;

/// The two kinds of requirement a collection can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    /// Python packages, in pip requirements format.
    Python,
    /// System packages, in bindep format.
    System,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Python => f.write_str("python"),
            Self::System => f.write_str("system"),
        }
    }
}

/// The requirement lines declared by one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequirements {
    /// The declaring collection.
    pub collection: CollectionId,
    /// Raw lines, in file order.
    pub lines: Vec<String>,
}

/// Requirements of one kind, gathered from every collection.
///
/// Collections keep the order they were inserted in. The same requirement
/// may appear under several collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSet {
    collections: Vec<CollectionRequirements>,
    user: Option<Vec<String>>,
    exclude: Vec<String>,
}

impl RequirementSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the lines declared by a collection.
    ///
    /// If the collection is already present its lines are extended rather
    /// than duplicated as a second entry.
    pub fn insert(&mut self, collection: CollectionId, lines: Vec<String>) {
        if let Some(existing) = self
            .collections
            .iter_mut()
            .find(|entry| entry.collection == collection)
        {
            existing.lines.extend(lines);
        } else {
            self.collections
                .push(CollectionRequirements { collection, lines });
        }
    }

    /// Builder-style variant of [`Self::insert`].
    #[must_use]
    pub fn with_collection(mut self, collection: CollectionId, lines: Vec<String>) -> Self {
        self.insert(collection, lines);
        self
    }

    /// Set the lines supplied directly by the user.
    pub fn set_user(&mut self, lines: Vec<String>) {
        self.user = Some(lines);
    }

    /// Builder-style variant of [`Self::set_user`].
    #[must_use]
    pub fn with_user(mut self, lines: Vec<String>) -> Self {
        self.set_user(lines);
        self
    }

    /// Record the exclusion rules supplied for this kind.
    pub fn set_exclude(&mut self, rules: Vec<String>) {
        self.exclude = rules;
    }

    /// The per-collection entries, in insertion order.
    #[must_use]
    pub fn collections(&self) -> &[CollectionRequirements] {
        &self.collections
    }

    /// The lines supplied by the user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&[String]> {
        self.user.as_deref()
    }

    /// The exclusion rules recorded for this kind.
    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Whether the set holds no collection or user lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty() && self.user.is_none()
    }
}

/// Serialized as a mapping from collection identifier to lines, followed by
/// the `user` and `exclude` entries when present.
impl Serialize for RequirementSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for entry in &self.collections {
            map.serialize_entry(&entry.collection, &entry.lines)?;
        }
        if let Some(user) = &self.user {
            map.serialize_entry("user", user)?;
        }
        if !self.exclude.is_empty() {
            map.serialize_entry("exclude", &self.exclude)?;
        }
        map.end()
    }
}

/// The unfiltered result of walking a collections directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Introspection {
    /// Python requirements.
    pub python: RequirementSet,
    /// System requirements.
    pub system: RequirementSet,
    /// Collection exclusion rules, as supplied.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_collections: Vec<String>,
}

impl Introspection {
    /// The set for the given kind.
    #[must_use]
    pub const fn requirements(&self, kind: RequirementKind) -> &RequirementSet {
        match kind {
            RequirementKind::Python => &self.python,
            RequirementKind::System => &self.system,
        }
    }
}

/// Filtered, annotated requirement lines ready to be written out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredRequirements {
    /// Python requirement lines.
    pub python: Vec<String>,
    /// System requirement lines.
    pub system: Vec<String>,
}
