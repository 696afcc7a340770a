//! Domain models for requirement introspection.
//!
//! This module contains the core types: collection identifiers, dependency
//! specifiers, exclusion rules, per-collection requirement sets, and the
//! filter that merges them into annotated requirement lists.

/// Collection identifiers (`namespace.name`).
pub mod collection;
pub use collection::{CollectionId, Error as CollectionIdError};

/// Comment removal for Python requirement lines.
pub mod comments;
pub use comments::{strip_comment, strip_comments};

pub mod exclusion;
pub use exclusion::{Error as ExclusionError, ExclusionList, ExclusionRule};

pub mod filter;
pub use filter::filter_requirements;

mod requirements;
pub use requirements::{
    CollectionRequirements, FilteredRequirements, Introspection, RequirementKind, RequirementSet,
};

/// Python dependency specifier parsing.
pub mod specifier;
pub use specifier::{Error as SpecifierError, Specifier};
