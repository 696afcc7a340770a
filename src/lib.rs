//! Collection requirement introspection
//!
//! Collections declare the Python and system packages they need. This crate
//! gathers those declarations from a directory of collections, drops
//! excluded requirements and collections, and merges the rest into
//! annotated requirement lists.

pub mod domain;
pub use domain::{
    CollectionId, ExclusionList, ExclusionRule, FilteredRequirements, Introspection,
    RequirementKind, RequirementSet, Specifier, filter_requirements, strip_comments,
};

/// Filesystem discovery, reading and writing of requirement files.
pub mod storage;
pub use storage::{Options, process, process_collection, write_requirements};
