pub mod aggregate;
pub mod collection;
pub mod files;

pub use aggregate::{
    COLLECTIONS_DIR, DEFAULT_COLLECTIONS_PATH, IntrospectError, Options, discover_collections,
    process,
};
pub use collection::{CollectionDefinition, LoadError, Source, process_collection};
pub use files::{read_bindep_file, read_list, read_pip_file, write_requirements};
