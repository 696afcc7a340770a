use std::{fmt, path::Path, str::FromStr};

use non_empty_string::NonEmptyString;

/// The identifier of a collection, in the form `namespace.name`.
///
/// Both segments are non-empty and neither contains a `.`.
///
/// # Examples
///
/// ```
/// use introspect::CollectionId;
///
/// let id: CollectionId = "community.general".parse().unwrap();
/// assert_eq!(id.namespace(), "community");
/// assert_eq!(id.name(), "general");
/// assert_eq!(id.to_string(), "community.general");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollectionId {
    namespace: NonEmptyString,
    name: NonEmptyString,
}

impl CollectionId {
    /// Create a collection identifier from its two segments.
    ///
    /// # Errors
    ///
    /// Returns an error if either segment is empty or contains a `.`.
    pub fn new(namespace: String, name: String) -> Result<Self, Error> {
        let namespace = segment(namespace)?;
        let name = segment(name)?;
        Ok(Self { namespace, name })
    }

    /// Derive the identifier from the last two components of a collection
    /// directory, e.g. `.../ansible_collections/community/general`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has fewer than two normal components, or
    /// if they are not valid UTF-8 segments.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let mut parts = path
            .components()
            .rev()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s),
                _ => None,
            })
            .map(|s| {
                s.to_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::Path(path.display().to_string()))
            });

        let name = parts
            .next()
            .ok_or_else(|| Error::Path(path.display().to_string()))??;
        let namespace = parts
            .next()
            .ok_or_else(|| Error::Path(path.display().to_string()))??;

        Self::new(namespace, name)
    }

    /// The namespace segment.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// The name segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

fn segment(s: String) -> Result<NonEmptyString, Error> {
    if s.contains('.') {
        return Err(Error::Segment(s));
    }
    NonEmptyString::new(s).map_err(Error::Segment)
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

impl FromStr for CollectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s.split_once('.').ok_or_else(|| Error::Syntax(s.to_string()))?;
        if namespace.is_empty() || name.is_empty() || name.contains('.') {
            return Err(Error::Syntax(s.to_string()));
        }
        Self::new(namespace.to_string(), name.to_string())
    }
}

impl TryFrom<&str> for CollectionId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl serde::Serialize for CollectionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors that can occur when constructing a [`CollectionId`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The string is not of the form `namespace.name`.
    #[error("Invalid collection identifier '{0}': expected 'namespace.name'")]
    Syntax(String),

    /// A segment is empty or contains a dot.
    #[error("Invalid collection identifier segment '{0}'")]
    Segment(String),

    /// The identifier could not be derived from a directory path.
    #[error("Cannot derive a collection identifier from path '{0}'")]
    Path(String),
}
