//! Exclusion rules for requirement names and collection identifiers.
//!
//! A rule is either a literal, compared case-insensitively for equality, or
//! a regular expression prefixed with `~`. Expressions are case-insensitive
//! and must match the whole candidate.

use std::fmt;

use regex::{Regex, RegexBuilder};

/// Prefix marking a rule as a regular expression.
pub const PATTERN_SIGIL: char = '~';

/// Names that are never requested as system requirements, regardless of
/// user configuration.
///
/// These are either already satisfied by the base image or only needed for
/// testing collections.
pub const ALWAYS_EXCLUDED: &[&str] = &[
    // obviously already satisfied or unwanted
    "ansible",
    "ansible-base",
    "python",
    "ansible-core",
    // general python test requirements
    "tox",
    "pycodestyle",
    "yamllint",
    "pylint",
    "flake8",
    "pytest",
    "pytest-xdist",
    "coverage",
    "mock",
    "testinfra",
    // test requirements highly specific to Ansible testing
    "ansible-lint",
    "molecule",
    "galaxy-importer",
    "voluptuous",
    // already present in image for py3 environments
    "yaml",
    "pyyaml",
    "json",
];

/// A single exclusion rule.
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// Case-insensitive exact match; stored lowercased.
    Literal(String),
    /// Case-insensitive regular expression anchored at both ends.
    Pattern {
        /// The rule as written, without the sigil.
        source: String,
        /// The compiled, anchored expression.
        regex: Regex,
    },
}

impl ExclusionRule {
    /// Build a rule from its textual form.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule is a pattern that does not compile.
    pub fn new(rule: &str) -> Result<Self, Error> {
        match rule.strip_prefix(PATTERN_SIGIL) {
            Some(source) => {
                let regex = RegexBuilder::new(&format!("^(?:{source})$"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| Error::InvalidPattern {
                        pattern: rule.to_string(),
                        source: e,
                    })?;
                Ok(Self::Pattern {
                    source: source.to_string(),
                    regex,
                })
            }
            None => Ok(Self::Literal(rule.to_lowercase())),
        }
    }

    /// Whether the candidate is excluded by this rule.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Literal(literal) => candidate.to_lowercase() == *literal,
            Self::Pattern { regex, .. } => regex.is_match(candidate),
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Pattern { source, .. } => write!(f, "{PATTERN_SIGIL}{source}"),
        }
    }
}

/// An ordered list of exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    rules: Vec<ExclusionRule>,
}

impl ExclusionList {
    /// Compile a list of rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails to compile.
    pub fn new<I, S>(rules: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|rule| ExclusionRule::new(rule.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    /// The built-in list of names that are never requested as system
    /// requirements.
    #[must_use]
    pub fn always_excluded() -> Self {
        Self {
            rules: ALWAYS_EXCLUDED
                .iter()
                .map(|name| ExclusionRule::Literal((*name).to_string()))
                .collect(),
        }
    }

    /// Whether any rule matches the candidate.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(candidate))
    }

    /// Whether the list has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over the rules in order.
    pub fn iter(&self) -> impl Iterator<Item = &ExclusionRule> {
        self.rules.iter()
    }
}

/// Errors that can occur when building exclusion rules.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `~` rule is not a valid regular expression.
    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The rule as written, including the sigil.
        pattern: String,
        /// The underlying compilation error.
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("Foo", "foo", true; "literal ignores case")]
    #[test_case("foo.", "foo", false; "literal is not a pattern")]
    #[test_case("foo.", "foox", false; "literal dot is literal")]
    #[test_case("~foo.", "kungfoo", false; "pattern is anchored at start")]
    #[test_case("~foo.", "foobar", false; "pattern is anchored at end")]
    #[test_case("~foo.", "foob", true; "pattern full match")]
    #[test_case("~Sh.*", "shimmy", true; "pattern ignores case")]
    #[test_case("~^.+ab", "aaab", true; "explicit anchor")]
    #[test_case("~^.+ab", "ab", false; "one or more before suffix")]
    #[test_case("~A\\..+", "a.b", true; "collection pattern")]
    #[test_case("~b.c", "ab.cd", false; "collection substring")]
    #[test_case("E.F", "e.f", true; "collection literal")]
    #[test_case("~a|b", "ab", false; "alternation is grouped")]
    fn rule_matches(rule: &str, candidate: &str, expected: bool) {
        let rule = ExclusionRule::new(rule).unwrap();
        assert_eq!(rule.matches(candidate), expected);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = ExclusionList::new(["fine", "~(unclosed"]).unwrap_err();
        let Error::InvalidPattern { pattern, .. } = err;
        assert_eq!(pattern, "~(unclosed");
    }

    #[test]
    fn literal_that_looks_like_a_bad_pattern_is_fine() {
        let list = ExclusionList::new(["(unclosed"]).unwrap();
        assert!(list.matches("(UNCLOSED"));
    }

    #[test]
    fn list_matches_any_rule() {
        let list = ExclusionList::new(["Foo", "foo.", "~foo.", "~Sh.*", "~^.+ab"]).unwrap();

        assert!(list.matches("foo"));
        assert!(list.matches("shimmy"));
        assert!(list.matches("aaab"));
        assert!(!list.matches("kungfoo"));
        assert!(!list.matches("foobar"));
        assert!(!list.matches("ab"));
    }

    #[test]
    fn empty_list_matches_nothing() {
        let list = ExclusionList::default();
        assert!(list.is_empty());
        assert!(!list.matches("anything"));
    }

    #[test]
    fn always_excluded_covers_interpreter() {
        let list = ExclusionList::always_excluded();
        assert!(list.matches("python"));
        assert!(list.matches("Ansible-Core"));
        assert!(!list.matches("python3-all-dev"));
    }

    #[test]
    fn display_round_trips_sigil() {
        let list = ExclusionList::new(["Foo", "~Sh.*"]).unwrap();
        let shown: Vec<_> = list.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["foo", "~Sh.*"]);
    }
}
