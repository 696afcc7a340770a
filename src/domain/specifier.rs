use std::{fmt, str::FromStr};

/// A Python dependency specifier.
///
/// Format:
/// `{NAME}[{EXTRAS}] {VERSION | @ URL} ; {MARKER}`, where:
/// - `NAME` starts and ends with an ASCII letter or digit, and may contain
///   `.`, `_` and `-` in between
/// - `EXTRAS` is an optional, comma separated list of names in brackets
/// - `VERSION` is one or more comma separated clauses such as `>=1.0`,
///   optionally wrapped in parentheses
/// - `URL` is a direct reference, e.g. `@ git+https://host/repo.git`
/// - `MARKER` is an environment marker, kept as opaque text
///
/// Examples: `requests`, `foo[ext1,ext3] == 1`,
/// `name [fred,bar] @ http://foo.com ; python_version=='2.7'`
///
/// Anything else (installer flags, bare URLs, VCS references) fails to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    name: String,
    extras: Vec<String>,
    qualifier: Option<Qualifier>,
    marker: Option<String>,
}

/// What follows the name and extras of a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    /// One or more version clauses, e.g. `>=3,<4`.
    Version(Vec<Clause>),
    /// A direct reference, e.g. `@ http://foo.com`.
    Url(String),
}

/// A single version clause, e.g. `>=3.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// The comparison operator.
    pub operator: Operator,
    /// The version text, not validated beyond its character set.
    pub version: String,
}

/// A version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `===`
    ArbitraryEqual,
    /// `~=`
    Compatible,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `<`
    Less,
    /// `>`
    Greater,
}

impl Operator {
    // Longest tokens first so that `===` is not read as `==`.
    const ALL: [Self; 8] = [
        Self::ArbitraryEqual,
        Self::Compatible,
        Self::Equal,
        Self::NotEqual,
        Self::LessEqual,
        Self::GreaterEqual,
        Self::Less,
        Self::Greater,
    ];

    /// The textual form of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArbitraryEqual => "===",
            Self::Compatible => "~=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Less => "<",
            Self::Greater => ">",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Specifier {
    /// The distribution name, as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The requested extras, in declaration order.
    #[must_use]
    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    /// The version constraint or direct reference, if any.
    #[must_use]
    pub const fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    /// The environment marker, if any.
    #[must_use]
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }
}

/// Errors that can occur while parsing a [`Specifier`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The line does not start with a valid distribution name.
    #[error("Invalid name in specifier '{0}'")]
    Name(String),

    /// The extras list is malformed.
    #[error("Invalid extras in specifier '{0}'")]
    Extras(String),

    /// A version clause is malformed.
    #[error("Invalid version constraint in specifier '{0}'")]
    Version(String),

    /// `@` was not followed by a URL.
    #[error("Missing URL after '@' in specifier '{0}'")]
    Url(String),

    /// `;` was not followed by a marker.
    #[error("Empty environment marker in specifier '{0}'")]
    Marker(String),

    /// Input remained after a complete specifier.
    #[error("Unexpected input at position {position} in specifier '{input}'")]
    Trailing {
        /// The full line.
        input: String,
        /// Byte offset of the first unexpected character.
        position: usize,
    },
}

impl FromStr for Specifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cursor = Cursor::new(s);

        cursor.skip_whitespace();
        let name = cursor
            .identifier()
            .ok_or_else(|| Error::Name(s.to_string()))?
            .to_string();

        cursor.skip_whitespace();
        let extras = if cursor.eat(b'[') {
            cursor.extras().ok_or_else(|| Error::Extras(s.to_string()))?
        } else {
            Vec::new()
        };

        cursor.skip_whitespace();
        let qualifier = if cursor.eat(b'@') {
            cursor.skip_whitespace();
            let url = cursor.take_while(|b| !b.is_ascii_whitespace());
            if url.is_empty() {
                return Err(Error::Url(s.to_string()));
            }
            Some(Qualifier::Url(url.to_string()))
        } else if cursor.peek().is_some_and(|b| b"(<>=!~".contains(&b)) {
            let clauses = cursor
                .version_clauses()
                .ok_or_else(|| Error::Version(s.to_string()))?;
            Some(Qualifier::Version(clauses))
        } else {
            None
        };

        cursor.skip_whitespace();
        let marker = if cursor.eat(b';') {
            let marker = cursor.rest().trim();
            if marker.is_empty() {
                return Err(Error::Marker(s.to_string()));
            }
            Some(marker.to_string())
        } else {
            None
        };

        if !cursor.is_done() {
            return Err(Error::Trailing {
                input: s.to_string(),
                position: cursor.pos,
            });
        }

        Ok(Self {
            name,
            extras,
            qualifier,
            marker,
        })
    }
}

impl TryFrom<&str> for Specifier {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

/// Byte cursor over a single line.
///
/// Only ever advances past ASCII bytes or up to an ASCII delimiter, so every
/// position it stops at is a valid `str` boundary.
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, token: &str) -> bool {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    fn rest(&mut self) -> &'a str {
        let rest = &self.input[self.pos..];
        self.pos = self.input.len();
        rest
    }

    const fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// A name or extra: alphanumeric at both ends, `.`, `_`, `-` inside.
    fn identifier(&mut self) -> Option<&'a str> {
        if !self.peek().is_some_and(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        let ident = self.take_while(|b| b.is_ascii_alphanumeric() || b"._-".contains(&b));
        ident
            .as_bytes()
            .last()
            .is_some_and(u8::is_ascii_alphanumeric)
            .then_some(ident)
    }

    /// The body of an extras list; the opening bracket is already consumed.
    fn extras(&mut self) -> Option<Vec<String>> {
        let mut extras = Vec::new();
        self.skip_whitespace();
        if self.eat(b']') {
            return Some(extras);
        }
        loop {
            self.skip_whitespace();
            extras.push(self.identifier()?.to_string());
            self.skip_whitespace();
            if self.eat(b']') {
                return Some(extras);
            }
            if !self.eat(b',') {
                return None;
            }
        }
    }

    fn operator(&mut self) -> Option<Operator> {
        Operator::ALL
            .into_iter()
            .find(|op| self.eat_str(op.as_str()))
    }

    fn version_clauses(&mut self) -> Option<Vec<Clause>> {
        let parenthesised = self.eat(b'(');
        let mut clauses = Vec::new();
        loop {
            self.skip_whitespace();
            let operator = self.operator()?;
            self.skip_whitespace();
            let version =
                self.take_while(|b| b.is_ascii_alphanumeric() || b"-_.*+!".contains(&b));
            if version.is_empty() {
                return None;
            }
            clauses.push(Clause {
                operator,
                version: version.to_string(),
            });
            self.skip_whitespace();
            if !self.eat(b',') {
                break;
            }
        }
        if parenthesised {
            self.skip_whitespace();
            if !self.eat(b')') {
                return None;
            }
        }
        Some(clauses)
    }
}
