#![forbid(unsafe_code)]

//! Parsed locations inside a state tree.
//!
//! A [`Path`] is a sequence of typed [`Segment`]s. Its string form joins
//! segments with `.`; array elements are written `#<index>`:
//!
//! ```
//! use uniflow_core::path::{Path, Segment};
//!
//! let path: Path = "todos.#2.title".parse().unwrap();
//! assert_eq!(
//!     path.segments(),
//!     &[Segment::key("todos"), Segment::index(2), Segment::key("title")]
//! );
//! assert_eq!(path.to_string(), "todos.#2.title");
//! ```
//!
//! The empty string parses to the root path, which addresses the whole tree.
//!
//! # Invariants
//!
//! 1. `Path::parse(p.to_string()) == p` for every path built from keys that
//!    are non-empty, contain no `.` and do not start with `#`.
//! 2. Paths are immutable once built; derivation (`child_key`, `parent`)
//!    returns a new value.
//! 3. `a.relation(b)` is `Ancestor` exactly when `b.relation(a)` is
//!    `Descendant`.
//!
//! # Failure Modes
//!
//! | Input | Error |
//! |-------|-------|
//! | `"a..b"`, `".a"`, `"a."` | [`PathParseError::EmptySegment`] |
//! | `"a.#"`, `"a.#x"`, `"a.#-1"` | [`PathParseError::InvalidIndex`] |

use std::fmt;
use std::str::FromStr;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Prefix marking an array-index segment.
pub const INDEX_PREFIX: char = '#';

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Lookup of a key in a mapping.
    Key(String),
    /// Lookup of a position in an ordered sequence.
    Index(usize),
}

impl Segment {
    /// Build a key segment.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }

    /// Build an index segment.
    #[must_use]
    pub const fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// The key, if this is a key segment.
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    /// The index, if this is an index segment.
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }

    fn parse(raw: &str, input: &str, position: usize) -> Result<Self, PathParseError> {
        if raw.is_empty() {
            return Err(PathParseError::EmptySegment {
                input: input.to_owned(),
                position,
            });
        }
        let Some(digits) = raw.strip_prefix(INDEX_PREFIX) else {
            return Ok(Self::Key(raw.to_owned()));
        };
        let invalid = || PathParseError::InvalidIndex {
            input: input.to_owned(),
            segment: raw.to_owned(),
        };
        // `usize::from_str` accepts a leading `+`; paths do not.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        digits.parse::<usize>().map(Self::Index).map_err(|_| invalid())
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{INDEX_PREFIX}{index}"),
        }
    }
}

/// How two paths relate to each other.
///
/// Read `a.relation(&b)` as "a is <relation> of b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRelation {
    /// Same location.
    Equal,
    /// Strict prefix: `a` contains `b`.
    Ancestor,
    /// Strict extension: `a` lies inside `b`.
    Descendant,
    /// Neither contains the other.
    Unrelated,
}

impl PathRelation {
    /// Whether the first path is equal to or contains the second.
    #[must_use]
    pub const fn covers(self) -> bool {
        matches!(self, Self::Equal | Self::Ancestor)
    }
}

/// Errors produced while parsing a path string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathParseError {
    /// Two separators in a row, or a leading/trailing separator.
    EmptySegment {
        /// The full input string.
        input: String,
        /// Zero-based segment position.
        position: usize,
    },
    /// A `#` segment whose remainder is not a decimal index.
    InvalidIndex {
        /// The full input string.
        input: String,
        /// The offending segment, including `#`.
        segment: String,
    },
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySegment { input, position } => {
                write!(f, "empty segment at position {position} in path '{input}'")
            }
            Self::InvalidIndex { input, segment } => {
                write!(f, "invalid index segment '{segment}' in path '{input}'")
            }
        }
    }
}

impl std::error::Error for PathParseError {}

/// An immutable location in a state tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The root path (addresses the whole tree).
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a dotted path string.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        let segments = input
            .split(SEPARATOR)
            .enumerate()
            .map(|(position, raw)| Segment::parse(raw, input, position))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Build a path from already-typed segments.
    #[must_use]
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// The typed segments, root first.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The enclosing path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// The first `len` segments (clamped to the path length).
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        let len = len.min(self.segments.len());
        Self {
            segments: self.segments[..len].to_vec(),
        }
    }

    /// Append one segment.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// Append a key segment.
    ///
    /// Keys containing `.` or starting with `#` are addressable but do not
    /// survive a `Display`/`parse` round trip.
    #[must_use]
    pub fn child_key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    /// Append an index segment.
    #[must_use]
    pub fn child_index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// Concatenate `other` after `self`.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }

    /// Whether `prefix` is equal to or an ancestor of `self`.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The remainder after `prefix`, if `prefix` covers `self`.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Self) -> Option<Self> {
        self.segments
            .strip_prefix(prefix.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Whether `self` strictly contains `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len() && other.starts_with(self)
    }

    /// Whether `self` lies strictly inside `other`.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Self) -> bool {
        other.is_ancestor_of(self)
    }

    /// Relation of `self` to `other`.
    #[must_use]
    pub fn relation(&self, other: &Self) -> PathRelation {
        let shared = self
            .segments
            .iter()
            .zip(&other.segments)
            .take_while(|(a, b)| a == b)
            .count();
        match (shared == self.segments.len(), shared == other.segments.len()) {
            (true, true) => PathRelation::Equal,
            (true, false) => PathRelation::Ancestor,
            (false, true) => PathRelation::Descendant,
            (false, false) => PathRelation::Unrelated,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self::from_segments(iter)
    }
}

impl serde::Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Path {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
