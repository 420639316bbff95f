#![forbid(unsafe_code)]

//! Lookup and write failures against a state tree.

use std::fmt;

use serde_json::Value;

use crate::path::Path;

/// Shape of a state-tree node, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// JSON `null`.
    Null,
    /// Boolean scalar.
    Bool,
    /// Numeric scalar.
    Number,
    /// String scalar.
    String,
    /// Ordered sequence.
    Sequence,
    /// String-keyed mapping.
    Mapping,
}

impl NodeKind {
    /// Classify a value.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Mapping,
        }
    }

    /// Lower-case name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from resolving or writing a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// A segment named a key or index that does not exist.
    PathNotFound {
        /// The full path being resolved.
        path: Path,
        /// The prefix that could not be resolved.
        at: Path,
    },
    /// A segment expected a sequence but found a mapping (or vice versa),
    /// or tried to descend into a scalar.
    TypeMismatch {
        /// The full path being resolved.
        path: Path,
        /// The prefix whose parent had the wrong shape.
        at: Path,
        /// Shape the segment needed.
        expected: NodeKind,
        /// Shape actually found.
        found: NodeKind,
    },
}

impl StateError {
    /// The full path the failing operation was given.
    #[must_use]
    pub const fn path(&self) -> &Path {
        match self {
            Self::PathNotFound { path, .. } | Self::TypeMismatch { path, .. } => path,
        }
    }

    /// Whether this is a missing-location error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotFound { path, at } => {
                write!(f, "path not found: '{path}' (missing '{at}')")
            }
            Self::TypeMismatch {
                path,
                at,
                expected,
                found,
            } => write!(
                f,
                "type mismatch at '{at}' in '{path}': expected {expected}, found {found}"
            ),
        }
    }
}

impl std::error::Error for StateError {}
