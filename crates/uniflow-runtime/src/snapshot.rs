#![forbid(unsafe_code)]

//! Version-tagged state snapshots.
//!
//! A [`VersionedSnapshot`] wraps a copy of the state tree with a schema
//! version so persisted state from an incompatible layout is rejected on
//! restore rather than silently loaded.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Version mismatch | `SnapshotError::VersionMismatch`, store untouched |
//! | Malformed JSON or non-mapping state | `SnapshotError::Decode` |

use std::fmt;

use serde::{Deserialize, Serialize};
use uniflow_core::StateTree;

use crate::store::Store;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A state tree tagged with its schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedSnapshot {
    /// Schema version the state was written with.
    pub version: u32,
    /// The captured tree.
    pub state: StateTree,
}

impl VersionedSnapshot {
    /// Wrap `state` with the current version.
    #[must_use]
    pub const fn new(state: StateTree) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Parse from a JSON string. The version is not checked here.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

/// Errors from restoring a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot was written by a different schema version.
    VersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the snapshot.
        found: u32,
    },
    /// The snapshot could not be (de)serialized.
    Decode(String),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionMismatch { expected, found } => {
                write!(f, "snapshot version {found} is not supported (expected {expected})")
            }
            Self::Decode(message) => write!(f, "invalid snapshot: {message}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl Store {
    /// Capture the current tree.
    #[must_use]
    pub fn snapshot(&self) -> VersionedSnapshot {
        VersionedSnapshot::new(self.tree())
    }

    /// Replace the tree with `snapshot` and propagate it as a root change.
    pub fn restore(&self, snapshot: VersionedSnapshot) -> Result<(), SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version,
            });
        }
        tracing::debug!(version = snapshot.version, "restore snapshot");
        self.replace_root(snapshot.state.into_value())
            .map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}
