#![forbid(unsafe_code)]

//! The application state tree.
//!
//! [`StateTree`] owns a mapping-rooted [`Value`] and routes every read and
//! write through [`crate::resolve`]. It carries no notification logic; the
//! runtime's store wraps it and decides who hears about a change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NodeKind, StateError};
use crate::path::Path;
use crate::resolve;

/// A mapping-rooted tree of JSON-like values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct StateTree {
    root: Value,
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Wrap an existing mapping.
    ///
    /// Returns the value back when it is not a mapping.
    pub fn from_value(root: Value) -> Result<Self, Value> {
        if root.is_object() {
            Ok(Self { root })
        } else {
            Err(root)
        }
    }

    /// The whole tree.
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.root
    }

    /// Consume the tree, returning the root mapping.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Read the value at `path`.
    pub fn get(&self, path: &Path) -> Result<&Value, StateError> {
        resolve::resolve(&self.root, path)
    }

    /// Mutable access to the value at `path`.
    pub fn get_mut(&mut self, path: &Path) -> Result<&mut Value, StateError> {
        resolve::resolve_mut(&mut self.root, path)
    }

    /// Whether `path` resolves.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        resolve::exists(&self.root, path)
    }

    /// Store `value` at `path`; see [`resolve::write`].
    pub fn set(&mut self, path: &Path, value: Value) -> Result<Option<Value>, StateError> {
        resolve::write(&mut self.root, path, value)
    }

    /// Remove the value at `path`; see [`resolve::remove`].
    pub fn remove(&mut self, path: &Path) -> Result<Value, StateError> {
        resolve::remove(&mut self.root, path)
    }

    /// Insert into the sequence at `path`.
    pub fn insert(&mut self, path: &Path, index: usize, value: Value) -> Result<(), StateError> {
        resolve::insert(&mut self.root, path, index, value)
    }

    /// Append to the sequence at `path`.
    pub fn push(&mut self, path: &Path, value: Value) -> Result<usize, StateError> {
        resolve::push(&mut self.root, path, value)
    }

    /// Length of the sequence at `path`.
    pub fn len_at(&self, path: &Path) -> Result<usize, StateError> {
        resolve::sequence_len(&self.root, path)
    }

    /// Replace the whole tree. Fails unless `root` is a mapping.
    pub fn replace(&mut self, root: Value) -> Result<Value, StateError> {
        if !root.is_object() {
            return Err(StateError::TypeMismatch {
                path: Path::root(),
                at: Path::root(),
                expected: NodeKind::Mapping,
                found: NodeKind::of(&root),
            });
        }
        Ok(std::mem::replace(&mut self.root, root))
    }
}

impl TryFrom<Value> for StateTree {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
            .map_err(|v| format!("state tree root must be a mapping, found {}", NodeKind::of(&v)))
    }
}

impl From<StateTree> for Value {
    fn from(tree: StateTree) -> Self {
        tree.root
    }
}
