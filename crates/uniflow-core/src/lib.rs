#![forbid(unsafe_code)]

//! Core data types for UniFlow.
//!
//! This crate provides:
//! - [`Path`] for parsed, typed state-tree locations
//! - [`resolve`] for reading and writing a tree through a path
//! - [`StateTree`] for the mapping-rooted application state
//! - [`Action`] for typed, immutable intent messages

pub mod action;
pub mod error;
pub mod path;
pub mod resolve;
pub mod tree;

pub use action::{Action, ActionError};
pub use error::{NodeKind, StateError};
pub use path::{Path, PathParseError, PathRelation, Segment};
pub use tree::StateTree;

/// Re-export of the value type stored in a [`StateTree`].
pub use serde_json::Value;
