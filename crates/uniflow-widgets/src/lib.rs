#![forbid(unsafe_code)]

//! Collection bindings for UniFlow.

pub mod list;

pub use list::{ItemUpdate, ListView, SELECTED_FIELD, is_marked, item_path};
