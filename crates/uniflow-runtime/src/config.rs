#![forbid(unsafe_code)]

//! Store configuration and application setup errors.
//!
//! [`StoreConfig`] is plain data. With the `policy-config` feature it can be
//! loaded from TOML or JSON:
//!
//! ```toml
//! diagnostics_capacity = 128
//! rollback_faulted_handlers = true
//! max_queued_actions = 256
//! log_deliveries = false
//! ```
//!
//! Missing keys take their defaults.

use std::fmt;

use serde::{Deserialize, Serialize};
use uniflow_core::NodeKind;

/// Default number of diagnostics retained by a store.
pub const DEFAULT_DIAGNOSTICS_CAPACITY: usize = 64;

/// Default bound on actions queued during a dispatch.
pub const DEFAULT_MAX_QUEUED_ACTIONS: usize = 1024;

/// Tunables for a [`Store`](crate::Store) and its dispatcher chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How many diagnostics are kept before the oldest is evicted.
    pub diagnostics_capacity: usize,
    /// Restore the state tree when a dispatcher handler fails.
    pub rollback_faulted_handlers: bool,
    /// Actions emitted while dispatching beyond this bound are dropped.
    pub max_queued_actions: usize,
    /// Emit a `debug` event for every delivered update.
    pub log_deliveries: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            diagnostics_capacity: DEFAULT_DIAGNOSTICS_CAPACITY,
            rollback_faulted_handlers: true,
            max_queued_actions: DEFAULT_MAX_QUEUED_ACTIONS,
            log_deliveries: false,
        }
    }
}

#[cfg(feature = "policy-config")]
impl StoreConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            format: "toml",
            message: e.to_string(),
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse {
            format: "json",
            message: e.to_string(),
        })
    }

    /// Load from a file; the format is chosen by extension (`.json`, else TOML).
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

/// Errors raised while assembling an application.
///
/// These are configuration mistakes surfaced at initialization; none of
/// them are recoverable at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More than one component claimed ownership of the application state.
    DuplicateApplicationState {
        /// Owner registered first.
        first: String,
        /// Owner that attempted to register second.
        second: String,
    },
    /// The initial state was not a mapping.
    StateRootNotMapping(NodeKind),
    /// A configuration document could not be parsed.
    Parse {
        /// `"toml"` or `"json"`.
        format: &'static str,
        /// Parser message.
        message: String,
    },
    /// A configuration file could not be read.
    Io {
        /// File path.
        path: String,
        /// OS error message.
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateApplicationState { first, second } => write!(
                f,
                "duplicate application state: '{second}' conflicts with '{first}'"
            ),
            Self::StateRootNotMapping(kind) => {
                write!(f, "application state must be a mapping, found {kind}")
            }
            Self::Parse { format, message } => write!(f, "invalid {format} config: {message}"),
            Self::Io { path, message } => write!(f, "cannot read config '{path}': {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}
