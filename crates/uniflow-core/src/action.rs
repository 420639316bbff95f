#![forbid(unsafe_code)]

//! Typed action records.
//!
//! An [`Action`] is a discriminator (`type`) plus a flat payload mapping.
//! Its JSON form is `{"type": "ADD_ITEM", ...payload}`:
//!
//! ```
//! use serde_json::json;
//! use uniflow_core::action::Action;
//!
//! let action = Action::new("ADD_ITEM").with("value", json!("milk"));
//! assert_eq!(action.kind(), "ADD_ITEM");
//! assert_eq!(action.to_value(), json!({ "type": "ADD_ITEM", "value": "milk" }));
//! ```
//!
//! Actions are built by the emitter and handed to dispatchers by shared
//! reference; nothing downstream can mutate them.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the discriminator field.
pub const TYPE_FIELD: &str = "type";

/// Errors from building or reading an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The record is not a mapping.
    NotAMapping,
    /// The record has no `type` field.
    MissingType,
    /// The `type` field is not a non-empty string.
    InvalidType(String),
    /// A payload field is missing or has the wrong shape.
    Payload {
        /// Payload key.
        key: String,
        /// Why it could not be read.
        message: String,
    },
    /// The input was not valid JSON.
    Json(String),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAMapping => f.write_str("action must be a mapping"),
            Self::MissingType => write!(f, "action has no '{TYPE_FIELD}' field"),
            Self::InvalidType(found) => {
                write!(f, "action '{TYPE_FIELD}' must be a non-empty string, found {found}")
            }
            Self::Payload { key, message } => {
                write!(f, "action payload field '{key}': {message}")
            }
            Self::Json(message) => write!(f, "invalid action json: {message}"),
        }
    }
}

impl std::error::Error for ActionError {}

/// An immutable message describing an intent to change state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Action {
    kind: String,
    payload: Map<String, Value>,
}

impl Action {
    /// An action with an empty payload.
    ///
    /// An empty `kind` is allowed here but never matches a named handler.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field. The `type` key is reserved and ignored.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        debug_assert_ne!(key, TYPE_FIELD, "'type' is the action discriminator");
        if key != TYPE_FIELD {
            self.payload.insert(key, value.into());
        }
        self
    }

    /// Parse a `{"type": ..., ...}` record.
    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        let Value::Object(mut payload) = value else {
            return Err(ActionError::NotAMapping);
        };
        let kind = match payload.remove(TYPE_FIELD) {
            None => return Err(ActionError::MissingType),
            Some(Value::String(kind)) if !kind.is_empty() => kind,
            Some(other) => return Err(ActionError::InvalidType(other.to_string())),
        };
        Ok(Self { kind, payload })
    }

    /// Parse an action from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ActionError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ActionError::Json(e.to_string()))?;
        Self::from_value(value)
    }

    /// The discriminator.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Payload fields (without `type`).
    #[must_use]
    pub const fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// A raw payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Deserialize a payload field into `T`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T, ActionError> {
        let raw = self.payload.get(key).ok_or_else(|| ActionError::Payload {
            key: key.to_owned(),
            message: "missing".to_owned(),
        })?;
        T::deserialize(raw).map_err(|e| ActionError::Payload {
            key: key.to_owned(),
            message: e.to_string(),
        })
    }

    /// The full record, `type` included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut record = Map::with_capacity(self.payload.len() + 1);
        record.insert(TYPE_FIELD.to_owned(), Value::String(self.kind.clone()));
        for (key, value) in &self.payload {
            record.insert(key.clone(), value.clone());
        }
        Value::Object(record)
    }
}

impl TryFrom<Value> for Action {
    type Error = ActionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Action> for Value {
    fn from(action: Action) -> Self {
        let mut record = action.payload;
        record.insert(TYPE_FIELD.to_owned(), Value::String(action.kind));
        Self::Object(record)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}
