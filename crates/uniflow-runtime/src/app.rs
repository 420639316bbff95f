#![forbid(unsafe_code)]

//! Application assembly.
//!
//! An application has exactly one state tree, owned by one root component.
//! [`AppBuilder`] enforces that at initialization and wires the store to a
//! dispatcher chain.
//!
//! ```ignore
//! let app = AppBuilder::new()
//!     .application_state("todo-app", json!({ "items": [] }))
//!     .dispatcher(DispatcherNode::new(todo_handlers()))
//!     .build()?;
//! app.emit(Action::new("ADD_ITEM").with("text", "milk"));
//! ```

use serde_json::{Map, Value};
use uniflow_core::{Action, NodeKind, StateTree};

use crate::config::{ConfigError, StoreConfig};
use crate::dispatch::{ActionEmitter, DispatcherChain, DispatcherNode, Emission};
use crate::store::Store;

/// Builder for an [`App`].
#[derive(Debug, Default)]
pub struct AppBuilder {
    owner: Option<String>,
    state: Option<Value>,
    duplicate: Option<String>,
    config: StoreConfig,
    dispatchers: Vec<DispatcherNode>,
}

impl AppBuilder {
    /// A builder with default configuration and no state owner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `owner` as the holder of the application state.
    ///
    /// Declaring a second owner is a configuration error reported by
    /// [`build`](Self::build).
    #[must_use]
    pub fn application_state(mut self, owner: impl Into<String>, state: Value) -> Self {
        let owner = owner.into();
        if self.owner.is_some() {
            tracing::error!(owner = %owner, "second application state declared");
            self.duplicate.get_or_insert(owner);
        } else {
            self.owner = Some(owner);
            self.state = Some(state);
        }
        self
    }

    /// Use `config` for the store and chain.
    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a top-level dispatcher (with its subtree) after earlier ones.
    #[must_use]
    pub fn dispatcher(mut self, node: DispatcherNode) -> Self {
        self.dispatchers.push(node);
        self
    }

    /// Validate and assemble.
    pub fn build(self) -> Result<App, ConfigError> {
        if let (Some(first), Some(second)) = (&self.owner, self.duplicate) {
            return Err(ConfigError::DuplicateApplicationState {
                first: first.clone(),
                second,
            });
        }
        let state = self.state.unwrap_or_else(|| Value::Object(Map::new()));
        let tree = StateTree::from_value(state)
            .map_err(|value| ConfigError::StateRootNotMapping(NodeKind::of(&value)))?;

        let mut chain = DispatcherChain::new();
        for node in self.dispatchers {
            chain.attach_root(node);
        }
        tracing::info!(
            owner = self.owner.as_deref().unwrap_or("<default>"),
            dispatchers = chain.len(),
            "application assembled"
        );
        let store = Store::with_config(tree, self.config);
        let emitter = ActionEmitter::new(store.clone(), chain);
        Ok(App { store, emitter })
    }
}

/// An assembled application: the store plus its action channel.
#[derive(Debug, Clone)]
pub struct App {
    store: Store,
    emitter: ActionEmitter,
}

impl App {
    /// The application store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// The action channel; clone it into emitting components.
    #[must_use]
    pub const fn emitter(&self) -> &ActionEmitter {
        &self.emitter
    }

    /// Emit an action.
    pub fn emit(&self, action: Action) -> Emission {
        self.emitter.emit(action)
    }
}
