#![forbid(unsafe_code)]

//! UniFlow: unidirectional state flow for component trees.
//!
//! One state tree per application, read through path subscriptions and
//! written only by dispatchers reacting to actions.
//!
//! ```ignore
//! use uniflow::prelude::*;
//!
//! let todos = Path::parse("todos")?;
//! let app = AppBuilder::new()
//!     .application_state("todo-app", json!({ "todos": [] }))
//!     .dispatcher(DispatcherNode::new(HandlerTable::new("todos").on("ADD_ITEM", {
//!         let todos = todos.clone();
//!         move |action, ctx| {
//!             let text: String = action.field("text")?;
//!             ctx.store().push(&todos, json!({ "text": text }))?;
//!             Ok(Flow::Stop)
//!         }
//!     })))
//!     .build()?;
//!
//! let list = ListView::attach(app.store(), todos, |item| {
//!     println!("#{} = {}", item.index, item.value);
//! });
//! app.emit(Action::new("ADD_ITEM").with("text", "milk"));
//! assert_eq!(list.len(), 1);
//! ```

pub use uniflow_core as core;
pub use uniflow_runtime as runtime;
#[cfg(feature = "widgets")]
pub use uniflow_widgets as widgets;

pub use uniflow_core::{Action, ActionError, Path, PathParseError, StateError, StateTree, Value};
pub use uniflow_runtime::{
    ActionEmitter, App, AppBuilder, BindingScope, ComponentId, ConfigError, DispatchContext,
    DispatchReport, DispatchState, Dispatcher, DispatcherChain, DispatcherNode, Emission, Flow,
    HandlerError, HandlerResult, HandlerTable, StateUpdate, Store, StoreConfig, Subscription,
    UpdateCause,
};

/// Everything an application typically needs.
pub mod prelude {
    pub use serde_json::json;

    pub use uniflow_core::{Action, Path, StateTree, Value};
    pub use uniflow_runtime::{
        ActionEmitter, App, AppBuilder, BindingScope, ComponentId, DispatchContext, Dispatcher,
        DispatcherNode, Flow, HandlerError, HandlerResult, HandlerTable, StateUpdate, Store,
        Subscription,
    };
    #[cfg(feature = "widgets")]
    pub use uniflow_widgets::{ItemUpdate, ListView};
}
