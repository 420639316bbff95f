#![forbid(unsafe_code)]

//! Runtime for UniFlow applications.
//!
//! This crate provides:
//! - [`Store`]: the single state container, with synchronous change
//!   propagation to path subscriptions
//! - [`Subscription`] and [`BindingScope`] for subscription lifetimes
//! - [`BatchScope`] for deferring notifications across several writes
//! - the [`dispatch`] module: dispatcher chain and action channel
//! - [`AppBuilder`] for assembling an application with one state owner
//! - [`StoreConfig`], diagnostics, and snapshots
//!
//! # Data flow
//!
//! ```text
//! component ──emit──> ActionEmitter ──> DispatcherChain ──write──> Store
//!     ^                                                              │
//!     └──────────────────────── StateUpdate ────────────────────────┘
//! ```
//!
//! Everything is single-threaded: handles are `Rc` based and every
//! notification is delivered before the write that caused it returns.

pub mod app;
pub mod batch;
pub mod component;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
#[cfg(feature = "tracing-json")]
pub mod logging;
mod propagate;
pub mod registry;
pub mod snapshot;
pub mod store;
pub mod subscription;

pub use app::{App, AppBuilder};
pub use batch::BatchScope;
pub use component::ComponentId;
pub use config::{ConfigError, StoreConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use dispatch::{
    ActionEmitter, DispatchContext, DispatchReport, DispatchState, Dispatcher, DispatcherChain,
    DispatcherId, DispatcherNode, Emission, Flow, HandlerError, HandlerResult, HandlerTable,
};
pub use registry::{SubscriptionRegistry, UpdateCallback};
pub use snapshot::{SnapshotError, VersionedSnapshot};
pub use store::{StateUpdate, Store, UpdateCause, WeakStore};
pub use subscription::{BindingScope, Subscription};
