#![forbid(unsafe_code)]

//! Action dispatch.
//!
//! Components never write application state in response to user input
//! directly. They emit an [`Action`] through an [`ActionEmitter`]; the action
//! is offered to each [`Dispatcher`] of a [`DispatcherChain`] in turn until
//! one consumes it.
//!
//! # Lifecycle
//!
//! ```text
//! Emitted ──> Dispatching ──┬──> Consumed   (a handler returned Flow::Stop)
//!                           └──> Exhausted  (every handler declined)
//! ```
//!
//! # Ordering
//!
//! Dispatchers form a tree. Children are offered an action before their
//! parent (post-order), so a specialized descendant overrides a generic
//! ancestor. Siblings keep declaration order.
//!
//! # Invariants
//!
//! 1. An action is offered to each dispatcher at most once.
//! 2. No dispatcher after the consuming one sees the action.
//! 3. An action emitted during dispatch is queued and dispatched after the
//!    current one, in emission order, before `emit` returns.
//! 4. `Exhausted` is a normal outcome, not an error.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Handler returns `Err` | State rolled back (configurable), fault recorded, next dispatcher runs |
//! | Queue bound exceeded | Action dropped, `QueueOverflow` diagnostic |
//! | Chain edited during dispatch | `ChainError::Busy` |

pub mod chain;
pub mod emitter;
pub mod handlers;

use std::fmt;

use uniflow_core::{Action, ActionError, StateError};

use crate::store::Store;

pub use chain::{ChainError, DispatcherChain, DispatcherId, DispatcherNode};
pub use emitter::{ActionEmitter, Emission, WeakEmitter};
pub use handlers::HandlerTable;

/// A handler's verdict on an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Pass the action on to the next dispatcher.
    Continue,
    /// The action is consumed; stop here.
    Stop,
}

impl Flow {
    /// Whether this verdict consumes the action.
    #[must_use]
    pub const fn is_stop(self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// `true` continues, `false` stops.
impl From<bool> for Flow {
    fn from(keep_going: bool) -> Self {
        if keep_going { Self::Continue } else { Self::Stop }
    }
}

/// A handler failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A state read or write failed.
    State(StateError),
    /// The action payload was malformed.
    Action(ActionError),
    /// Any other failure.
    Failed(String),
}

impl HandlerError {
    /// A free-form failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(e) => write!(f, "state error: {e}"),
            Self::Action(e) => write!(f, "bad action: {e}"),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::State(e) => Some(e),
            Self::Action(e) => Some(e),
            Self::Failed(_) => None,
        }
    }
}

impl From<StateError> for HandlerError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<ActionError> for HandlerError {
    fn from(e: ActionError) -> Self {
        Self::Action(e)
    }
}

/// What a handler returns.
pub type HandlerResult = Result<Flow, HandlerError>;

/// Access granted to a handler while it processes an action.
pub struct DispatchContext<'a> {
    store: &'a Store,
    follow_ups: &'a mut Vec<Action>,
}

impl<'a> DispatchContext<'a> {
    pub(crate) fn new(store: &'a Store, follow_ups: &'a mut Vec<Action>) -> Self {
        Self { store, follow_ups }
    }

    /// The application store.
    #[must_use]
    pub const fn store(&self) -> &'a Store {
        self.store
    }

    /// Queue a follow-up action, dispatched after the current one.
    ///
    /// Follow-ups from a handler that faults are discarded.
    pub fn emit(&mut self, action: Action) {
        self.follow_ups.push(action);
    }
}

impl fmt::Debug for DispatchContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchContext")
            .field("follow_ups", &self.follow_ups.len())
            .finish_non_exhaustive()
    }
}

/// One node's behavior in a dispatcher chain.
pub trait Dispatcher {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    /// Offer `action` to this dispatcher.
    fn dispatch(&mut self, action: &Action, ctx: &mut DispatchContext<'_>) -> HandlerResult;
}

/// Where an action is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// Created, not yet offered.
    Emitted,
    /// Being offered to dispatchers.
    Dispatching,
    /// A dispatcher stopped it.
    Consumed,
    /// Every dispatcher declined.
    Exhausted,
}

/// A handler fault captured during dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFault {
    /// Faulting dispatcher.
    pub dispatcher: DispatcherId,
    /// Its name.
    pub name: String,
    /// The error it returned.
    pub error: HandlerError,
}

/// Outcome of dispatching one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// The action's type.
    pub action_type: String,
    /// Terminal state: `Consumed` or `Exhausted`.
    pub state: DispatchState,
    /// The consuming dispatcher.
    pub consumed_by: Option<DispatcherId>,
    /// Its name.
    pub consumed_name: Option<String>,
    /// Dispatchers the action was offered to, in order.
    pub visited: Vec<DispatcherId>,
    /// Faults raised along the way.
    pub faults: Vec<HandlerFault>,
}

impl DispatchReport {
    /// Whether some dispatcher consumed the action.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.state == DispatchState::Consumed
    }
}
