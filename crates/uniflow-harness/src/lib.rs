#![forbid(unsafe_code)]

//! Test harness for UniFlow applications.
//!
//! - [`UpdateRecorder`] captures every update delivered to the
//!   subscriptions it creates.
//! - [`RecordingDispatcher`] logs each action it is offered and answers with
//!   a fixed verdict, optionally writing state or failing first.
//! - [`fixtures`] builds the reference todo-list state and handlers.
//! - [`assert_values!`] compares recorded values against JSON literals.

pub mod fixtures;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use uniflow_core::{Action, Path};
use uniflow_runtime::{
    ComponentId, DispatchContext, Dispatcher, Flow, HandlerError, HandlerResult, StateUpdate,
    Store, UpdateCause,
};

/// One delivered update, owned.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    /// Receiving component.
    pub component: ComponentId,
    /// Its bound path.
    pub path: Path,
    /// Delivered value.
    pub value: Value,
    /// Why it was delivered.
    pub cause: UpdateCause,
}

/// Collects updates from any number of subscriptions.
///
/// Cloning shares the same log.
#[derive(Debug, Clone, Default)]
pub struct UpdateRecorder {
    log: Rc<RefCell<Vec<RecordedUpdate>>>,
}

impl UpdateRecorder {
    /// An empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends to this recorder.
    pub fn callback(&self) -> impl Fn(&StateUpdate<'_>) + 'static {
        let log = Rc::clone(&self.log);
        move |update: &StateUpdate<'_>| {
            log.borrow_mut().push(RecordedUpdate {
                component: update.component,
                path: update.path.clone(),
                value: update.value.clone(),
                cause: update.cause,
            });
        }
    }

    /// Subscribe a fresh component at `path` (string form) into this recorder.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not parse.
    pub fn subscribe(&self, store: &Store, path: &str) -> ComponentId {
        let path = Path::parse(path).unwrap_or_else(|e| panic!("bad fixture path: {e}"));
        let component = ComponentId::new();
        store.subscribe(component, path, self.callback());
        component
    }

    /// Every recorded update.
    #[must_use]
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.log.borrow().clone()
    }

    /// Recorded values, in delivery order.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.log.borrow().iter().map(|u| u.value.clone()).collect()
    }

    /// Updates caused by writes (initial pushes excluded).
    #[must_use]
    pub fn changes(&self) -> Vec<RecordedUpdate> {
        self.log
            .borrow()
            .iter()
            .filter(|u| u.cause == UpdateCause::Changed)
            .cloned()
            .collect()
    }

    /// Updates delivered to `component`.
    #[must_use]
    pub fn for_component(&self, component: ComponentId) -> Vec<RecordedUpdate> {
        self.log
            .borrow()
            .iter()
            .filter(|u| u.component == component)
            .cloned()
            .collect()
    }

    /// Number of recorded updates.
    #[must_use]
    pub fn count(&self) -> usize {
        self.log.borrow().len()
    }

    /// Most recent update.
    #[must_use]
    pub fn last(&self) -> Option<RecordedUpdate> {
        self.log.borrow().last().cloned()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

/// Compare an [`UpdateRecorder`]'s values against JSON literals.
///
/// ```ignore
/// assert_values!(recorder, [json!(1), json!(2)]);
/// ```
#[macro_export]
macro_rules! assert_values {
    ($recorder:expr, [$($value:expr),* $(,)?]) => {{
        let expected: ::std::vec::Vec<::serde_json::Value> = ::std::vec![$($value),*];
        assert_eq!($recorder.values(), expected, "recorded values differ");
    }};
}

// ---------------------------------------------------------------------------
// RecordingDispatcher
// ---------------------------------------------------------------------------

/// Shared log of `(dispatcher name, action type)` pairs.
pub type CallLog = Rc<RefCell<Vec<(String, String)>>>;

/// A dispatcher that records what it is offered.
pub struct RecordingDispatcher {
    name: String,
    log: CallLog,
    flow: Flow,
    only: Option<String>,
    write: Option<(Path, Value)>,
    fail: Option<String>,
}

impl RecordingDispatcher {
    /// Record every action and answer with `flow`.
    pub fn new(name: impl Into<String>, log: &CallLog, flow: Flow) -> Self {
        Self {
            name: name.into(),
            log: Rc::clone(log),
            flow,
            only: None,
            write: None,
            fail: None,
        }
    }

    /// Answer with `flow` only for `kind`; decline everything else.
    #[must_use]
    pub fn only(mut self, kind: impl Into<String>) -> Self {
        self.only = Some(kind.into());
        self
    }

    /// Write `value` at `path` before answering.
    #[must_use]
    pub fn writing(mut self, path: Path, value: Value) -> Self {
        self.write = Some((path, value));
        self
    }

    /// Fail with `message` (after any write).
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }
}

impl Dispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&mut self, action: &Action, ctx: &mut DispatchContext<'_>) -> HandlerResult {
        self.log
            .borrow_mut()
            .push((self.name.clone(), action.kind().to_owned()));
        if self.only.as_deref().is_some_and(|kind| kind != action.kind()) {
            return Ok(Flow::Continue);
        }
        if let Some((path, value)) = &self.write {
            ctx.store().set(path, value.clone())?;
        }
        if let Some(message) = &self.fail {
            tracing::debug!(dispatcher = %self.name, "failing on purpose");
            return Err(HandlerError::failed(message.clone()));
        }
        Ok(self.flow)
    }
}

impl std::fmt::Debug for RecordingDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingDispatcher")
            .field("name", &self.name)
            .field("flow", &self.flow)
            .finish_non_exhaustive()
    }
}

/// Names of dispatchers in `log`, in call order.
#[must_use]
pub fn call_order(log: &CallLog) -> Vec<String> {
    log.borrow().iter().map(|(name, _)| name.clone()).collect()
}
