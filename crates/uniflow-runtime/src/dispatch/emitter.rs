#![forbid(unsafe_code)]

//! The action channel: emitting components hand actions to the chain here.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use uniflow_core::Action;

use super::chain::{ChainError, DispatcherChain, DispatcherId, DispatcherNode};
use super::DispatchReport;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::store::Store;

/// Result of [`ActionEmitter::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// The action was dispatched to completion, followed by every action
    /// queued meanwhile.
    Dispatched {
        /// Report for the emitted action.
        report: DispatchReport,
        /// Reports for queued follow-ups, in dispatch order.
        follow_ups: Vec<DispatchReport>,
    },
    /// A dispatch was in progress; the action runs after it.
    Queued,
    /// The queue was full and the action was discarded.
    Dropped,
}

impl Emission {
    /// The report for the emitted action, if it was dispatched immediately.
    #[must_use]
    pub const fn report(&self) -> Option<&DispatchReport> {
        match self {
            Self::Dispatched { report, .. } => Some(report),
            Self::Queued | Self::Dropped => None,
        }
    }
}

struct EmitterInner {
    store: Store,
    chain: RefCell<DispatcherChain>,
    queue: RefCell<VecDeque<Action>>,
    dispatching: Cell<bool>,
}

/// Clears the dispatching flag even if a handler panics.
struct DispatchingGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle through which components emit actions.
///
/// Cloning shares the same chain and queue. A callback stored inside the
/// store (a subscription) should hold a [`WeakEmitter`] instead, so the
/// store and the emitter do not keep each other alive.
#[derive(Clone)]
pub struct ActionEmitter {
    inner: Rc<EmitterInner>,
}

/// Non-owning handle to an [`ActionEmitter`].
#[derive(Clone)]
pub struct WeakEmitter {
    inner: Weak<EmitterInner>,
}

impl WeakEmitter {
    /// Upgrade to a strong handle, `None` once the emitter is gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<ActionEmitter> {
        self.inner.upgrade().map(|inner| ActionEmitter { inner })
    }
}

impl std::fmt::Debug for WeakEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakEmitter").finish_non_exhaustive()
    }
}

impl ActionEmitter {
    /// An emitter dispatching through `chain` against `store`.
    #[must_use]
    pub fn new(store: Store, chain: DispatcherChain) -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                store,
                chain: RefCell::new(chain),
                queue: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// A non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEmitter {
        WeakEmitter {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The store handlers act on.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Whether an action is being dispatched right now.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.get()
    }

    /// Actions waiting behind the current dispatch.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Emit `action`.
    ///
    /// Outside a dispatch this runs the action, then every action queued
    /// while it ran, before returning. During a dispatch (from a handler or
    /// from a subscription callback a handler triggered) the action is
    /// queued instead.
    pub fn emit(&self, action: Action) -> Emission {
        tracing::trace!(action = %action, "emitted");
        if self.inner.dispatching.get() {
            return self.enqueue(action);
        }
        self.inner.dispatching.set(true);
        let _guard = DispatchingGuard(&self.inner.dispatching);

        let report = self.run(&action);
        let mut follow_ups = Vec::new();
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some(next) = next else {
                break;
            };
            follow_ups.push(self.run(&next));
        }
        Emission::Dispatched { report, follow_ups }
    }

    fn run(&self, action: &Action) -> DispatchReport {
        let mut emitted = Vec::new();
        let report = self
            .inner
            .chain
            .borrow_mut()
            .run(action, &self.inner.store, &mut emitted);
        for follow_up in emitted {
            self.enqueue(follow_up);
        }
        report
    }

    fn enqueue(&self, action: Action) -> Emission {
        let limit = self.inner.store.config().max_queued_actions;
        let mut queue = self.inner.queue.borrow_mut();
        if queue.len() >= limit {
            drop(queue);
            self.inner.store.record_diagnostic(Diagnostic {
                kind: DiagnosticKind::QueueOverflow,
                path: None,
                component: None,
                message: format!("dropped {action}: {limit} actions already queued"),
            });
            return Emission::Dropped;
        }
        queue.push_back(action);
        Emission::Queued
    }

    // --- Chain editing ---

    /// See [`DispatcherChain::attach`]. Fails with [`ChainError::Busy`]
    /// during a dispatch.
    pub fn attach(
        &self,
        parent: Option<DispatcherId>,
        node: DispatcherNode,
    ) -> Result<DispatcherId, ChainError> {
        self.inner
            .chain
            .try_borrow_mut()
            .map_err(|_| ChainError::Busy)?
            .attach(parent, node)
    }

    /// See [`DispatcherChain::detach`]. Fails with [`ChainError::Busy`]
    /// during a dispatch.
    pub fn detach(&self, id: DispatcherId) -> Result<bool, ChainError> {
        Ok(self
            .inner
            .chain
            .try_borrow_mut()
            .map_err(|_| ChainError::Busy)?
            .detach(id))
    }

    /// Dispatcher names in dispatch order.
    #[must_use]
    pub fn dispatcher_names(&self) -> Vec<String> {
        self.inner
            .chain
            .borrow()
            .names()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}

impl std::fmt::Debug for ActionEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEmitter")
            .field("dispatching", &self.inner.dispatching.get())
            .field("queued", &self.inner.queue.borrow().len())
            .finish_non_exhaustive()
    }
}
