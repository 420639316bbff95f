#![forbid(unsafe_code)]

//! The dispatcher tree and its flattened dispatch order.
//!
//! Nodes are kept in an arena keyed by [`DispatcherId`]. The post-order
//! sequence is recomputed whenever the tree is edited and stays fixed
//! between edits.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use uniflow_core::Action;

use super::{DispatchContext, DispatchReport, DispatchState, Dispatcher, HandlerFault};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::store::Store;

static DISPATCHER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies a dispatcher within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatcherId(u64);

impl DispatcherId {
    fn next() -> Self {
        Self(DISPATCHER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DispatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatcher#{}", self.0)
    }
}

/// A dispatcher together with its child dispatchers, used to build a chain.
pub struct DispatcherNode {
    handler: Box<dyn Dispatcher>,
    children: Vec<DispatcherNode>,
}

impl DispatcherNode {
    /// A leaf node.
    pub fn new(handler: impl Dispatcher + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            children: Vec::new(),
        }
    }

    /// Append a child; children are offered actions before this node.
    #[must_use]
    pub fn child(mut self, node: DispatcherNode) -> Self {
        self.children.push(node);
        self
    }
}

impl fmt::Debug for DispatcherNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherNode")
            .field("name", &self.handler.name())
            .field("children", &self.children)
            .finish()
    }
}

/// Errors from editing a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainError {
    /// The named parent is not in the chain.
    UnknownParent(DispatcherId),
    /// The chain is dispatching and cannot be edited.
    Busy,
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownParent(id) => write!(f, "no dispatcher {id} in chain"),
            Self::Busy => f.write_str("dispatcher chain is busy dispatching"),
        }
    }
}

impl std::error::Error for ChainError {}

struct Slot {
    handler: Box<dyn Dispatcher>,
    parent: Option<DispatcherId>,
    children: Vec<DispatcherId>,
}

/// An ordered tree of dispatchers.
#[derive(Default)]
pub struct DispatcherChain {
    slots: AHashMap<DispatcherId, Slot>,
    roots: Vec<DispatcherId>,
    order: Vec<DispatcherId>,
}

impl DispatcherChain {
    /// An empty chain; every action is exhausted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node` (and its subtree) under `parent`, or as a new top-level
    /// dispatcher after the existing ones. Returns the id of `node`.
    pub fn attach(
        &mut self,
        parent: Option<DispatcherId>,
        node: DispatcherNode,
    ) -> Result<DispatcherId, ChainError> {
        let Some(parent) = parent else {
            return Ok(self.attach_root(node));
        };
        if !self.slots.contains_key(&parent) {
            return Err(ChainError::UnknownParent(parent));
        }
        let id = self.insert(Some(parent), node);
        if let Some(slot) = self.slots.get_mut(&parent) {
            slot.children.push(id);
        }
        self.reorder();
        Ok(id)
    }

    /// Add `node` (and its subtree) as the last top-level dispatcher.
    pub fn attach_root(&mut self, node: DispatcherNode) -> DispatcherId {
        let id = self.insert(None, node);
        self.roots.push(id);
        self.reorder();
        id
    }

    fn insert(&mut self, parent: Option<DispatcherId>, node: DispatcherNode) -> DispatcherId {
        let id = DispatcherId::next();
        let DispatcherNode { handler, children } = node;
        let children = children
            .into_iter()
            .map(|child| self.insert(Some(id), child))
            .collect();
        self.slots.insert(
            id,
            Slot {
                handler,
                parent,
                children,
            },
        );
        id
    }

    /// Remove `id` and its whole subtree. Returns whether it was present.
    pub fn detach(&mut self, id: DispatcherId) -> bool {
        let Some(slot) = self.slots.remove(&id) else {
            return false;
        };
        match slot.parent.and_then(|p| self.slots.get_mut(&p)) {
            Some(parent) => parent.children.retain(|c| *c != id),
            None => self.roots.retain(|r| *r != id),
        }
        let mut stack = slot.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.slots.remove(&child) {
                stack.extend(removed.children);
            }
        }
        self.reorder();
        true
    }

    fn reorder(&mut self) {
        fn visit(
            slots: &AHashMap<DispatcherId, Slot>,
            id: DispatcherId,
            order: &mut Vec<DispatcherId>,
        ) {
            if let Some(slot) = slots.get(&id) {
                for child in &slot.children {
                    visit(slots, *child, order);
                }
                order.push(id);
            }
        }
        let mut order = Vec::with_capacity(self.slots.len());
        for root in &self.roots {
            visit(&self.slots, *root, &mut order);
        }
        self.order = order;
    }

    /// Dispatch order: children before parents, siblings in declaration order.
    #[must_use]
    pub fn order(&self) -> &[DispatcherId] {
        &self.order
    }

    /// Dispatcher names in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| slot.handler.name())
            .collect()
    }

    /// Name of dispatcher `id`.
    #[must_use]
    pub fn name_of(&self, id: DispatcherId) -> Option<&str> {
        self.slots.get(&id).map(|slot| slot.handler.name())
    }

    /// Number of dispatchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Offer `action` to each dispatcher in order until one stops it.
    ///
    /// Each handler runs in its own batch: its notifications are delivered
    /// when it returns, and a faulting handler's writes are
    /// rolled back when the store is configured to do so. Follow-up actions
    /// from successful handlers are appended to `follow_ups`.
    pub fn run(
        &mut self,
        action: &Action,
        store: &Store,
        follow_ups: &mut Vec<Action>,
    ) -> DispatchReport {
        let rollback = store.config().rollback_faulted_handlers;
        let mut report = DispatchReport {
            action_type: action.kind().to_owned(),
            state: DispatchState::Emitted,
            consumed_by: None,
            consumed_name: None,
            visited: Vec::new(),
            faults: Vec::new(),
        };
        let _span =
            tracing::debug_span!("uniflow.dispatch", action_type = action.kind()).entered();
        report.state = DispatchState::Dispatching;

        for id in self.order.clone() {
            let Some(slot) = self.slots.get_mut(&id) else {
                continue;
            };
            report.visited.push(id);
            let mut emitted = Vec::new();
            let result = store.isolate(rollback, || {
                slot.handler
                    .dispatch(action, &mut DispatchContext::new(store, &mut emitted))
            });
            match result {
                Ok(flow) => {
                    follow_ups.append(&mut emitted);
                    if flow.is_stop() {
                        report.state = DispatchState::Consumed;
                        report.consumed_by = Some(id);
                        report.consumed_name = Some(slot.handler.name().to_owned());
                        break;
                    }
                }
                Err(error) => {
                    let name = slot.handler.name().to_owned();
                    store.record_diagnostic(Diagnostic {
                        kind: DiagnosticKind::HandlerFault,
                        path: None,
                        component: None,
                        message: format!("{name} ({id}) failed on {action}: {error}"),
                    });
                    report.faults.push(HandlerFault {
                        dispatcher: id,
                        name,
                        error,
                    });
                }
            }
        }

        if report.state == DispatchState::Dispatching {
            report.state = DispatchState::Exhausted;
        }
        tracing::debug!(
            state = ?report.state,
            consumed_by = report.consumed_name.as_deref(),
            visited = report.visited.len(),
            faults = report.faults.len(),
            "dispatched"
        );
        report
    }
}

impl fmt::Debug for DispatcherChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherChain")
            .field("order", &self.names())
            .finish()
    }
}
