#![forbid(unsafe_code)]

//! Subscription registry: which component is bound to which path.
//!
//! # Invariants
//!
//! 1. A component has at most one subscription; inserting again replaces it
//!    and assigns a new sequence number.
//! 2. Sequence numbers strictly increase with registration order and are
//!    never reused, so a stale delivery target can be detected by comparing
//!    sequence numbers.
//! 3. Removing an absent component is a no-op.

use std::rc::Rc;

use ahash::AHashMap;
use serde_json::Value;
use uniflow_core::Path;

use crate::component::ComponentId;
use crate::store::StateUpdate;

/// Callback invoked with every update for a subscription.
pub type UpdateCallback = Rc<dyn Fn(&StateUpdate<'_>)>;

/// One registered subscription.
pub(crate) struct Entry {
    pub(crate) path: Path,
    pub(crate) callback: UpdateCallback,
    pub(crate) seq: u64,
    /// Value most recently delivered, used to suppress no-op pushes to
    /// subscriptions nested below a changed path.
    pub(crate) last: Option<Value>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("path", &self.path)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Registry of live subscriptions, keyed by component.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: AHashMap<ComponentId, Entry>,
    next_seq: u64,
}

impl SubscriptionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `component` to `path`, returning the new sequence number and the
    /// replaced entry, if any.
    ///
    /// The caller should drop the replaced entry outside any store borrow:
    /// its callback may own guards that touch the store when dropped.
    pub(crate) fn insert(
        &mut self,
        component: ComponentId,
        path: Path,
        callback: UpdateCallback,
    ) -> (u64, Option<Entry>) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let replaced = self.entries.insert(
            component,
            Entry {
                path,
                callback,
                seq,
                last: None,
            },
        );
        (seq, replaced)
    }

    /// Remove `component`'s subscription.
    pub(crate) fn remove(&mut self, component: ComponentId) -> Option<Entry> {
        self.entries.remove(&component)
    }

    pub(crate) fn get_mut(&mut self, component: ComponentId) -> Option<&mut Entry> {
        self.entries.get_mut(&component)
    }

    /// Entries in registration order.
    pub(crate) fn ordered(&self) -> Vec<(ComponentId, &Entry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(id, e)| (*id, e)).collect();
        entries.sort_unstable_by_key(|(_, e)| e.seq);
        entries
    }

    /// Remove every entry.
    pub(crate) fn drain(&mut self) -> Vec<Entry> {
        self.entries.drain().map(|(_, e)| e).collect()
    }

    /// Whether `component` is subscribed.
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.entries.contains_key(&component)
    }

    /// The path `component` is bound to.
    #[must_use]
    pub fn path_of(&self, component: ComponentId) -> Option<&Path> {
        self.entries.get(&component).map(|e| &e.path)
    }

    /// Components bound exactly to `path`, in registration order.
    #[must_use]
    pub fn subscribers_of(&self, path: &Path) -> Vec<ComponentId> {
        self.ordered()
            .into_iter()
            .filter(|(_, e)| &e.path == path)
            .map(|(id, _)| id)
            .collect()
    }

    /// Number of subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
