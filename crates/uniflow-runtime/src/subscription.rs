#![forbid(unsafe_code)]

//! Subscription lifetime management.
//!
//! [`Subscription`] unsubscribes its component when dropped. A
//! [`BindingScope`] collects the subscriptions of one logical owner (a view,
//! a list, a form) and releases them together.
//!
//! # Invariants
//!
//! 1. After a guard drops, its component receives no further updates.
//! 2. Dropping a guard after its store is gone is a no-op.
//! 3. A scope releases its subscriptions in reverse registration order.

use uniflow_core::Path;

use crate::component::ComponentId;
use crate::store::{StateUpdate, Store, WeakStore};

/// RAII guard for one subscription.
#[must_use = "dropping the subscription immediately unsubscribes"]
pub struct Subscription {
    store: WeakStore,
    component: ComponentId,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(store: WeakStore, component: ComponentId) -> Self {
        Self {
            store,
            component,
            active: true,
        }
    }

    /// The component this guard owns.
    #[must_use]
    pub const fn component(&self) -> ComponentId {
        self.component
    }

    /// Keep the subscription alive for the rest of the store's life.
    pub fn detach(mut self) -> ComponentId {
        self.active = false;
        self.component
    }

    /// Unsubscribe now. Returns whether the subscription was still live.
    pub fn cancel(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        if !std::mem::replace(&mut self.active, false) {
            return false;
        }
        self.store
            .upgrade()
            .is_some_and(|store| store.unsubscribe(self.component))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("component", &self.component)
            .field("active", &self.active)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Holds the subscriptions of one owner and releases them on drop.
///
/// ```ignore
/// let mut scope = BindingScope::new();
/// scope.subscribe(&store, Path::parse("user.name")?, |u| println!("{}", u.value));
/// scope.subscribe(&store, Path::parse("user.email")?, |u| println!("{}", u.value));
/// drop(scope); // both unsubscribed
/// ```
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// An empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an existing guard.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe a fresh component to `path`, held by this scope.
    pub fn subscribe(
        &mut self,
        store: &Store,
        path: Path,
        callback: impl Fn(&StateUpdate<'_>) + 'static,
    ) -> ComponentId {
        let sub = store.subscribe_scoped(path, callback);
        let component = sub.component();
        self.subscriptions.push(sub);
        component
    }

    /// Components held by this scope, in registration order.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentId> {
        self.subscriptions.iter().map(Subscription::component).collect()
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether the scope holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release every subscription now; the scope stays usable.
    pub fn clear(&mut self) {
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
