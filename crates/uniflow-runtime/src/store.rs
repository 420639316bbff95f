#![forbid(unsafe_code)]

//! The application state container.
//!
//! A [`Store`] owns the one [`StateTree`] of an application together with
//! the subscription registry. Every write goes through the path resolver
//! and is followed by a synchronous propagation pass.
//!
//! # Architecture
//!
//! `Store` is a cheap `Rc<RefCell<..>>` handle. The interior borrow is
//! never held while user callbacks run, so a callback may read the store,
//! write to it (nested propagation finishes before the outer write returns),
//! or subscribe and unsubscribe components.
//!
//! # Invariants
//!
//! 1. When a mutating call returns, every affected subscription has been
//!    delivered the current value (outside a batch).
//! 2. Writing a value equal to the current one is a no-op: no version bump,
//!    no notifications.
//! 3. A component has at most one subscription; unsubscribing is idempotent.
//! 4. A failed write changes nothing and notifies nobody.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Write to an invalid path | `Err(StateError)`, tree untouched |
//! | Subscription path no longer resolves | Delivery skipped, diagnostic recorded |
//! | Callback panics | Propagates to the caller of the write |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;
use uniflow_core::{NodeKind, Path, StateError, StateTree};

use crate::batch::BatchScope;
use crate::component::ComponentId;
use crate::config::StoreConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::propagate::{self, Change, Reach, Target};
use crate::registry::{SubscriptionRegistry, UpdateCallback};
use crate::subscription::Subscription;

/// Why an update was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateCause {
    /// Initial push when the component attached.
    Attached,
    /// The value at or around the bound path changed.
    Changed,
}

/// One update delivered to a subscribed component.
#[derive(Debug, Clone, Copy)]
pub struct StateUpdate<'a> {
    /// Receiving component.
    pub component: ComponentId,
    /// The component's bound path.
    pub path: &'a Path,
    /// Current value at `path`.
    pub value: &'a Value,
    /// Why this update was sent.
    pub cause: UpdateCause,
}

pub(crate) struct StoreInner {
    pub(crate) tree: StateTree,
    pub(crate) registry: SubscriptionRegistry,
    pub(crate) batch_depth: u32,
    pub(crate) pending: Vec<Change>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) config: StoreConfig,
    pub(crate) version: u64,
}

impl StoreInner {
    /// Record a change and report whether it should be flushed now.
    fn changed(&mut self, path: Path, origin: Option<ComponentId>) -> bool {
        self.version += 1;
        self.pending.push(Change { path, origin });
        self.batch_depth == 0
    }

    /// Resolve one target into a ready-to-run delivery.
    fn prepare(&mut self, target: Target) -> Option<(UpdateCallback, Path, Value)> {
        let Self {
            tree,
            registry,
            diagnostics,
            ..
        } = self;
        let entry = registry.get_mut(target.component)?;
        if entry.seq != target.seq {
            return None;
        }
        let value = match tree.get(&entry.path) {
            Ok(value) => value,
            Err(err) => {
                diagnostics.record(Diagnostic::from_state_error(target.component, &err));
                return None;
            }
        };
        if target.reach == Reach::Nested && entry.last.as_ref() == Some(value) {
            return None;
        }
        entry.last = Some(value.clone());
        Some((
            Rc::clone(&entry.callback),
            entry.path.clone(),
            value.clone(),
        ))
    }
}

/// Handle to the application state container.
///
/// Cloning the handle shares the same state.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Rc<RefCell<StoreInner>>,
}

/// Non-owning handle to a [`Store`], for callbacks that live inside it.
#[derive(Clone, Debug)]
pub struct WeakStore {
    inner: Weak<RefCell<StoreInner>>,
}

impl WeakStore {
    /// Upgrade to a strong handle, `None` once the store is gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("version", &inner.version)
            .field("subscriptions", &inner.registry.len())
            .field("batch_depth", &inner.batch_depth)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Create a store owning `tree`, with default configuration.
    ///
    /// Applications normally obtain their store from
    /// [`AppBuilder`](crate::AppBuilder), which guarantees a single owner.
    #[must_use]
    pub fn new(tree: StateTree) -> Self {
        Self::with_config(tree, StoreConfig::default())
    }

    /// Create a store with explicit configuration.
    #[must_use]
    pub fn with_config(tree: StateTree, config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                tree,
                registry: SubscriptionRegistry::new(),
                batch_depth: 0,
                pending: Vec::new(),
                diagnostics: Diagnostics::new(config.diagnostics_capacity),
                config,
                version: 0,
            })),
        }
    }

    /// A non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.borrow().config.clone()
    }

    /// Mutation counter; bumps once per effective write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    // --- Reads ---

    /// Clone of the value at `path`.
    pub fn get(&self, path: &Path) -> Result<Value, StateError> {
        self.inner.borrow().tree.get(path).cloned()
    }

    /// Borrow the value at `path` for the duration of `f`.
    ///
    /// `f` must not write to the store.
    pub fn with<R>(&self, path: &Path, f: impl FnOnce(&Value) -> R) -> Result<R, StateError> {
        let inner = self.inner.borrow();
        inner.tree.get(path).map(f)
    }

    /// Whether `path` resolves.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.borrow().tree.contains(path)
    }

    /// Length of the sequence at `path`.
    pub fn len_at(&self, path: &Path) -> Result<usize, StateError> {
        self.inner.borrow().tree.len_at(path)
    }

    /// Clone of the whole tree.
    #[must_use]
    pub fn tree(&self) -> StateTree {
        self.inner.borrow().tree.clone()
    }

    // --- Writes ---

    /// Store `value` at `path` and propagate.
    pub fn set(&self, path: &Path, value: Value) -> Result<(), StateError> {
        self.write(path, value, None)
    }

    /// Like [`set`](Self::set), but `origin` is not notified of its own write.
    pub fn set_from(&self, origin: ComponentId, path: &Path, value: Value) -> Result<(), StateError> {
        self.write(path, value, Some(origin))
    }

    fn write(&self, path: &Path, value: Value, origin: Option<ComponentId>) -> Result<(), StateError> {
        let flush = {
            let mut inner = self.inner.borrow_mut();
            if inner.tree.get(path).is_ok_and(|current| current == &value) {
                return Ok(());
            }
            inner.tree.set(path, value)?;
            inner.changed(path.clone(), origin)
        };
        if flush {
            self.flush();
        }
        Ok(())
    }

    /// Mutate the value at `path` in place and propagate if it changed.
    ///
    /// `f` must not touch the store. At the root, `f` must leave a mapping;
    /// anything else is undone and reported as a type mismatch.
    pub fn update<R>(&self, path: &Path, f: impl FnOnce(&mut Value) -> R) -> Result<R, StateError> {
        let (result, flush) = {
            let mut inner = self.inner.borrow_mut();
            let slot = inner.tree.get_mut(path)?;
            let before = slot.clone();
            let result = f(slot);
            if *slot == before {
                return Ok(result);
            }
            if path.is_root() && !slot.is_object() {
                let found = NodeKind::of(slot);
                *slot = before;
                return Err(StateError::TypeMismatch {
                    path: path.clone(),
                    at: Path::root(),
                    expected: NodeKind::Mapping,
                    found,
                });
            }
            (result, inner.changed(path.clone(), None))
        };
        if flush {
            self.flush();
        }
        Ok(result)
    }

    /// Remove the value at `path` and propagate.
    ///
    /// Removing a sequence element reports the whole sequence as changed,
    /// since every trailing index shifts.
    pub fn remove(&self, path: &Path) -> Result<Value, StateError> {
        let (removed, flush) = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.tree.remove(path)?;
            let changed = match path.last() {
                Some(segment) if segment.as_index().is_some() => {
                    path.parent().unwrap_or_default()
                }
                _ => path.clone(),
            };
            (removed, inner.changed(changed, None))
        };
        if flush {
            self.flush();
        }
        Ok(removed)
    }

    /// Insert into the sequence at `path` and propagate.
    pub fn insert(&self, path: &Path, index: usize, value: Value) -> Result<(), StateError> {
        let flush = {
            let mut inner = self.inner.borrow_mut();
            inner.tree.insert(path, index, value)?;
            inner.changed(path.clone(), None)
        };
        if flush {
            self.flush();
        }
        Ok(())
    }

    /// Append to the sequence at `path` and propagate; returns the new index.
    pub fn push(&self, path: &Path, value: Value) -> Result<usize, StateError> {
        let (index, flush) = {
            let mut inner = self.inner.borrow_mut();
            let index = inner.tree.push(path, value)?;
            (index, inner.changed(path.clone(), None))
        };
        if flush {
            self.flush();
        }
        Ok(index)
    }

    /// Replace the whole tree and propagate from the root.
    pub fn replace_root(&self, root: Value) -> Result<(), StateError> {
        let flush = {
            let mut inner = self.inner.borrow_mut();
            if inner.tree.root() == &root {
                return Ok(());
            }
            inner.tree.replace(root)?;
            inner.changed(Path::root(), None)
        };
        if flush {
            self.flush();
        }
        Ok(())
    }

    // --- Batching ---

    /// Open a batch: writes apply immediately, notifications wait until the
    /// outermost scope is dropped.
    #[must_use = "dropping the scope immediately ends the batch"]
    pub fn begin_batch(&self) -> BatchScope {
        BatchScope::new(self)
    }

    /// Run `f` inside a batch.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _scope = self.begin_batch();
        f(self)
    }

    /// Whether a batch is open.
    #[must_use]
    pub fn in_batch(&self) -> bool {
        self.inner.borrow().batch_depth > 0
    }

    /// Run `f` in a batch; if it fails and `rollback` is set, restore the
    /// tree and discard the changes `f` recorded.
    pub(crate) fn isolate<R, E>(
        &self,
        rollback: bool,
        f: impl FnOnce() -> Result<R, E>,
    ) -> Result<R, E> {
        let scope = self.begin_batch();
        let (saved, mark) = {
            let inner = self.inner.borrow();
            (rollback.then(|| inner.tree.clone()), inner.pending.len())
        };
        let result = f();
        if result.is_err() {
            if let Some(saved) = saved {
                let mut inner = self.inner.borrow_mut();
                inner.tree = saved;
                inner.pending.truncate(mark);
            }
        }
        drop(scope);
        result
    }

    /// Deliver pending changes if no batch is open.
    pub(crate) fn flush(&self) {
        loop {
            let targets = {
                let mut inner = self.inner.borrow_mut();
                if inner.batch_depth > 0 || inner.pending.is_empty() {
                    return;
                }
                let changes = propagate::coalesce(std::mem::take(&mut inner.pending));
                let targets = propagate::plan(&inner.registry, &changes);
                let _span = tracing::debug_span!(
                    "uniflow.notify",
                    changes = changes.len(),
                    targets = targets.len()
                )
                .entered();
                tracing::debug!(
                    paths = ?changes.iter().map(|c| c.path.to_string()).collect::<Vec<_>>(),
                    "propagating"
                );
                targets
            };
            self.deliver(&targets, UpdateCause::Changed);
        }
    }

    fn deliver(&self, targets: &[Target], cause: UpdateCause) {
        let log = self.inner.borrow().config.log_deliveries;
        for target in targets {
            let prepared = self.inner.borrow_mut().prepare(*target);
            let Some((callback, path, value)) = prepared else {
                continue;
            };
            if log {
                tracing::debug!(component = %target.component, path = %path, ?cause, "deliver");
            }
            callback(&StateUpdate {
                component: target.component,
                path: &path,
                value: &value,
                cause,
            });
        }
    }

    // --- Subscriptions ---

    /// Bind `component` to `path` and push the current value synchronously.
    ///
    /// A component already bound elsewhere is rebound. If `path` does not
    /// resolve yet, no initial push happens and a diagnostic is recorded;
    /// the subscription stays active and receives later writes.
    pub fn subscribe(
        &self,
        component: ComponentId,
        path: Path,
        callback: impl Fn(&StateUpdate<'_>) + 'static,
    ) {
        tracing::debug!(component = %component, path = %path, "subscribe");
        let (seq, replaced) = self
            .inner
            .borrow_mut()
            .registry
            .insert(component, path, Rc::new(callback));
        drop(replaced);
        let initial = Target {
            component,
            seq,
            reach: Reach::Initial,
        };
        self.deliver(&[initial], UpdateCause::Attached);
    }

    /// Subscribe a fresh component and return an RAII guard that
    /// unsubscribes it on drop.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn subscribe_scoped(
        &self,
        path: Path,
        callback: impl Fn(&StateUpdate<'_>) + 'static,
    ) -> Subscription {
        let component = ComponentId::new();
        self.subscribe(component, path, callback);
        Subscription::new(self.downgrade(), component)
    }

    /// Remove `component`'s subscription. Returns whether one existed.
    pub fn unsubscribe(&self, component: ComponentId) -> bool {
        let removed = self.inner.borrow_mut().registry.remove(component);
        let existed = removed.is_some();
        if existed {
            tracing::debug!(component = %component, "unsubscribe");
        }
        drop(removed);
        existed
    }

    /// Remove every subscription.
    pub fn unsubscribe_all(&self) -> usize {
        let removed = self.inner.borrow_mut().registry.drain();
        let count = removed.len();
        drop(removed);
        count
    }

    /// Whether `component` has an active subscription.
    #[must_use]
    pub fn is_subscribed(&self, component: ComponentId) -> bool {
        self.inner.borrow().registry.contains(component)
    }

    /// The path `component` is bound to.
    #[must_use]
    pub fn path_of(&self, component: ComponentId) -> Option<Path> {
        self.inner.borrow().registry.path_of(component).cloned()
    }

    /// Components bound exactly to `path`.
    #[must_use]
    pub fn subscribers_of(&self, path: &Path) -> Vec<ComponentId> {
        self.inner.borrow().registry.subscribers_of(path)
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    // --- Diagnostics ---

    /// Record a diagnostic (also logged at `warn`).
    pub fn record_diagnostic(&self, diagnostic: Diagnostic) {
        self.inner.borrow_mut().diagnostics.record(diagnostic);
    }

    /// Recent diagnostics, oldest first.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.borrow().diagnostics.snapshot()
    }

    /// Drain recent diagnostics.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.borrow_mut().diagnostics.take()
    }

    /// Diagnostics evicted or discarded because the log was full.
    #[must_use]
    pub fn dropped_diagnostics(&self) -> u64 {
        self.inner.borrow().diagnostics.dropped()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;

    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn store() -> Store {
        Store::new(
            StateTree::from_value(json!({
                "user": { "name": "ada" },
                "todos": [{ "title": "a" }, { "title": "b" }]
            }))
            .unwrap(),
        )
    }

    fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl Fn(&StateUpdate<'_>) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |u: &StateUpdate<'_>| {
            sink.borrow_mut().push(u.value.clone());
        })
    }

    #[test]
    fn subscribe_pushes_current_value() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user.name"), cb);
        assert_eq!(*seen.borrow(), vec![json!("ada")]);
    }

    #[test]
    fn initial_push_reports_attached() {
        let store = store();
        let cause = Rc::new(Cell::new(None));
        let c = Rc::clone(&cause);
        store.subscribe(ComponentId::new(), p("user"), move |u| c.set(Some(u.cause)));
        assert_eq!(cause.get(), Some(UpdateCause::Attached));
        store.set(&p("user.name"), json!("bob")).unwrap();
        assert_eq!(cause.get(), Some(UpdateCause::Changed));
    }

    #[test]
    fn ancestor_receives_recomputed_subvalue() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);
        store.set(&p("user.name"), json!("grace")).unwrap();
        assert_eq!(seen.borrow().last(), Some(&json!({ "name": "grace" })));
    }

    #[test]
    fn unrelated_subscription_is_silent() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos"), cb);
        store.set(&p("user.name"), json!("grace")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn nested_subscription_updates_only_when_changed() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos.#1.title"), cb);

        store
            .set(&p("todos"), json!([{ "title": "x" }, { "title": "b" }]))
            .unwrap();
        assert_eq!(seen.borrow().len(), 1, "#1 did not change");

        store
            .set(&p("todos"), json!([{ "title": "x" }, { "title": "y" }]))
            .unwrap();
        assert_eq!(seen.borrow().last(), Some(&json!("y")));
    }

    #[test]
    fn equal_write_is_noop() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user.name"), cb);
        let version = store.version();
        store.set(&p("user.name"), json!("ada")).unwrap();
        assert_eq!(store.version(), version);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn failed_write_notifies_nobody() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), Path::root(), cb);
        assert!(store.set(&p("todos.#9.title"), json!("x")).is_err());
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn origin_is_not_echoed() {
        let store = store();
        let me = ComponentId::new();
        let (mine, cb) = recorder();
        store.subscribe(me, p("user"), cb);
        let (theirs, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);

        store.set_from(me, &p("user.name"), json!("lin")).unwrap();
        assert_eq!(mine.borrow().len(), 1);
        assert_eq!(theirs.borrow().len(), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = store();
        let id = ComponentId::new();
        let (seen, cb) = recorder();
        store.subscribe(id, p("user"), cb);
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set(&p("user.name"), json!("z")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn resubscribe_replaces_path() {
        let store = store();
        let id = ComponentId::new();
        let (seen, cb) = recorder();
        store.subscribe(id, p("user"), cb);
        let (seen2, cb2) = recorder();
        store.subscribe(id, p("todos.#0"), cb2);
        assert_eq!(store.subscription_count(), 1);
        assert_eq!(store.path_of(id), Some(p("todos.#0")));

        store.set(&p("user.name"), json!("z")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen2.borrow().len(), 1);
    }

    #[test]
    fn missing_path_is_diagnosed_not_fatal() {
        let store = store();
        let (seen, cb) = recorder();
        let id = ComponentId::new();
        store.subscribe(id, p("settings.theme"), cb);
        assert!(seen.borrow().is_empty());
        let diagnostics = store.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::PathNotFound);
        assert_eq!(diagnostics[0].component, Some(id));

        store.set(&p("settings.theme"), json!("dark")).unwrap();
        assert_eq!(*seen.borrow(), vec![json!("dark")]);
    }

    #[test]
    fn type_mismatch_skips_only_that_subscription() {
        let store = store();
        let (bad, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user.#0"), cb);
        let (good, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);
        store.set(&p("user.name"), json!("q")).unwrap();
        assert!(bad.borrow().is_empty());
        assert_eq!(good.borrow().len(), 2);
        assert!(
            store
                .diagnostics()
                .iter()
                .all(|d| d.kind == DiagnosticKind::TypeMismatch)
        );
    }

    #[test]
    fn callbacks_may_write_reentrantly() {
        let store = store();
        let weak = store.downgrade();
        store.subscribe(ComponentId::new(), p("user.name"), move |u| {
            if let Some(store) = weak.upgrade() {
                let upper = u.value.as_str().unwrap_or_default().to_uppercase();
                store.set(&p("user.shout"), json!(upper)).unwrap();
            }
        });
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user.shout"), cb);

        store.set(&p("user.name"), json!("hey")).unwrap();
        assert_eq!(store.get(&p("user.shout")).unwrap(), json!("HEY"));
        assert_eq!(seen.borrow().last(), Some(&json!("HEY")));
    }

    #[test]
    fn update_mutates_in_place() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos"), cb);
        let len = store
            .update(&p("todos"), |v| {
                let items = v.as_array_mut().unwrap();
                items.pop();
                items.len()
            })
            .unwrap();
        assert_eq!(len, 1);
        assert_eq!(seen.borrow().len(), 2);

        store.update(&p("todos"), |_| ()).unwrap();
        assert_eq!(seen.borrow().len(), 2, "unchanged update is silent");
    }

    #[test]
    fn update_cannot_turn_root_into_non_mapping() {
        let store = store();
        let before = store.tree().into_value();
        let version = store.version();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), Path::root(), cb);

        let err = store.update(&Path::root(), |v| *v = json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            StateError::TypeMismatch {
                expected: NodeKind::Mapping,
                found: NodeKind::Sequence,
                ..
            }
        ));
        assert_eq!(store.tree().into_value(), before);
        assert_eq!(store.version(), version);
        assert_eq!(seen.borrow().len(), 1, "only the initial push");

        store
            .update(&Path::root(), |v| {
                v["extra"] = json!(true);
            })
            .unwrap();
        assert_eq!(store.get(&p("extra")).unwrap(), json!(true));
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn update_closure_must_not_write_to_the_store() {
        let store = store();
        let inner = store.clone();
        let _ = store.update(&p("user.name"), |_| {
            let _ = inner.set(&p("user.name"), json!("nested"));
        });
    }

    #[test]
    fn failed_write_leaves_no_intermediate_mappings() {
        let store = Store::new(StateTree::new());
        assert!(store.set(&p("a.#0"), json!(1)).is_err());
        assert_eq!(store.tree().into_value(), json!({}));

        let store = Store::new(StateTree::from_value(json!({ "a": {} })).unwrap());
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("a"), cb);
        assert!(store.set(&p("a.b.#0"), json!(1)).is_err());
        assert_eq!(store.get(&p("a")).unwrap(), json!({}));
        assert_eq!(*seen.borrow(), vec![json!({})]);
    }

    #[test]
    fn remove_element_notifies_sequence() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos"), cb);
        let removed = store.remove(&p("todos.#0")).unwrap();
        assert_eq!(removed, json!({ "title": "a" }));
        assert_eq!(seen.borrow().last(), Some(&json!([{ "title": "b" }])));
    }

    #[test]
    fn push_and_insert() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos"), cb);
        assert_eq!(store.push(&p("todos"), json!({ "title": "c" })).unwrap(), 2);
        store.insert(&p("todos"), 0, json!({ "title": "z" })).unwrap();
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(store.len_at(&p("todos")).unwrap(), 4);
    }

    #[test]
    fn replace_root_reaches_everyone_changed() {
        let store = store();
        let (user, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user.name"), cb);
        let (todos, cb) = recorder();
        store.subscribe(ComponentId::new(), p("todos"), cb);
        store
            .replace_root(json!({ "user": { "name": "new" }, "todos": [{ "title": "a" }, { "title": "b" }] }))
            .unwrap();
        assert_eq!(user.borrow().last(), Some(&json!("new")));
        assert_eq!(todos.borrow().len(), 1, "todos value unchanged");
        assert!(store.replace_root(json!(3)).is_err());
    }

    #[test]
    fn batch_coalesces_notifications() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);
        store.batch(|s| {
            s.set(&p("user.name"), json!("a1")).unwrap();
            s.set(&p("user.age"), json!(3)).unwrap();
            assert!(s.in_batch());
            assert_eq!(seen.borrow().len(), 1, "deferred inside batch");
        });
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(
            seen.borrow().last(),
            Some(&json!({ "name": "a1", "age": 3 }))
        );
    }

    #[test]
    fn isolate_rolls_back_on_error() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);
        let result: Result<(), &str> = store.isolate(true, || {
            store.set(&p("user.name"), json!("broken")).unwrap();
            Err("boom")
        });
        assert!(result.is_err());
        assert_eq!(store.get(&p("user.name")).unwrap(), json!("ada"));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn isolate_commits_on_success() {
        let store = store();
        let (seen, cb) = recorder();
        store.subscribe(ComponentId::new(), p("user"), cb);
        let result: Result<u8, ()> = store.isolate(true, || {
            store.set(&p("user.name"), json!("ok")).unwrap();
            Ok(7)
        });
        assert_eq!(result, Ok(7));
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn scoped_subscription_unsubscribes_on_drop() {
        let store = store();
        let (seen, cb) = recorder();
        {
            let _sub = store.subscribe_scoped(p("user"), cb);
            assert_eq!(store.subscription_count(), 1);
        }
        assert_eq!(store.subscription_count(), 0);
        store.set(&p("user.name"), json!("gone")).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn callback_unsubscribing_sibling_prevents_its_delivery() {
        let store = store();
        let victim = ComponentId::new();
        let weak = store.downgrade();
        store.subscribe(ComponentId::new(), p("todos"), move |u| {
            if u.cause == UpdateCause::Changed {
                if let Some(store) = weak.upgrade() {
                    store.unsubscribe(victim);
                }
            }
        });
        let (seen, cb) = recorder();
        store.subscribe(victim, p("todos.#0"), cb);

        store.set(&p("todos.#0.title"), json!("zz")).unwrap();
        assert_eq!(seen.borrow().len(), 1, "victim only got its initial push");
    }

    // ========================================================================
    // Properties
    // ========================================================================

    mod props {
        use proptest::prelude::*;
        use serde_json::json;

        use super::super::*;

        fn arb_path() -> impl Strategy<Value = Path> {
            let segment = prop_oneof![
                prop::sample::select(vec!["user", "name", "todos", "title", "a"])
                    .prop_map(|k| Path::root().child_key(k)),
                (0usize..3).prop_map(|i| Path::root().child_index(i)),
            ];
            prop::collection::vec(segment, 0..4)
                .prop_map(|parts| parts.iter().fold(Path::root(), |acc, part| acc.join(part)))
        }

        fn arb_value() -> impl Strategy<Value = Value> {
            prop_oneof![
                Just(json!(1)),
                Just(json!("x")),
                Just(json!([])),
                Just(json!({})),
                Just(json!([{ "title": "t" }])),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(128))]

            #[test]
            fn failed_writes_change_nothing(
                ops in prop::collection::vec((arb_path(), arb_value()), 1..12),
            ) {
                let store = super::store();
                for (path, value) in ops {
                    let before = store.tree().into_value();
                    let version = store.version();
                    if store.set(&path, value).is_err() {
                        prop_assert_eq!(store.tree().into_value(), before);
                        prop_assert_eq!(store.version(), version);
                    }
                    prop_assert!(store.tree().root().is_object());
                }
            }
        }
    }
}
