#![forbid(unsafe_code)]

//! List binder: per-item subscriptions over a sequence in the state tree.
//!
//! A [`ListView`] binds to a base path holding a sequence and keeps one
//! subscription per element at the positional path `<base>.#<index>`.
//! Items carry no identity beyond their index: after a removal, item `#1`
//! is whatever now sits at index 1.
//!
//! Selection is stored in the state tree itself, as a boolean `$selected`
//! field on each item mapping, so it survives snapshots and is visible to
//! dispatchers.
//!
//! # Invariants
//!
//! 1. After any propagation, exactly one item subscription exists per
//!    element of the base sequence, at paths `#0..#len-1`.
//! 2. A base value that is not a sequence counts as an empty list.
//! 3. Items that are not mappings are never selected.
//! 4. [`ListView::delete_selected`] produces exactly one propagation at
//!    the base path.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Base path missing | No items bound; selection edits return `Err` |
//! | Selecting a non-mapping item | `Err(StateError::TypeMismatch)` |
//! | Store dropped before the view | Rebinding stops; `detach` is a no-op |

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use uniflow_core::{Path, StateError, Value};
use uniflow_runtime::{ComponentId, StateUpdate, Store, UpdateCause, WeakStore};

/// Item field holding the selection marker.
pub const SELECTED_FIELD: &str = "$selected";

/// Positional path of item `index` under `base`.
#[must_use]
pub fn item_path(base: &Path, index: usize) -> Path {
    base.child_index(index)
}

/// Whether `item` carries a true selection marker.
#[must_use]
pub fn is_marked(item: &Value) -> bool {
    item.get(SELECTED_FIELD).and_then(Value::as_bool) == Some(true)
}

/// One update for one list item.
#[derive(Debug, Clone, Copy)]
pub struct ItemUpdate<'a> {
    /// Position in the sequence.
    pub index: usize,
    /// `<base>.#<index>`.
    pub path: &'a Path,
    /// Current item value.
    pub value: &'a Value,
    /// Whether the item is selected.
    pub selected: bool,
    /// Why the update was delivered.
    pub cause: UpdateCause,
}

type ItemCallback = Rc<dyn Fn(&ItemUpdate<'_>)>;

struct ListInner {
    store: WeakStore,
    base: Path,
    base_component: ComponentId,
    items: Vec<ComponentId>,
    on_item: ItemCallback,
    attached: bool,
}

/// A sequence bound item by item.
pub struct ListView {
    store: Store,
    inner: Rc<RefCell<ListInner>>,
}

impl ListView {
    /// Bind to the sequence at `base`, calling `on_item` for every item
    /// update (including the initial push of each item).
    pub fn attach(
        store: &Store,
        base: Path,
        on_item: impl Fn(&ItemUpdate<'_>) + 'static,
    ) -> Self {
        let base_component = ComponentId::new();
        let inner = Rc::new(RefCell::new(ListInner {
            store: store.downgrade(),
            base: base.clone(),
            base_component,
            items: Vec::new(),
            on_item: Rc::new(on_item),
            attached: true,
        }));
        let weak = Rc::downgrade(&inner);
        store.subscribe(base_component, base, move |update| {
            let len = update.value.as_array().map_or(0, Vec::len);
            rebind(&weak, len);
        });
        Self {
            store: store.clone(),
            inner,
        }
    }

    /// The bound base path.
    #[must_use]
    pub fn base(&self) -> Path {
        self.inner.borrow().base.clone()
    }

    /// The component owning the base subscription.
    #[must_use]
    pub fn component(&self) -> ComponentId {
        self.inner.borrow().base_component
    }

    /// Number of bound items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    /// Whether no items are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of the bound items, in order.
    #[must_use]
    pub fn item_paths(&self) -> Vec<Path> {
        let inner = self.inner.borrow();
        (0..inner.items.len())
            .map(|i| item_path(&inner.base, i))
            .collect()
    }

    /// Component bound to item `index`.
    #[must_use]
    pub fn item_component(&self, index: usize) -> Option<ComponentId> {
        self.inner.borrow().items.get(index).copied()
    }

    // --- Selection ---

    /// Whether item `index` is selected. Missing items are not.
    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        let path = item_path(&self.base(), index);
        self.store.with(&path, is_marked).unwrap_or(false)
    }

    /// Set the selection marker of item `index`.
    pub fn set_selected(&self, index: usize, selected: bool) -> Result<(), StateError> {
        let path = item_path(&self.base(), index).child_key(SELECTED_FIELD);
        self.store.set(&path, Value::Bool(selected))
    }

    /// Flip item `index`; returns the new state.
    pub fn toggle_selected(&self, index: usize) -> Result<bool, StateError> {
        let selected = !self.is_selected(index);
        self.set_selected(index, selected)?;
        Ok(selected)
    }

    /// Mark every mapping item selected, in one propagation.
    pub fn select_all(&self) -> Result<(), StateError> {
        self.mark_all(true)
    }

    /// Clear every selection marker, in one propagation.
    pub fn clear_selection(&self) -> Result<(), StateError> {
        self.mark_all(false)
    }

    fn mark_all(&self, selected: bool) -> Result<(), StateError> {
        self.store.update(&self.base(), |list| {
            let Some(items) = list.as_array_mut() else {
                return;
            };
            for item in items {
                if let Some(fields) = item.as_object_mut() {
                    fields.insert(SELECTED_FIELD.to_owned(), Value::Bool(selected));
                }
            }
        })
    }

    /// Indices of selected items.
    #[must_use]
    pub fn selected_indices(&self) -> Vec<usize> {
        self.store
            .with(&self.base(), |list| {
                list.as_array()
                    .map(|items| {
                        items
                            .iter()
                            .enumerate()
                            .filter(|(_, item)| is_marked(item))
                            .map(|(i, _)| i)
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Number of selected items.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected_indices().len()
    }

    /// Remove every selected item, keeping survivors in order.
    ///
    /// The sequence is mutated in place and propagated once. Returns how
    /// many items were removed; removing none propagates nothing.
    pub fn delete_selected(&self) -> Result<usize, StateError> {
        let removed = self.store.update(&self.base(), |list| {
            let Some(items) = list.as_array_mut() else {
                return 0;
            };
            let before = items.len();
            items.retain(|item| !is_marked(item));
            before - items.len()
        })?;
        #[cfg(feature = "tracing")]
        tracing::debug!(base = %self.base(), removed, "delete selected");
        Ok(removed)
    }

    // --- Lifetime ---

    /// Drop every subscription this view holds. Idempotent.
    pub fn detach(&self) {
        let (store, components) = {
            let mut inner = self.inner.borrow_mut();
            if !std::mem::replace(&mut inner.attached, false) {
                return;
            }
            let mut components = std::mem::take(&mut inner.items);
            components.push(inner.base_component);
            (inner.store.upgrade(), components)
        };
        if let Some(store) = store {
            for component in components {
                store.unsubscribe(component);
            }
        }
    }

    /// Whether the view still holds its subscriptions.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.borrow().attached
    }
}

impl Drop for ListView {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for ListView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ListView")
            .field("base", &inner.base)
            .field("items", &inner.items.len())
            .field("attached", &inner.attached)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Rebinding
// ---------------------------------------------------------------------------

/// Bring the item subscriptions in line with a sequence of length `len`.
///
/// The list borrow is released around every store call: subscribing pushes
/// the item's value synchronously and the item callback may read the view.
fn rebind(list: &Weak<RefCell<ListInner>>, len: usize) {
    let Some(list) = list.upgrade() else {
        return;
    };
    let (store, base, on_item, bound) = {
        let inner = list.borrow();
        if !inner.attached {
            return;
        }
        let Some(store) = inner.store.upgrade() else {
            return;
        };
        (
            store,
            inner.base.clone(),
            Rc::clone(&inner.on_item),
            inner.items.len(),
        )
    };

    if len < bound {
        let surplus = list.borrow_mut().items.split_off(len);
        #[cfg(feature = "tracing")]
        tracing::debug!(base = %base, from = bound, to = len, "unbind trailing items");
        for component in surplus {
            store.unsubscribe(component);
        }
        return;
    }

    #[cfg(feature = "tracing")]
    if len > bound {
        tracing::debug!(base = %base, from = bound, to = len, "bind trailing items");
    }
    for index in bound..len {
        let component = ComponentId::new();
        list.borrow_mut().items.push(component);
        let on_item = Rc::clone(&on_item);
        store.subscribe(component, item_path(&base, index), move |update: &StateUpdate<'_>| {
            on_item(&ItemUpdate {
                index,
                path: update.path,
                value: update.value,
                selected: is_marked(update.value),
                cause: update.cause,
            });
        });
    }
}
