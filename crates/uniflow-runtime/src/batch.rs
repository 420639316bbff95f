#![forbid(unsafe_code)]

//! Batched propagation.
//!
//! Inside a [`BatchScope`], writes apply to the state tree immediately but
//! notifications are deferred. Nested scopes are supported; only the
//! outermost scope flushes when it drops.
//!
//! # Invariants
//!
//! 1. Reads inside a batch observe every write made so far.
//! 2. A subscription affected by several writes in one batch is notified at
//!    most once per flush when one change covers the others.

use crate::store::Store;

/// RAII guard returned by [`Store::begin_batch`].
#[must_use = "dropping the scope immediately ends the batch"]
pub struct BatchScope {
    store: Store,
}

impl BatchScope {
    pub(crate) fn new(store: &Store) -> Self {
        store.inner.borrow_mut().batch_depth += 1;
        Self {
            store: store.clone(),
        }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = {
            let mut inner = self.store.inner.borrow_mut();
            inner.batch_depth = inner.batch_depth.saturating_sub(1);
            inner.batch_depth == 0
        };
        if outermost {
            self.store.flush();
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope").finish_non_exhaustive()
    }
}
