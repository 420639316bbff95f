#![forbid(unsafe_code)]

//! Component identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for unique component IDs.
static COMPONENT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a live component instance.
///
/// IDs are unique for the lifetime of the process and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh ID.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(COMPONENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}
