#![forbid(unsafe_code)]

//! Dispatchers built from named entry points.

use ahash::AHashMap;
use uniflow_core::Action;

use super::{DispatchContext, Dispatcher, Flow, HandlerResult};

type Entry = Box<dyn FnMut(&Action, &mut DispatchContext<'_>) -> HandlerResult>;

/// A [`Dispatcher`] that routes actions by type to registered closures.
///
/// Actions with no entry are declined with [`Flow::Continue`].
///
/// ```ignore
/// let todos = HandlerTable::new("todos")
///     .on("ADD_ITEM", |action, ctx| {
///         let text: String = action.field("text")?;
///         ctx.store().push(&Path::parse("items")?, json!({ "text": text }))?;
///         Ok(Flow::Stop)
///     });
/// ```
pub struct HandlerTable {
    name: String,
    entries: AHashMap<String, Entry>,
}

impl HandlerTable {
    /// An empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: AHashMap::new(),
        }
    }

    /// Register the entry point for `kind`, replacing any earlier one.
    #[must_use]
    pub fn on(
        mut self,
        kind: impl Into<String>,
        entry: impl FnMut(&Action, &mut DispatchContext<'_>) -> HandlerResult + 'static,
    ) -> Self {
        self.entries.insert(kind.into(), Box::new(entry));
        self
    }

    /// Whether an entry exists for `kind`.
    #[must_use]
    pub fn handles(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered action types, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.entries.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Dispatcher for HandlerTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&mut self, action: &Action, ctx: &mut DispatchContext<'_>) -> HandlerResult {
        match self.entries.get_mut(action.kind()) {
            Some(entry) => entry(action, ctx),
            None => Ok(Flow::Continue),
        }
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("name", &self.name)
            .field("kinds", &self.kinds())
            .finish()
    }
}
