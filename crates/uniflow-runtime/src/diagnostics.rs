#![forbid(unsafe_code)]

//! Development-time diagnostics.
//!
//! Failures that must not abort a propagation pass or a dispatch (an
//! unresolvable subscription path, a faulting handler) are logged at `warn`
//! and kept in a bounded log so tests and dev tooling can inspect them.

use std::collections::VecDeque;
use std::fmt;

use uniflow_core::{Path, StateError};

use crate::component::ComponentId;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A subscription path did not resolve.
    PathNotFound,
    /// A subscription path met the wrong node shape.
    TypeMismatch,
    /// A dispatcher handler returned an error.
    HandlerFault,
    /// An action was dropped because the dispatch queue was full.
    QueueOverflow,
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Category.
    pub kind: DiagnosticKind,
    /// Affected path, when there is one.
    pub path: Option<Path>,
    /// Affected component, when there is one.
    pub component: Option<ComponentId>,
    /// Human-readable detail.
    pub message: String,
}

impl Diagnostic {
    /// Diagnostic for a subscription whose path failed to resolve.
    #[must_use]
    pub fn from_state_error(component: ComponentId, error: &StateError) -> Self {
        let kind = match error {
            StateError::PathNotFound { .. } => DiagnosticKind::PathNotFound,
            StateError::TypeMismatch { .. } => DiagnosticKind::TypeMismatch,
        };
        Self {
            kind,
            path: Some(error.path().clone()),
            component: Some(component),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Ring buffer of recent diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct Diagnostics {
    entries: VecDeque<Diagnostic>,
    capacity: usize,
    dropped: u64,
}

impl Diagnostics {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
            dropped: 0,
        }
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = ?diagnostic.kind,
            path = diagnostic.path.as_ref().map(tracing::field::display),
            component = diagnostic.component.map(tracing::field::display),
            "{}",
            diagnostic.message
        );
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(diagnostic);
    }

    pub(crate) fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.iter().cloned().collect()
    }

    pub(crate) fn take(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    pub(crate) const fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(message: &str) -> Diagnostic {
        Diagnostic {
            kind: DiagnosticKind::HandlerFault,
            path: None,
            component: None,
            message: message.to_owned(),
        }
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut log = Diagnostics::new(2);
        log.record(diag("a"));
        log.record(diag("b"));
        log.record(diag("c"));
        let messages: Vec<_> = log.snapshot().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, ["b", "c"]);
        assert_eq!(log.dropped(), 1);
    }

    #[test]
    #[tracing_test::traced_test]
    fn record_logs_a_warning() {
        let mut log = Diagnostics::new(4);
        log.record(diag("handler todo-list exploded"));
        assert!(logs_contain("handler todo-list exploded"));
        assert!(logs_contain("HandlerFault"));
    }

    #[test]
    fn take_drains() {
        let mut log = Diagnostics::new(4);
        log.record(diag("a"));
        assert_eq!(log.take().len(), 1);
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut log = Diagnostics::new(0);
        log.record(diag("a"));
        assert!(log.snapshot().is_empty());
        assert_eq!(log.dropped(), 1);
    }

    #[test]
    fn from_state_error_classifies() {
        let path = Path::parse("a.b").unwrap();
        let err = StateError::PathNotFound {
            path: path.clone(),
            at: path.clone(),
        };
        let id = ComponentId::new();
        let d = Diagnostic::from_state_error(id, &err);
        assert_eq!(d.kind, DiagnosticKind::PathNotFound);
        assert_eq!(d.path, Some(path));
        assert_eq!(d.component, Some(id));
    }
}
