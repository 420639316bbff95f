#![forbid(unsafe_code)]

//! Change propagation planning.
//!
//! Given the paths written since the last flush, decide which subscriptions
//! hear about it and how:
//!
//! | Subscription path vs. changed path | Delivery |
//! |------------------------------------|----------|
//! | equal or ancestor | always, with the recomputed value |
//! | descendant | only if its value differs from the last one delivered |
//! | unrelated | never |
//!
//! A change carrying an origin is never echoed back to that origin.
//!
//! Planning only selects targets. Values are resolved at delivery time, one
//! target at a time, so a subscription removed by an earlier callback in the
//! same pass is skipped instead of receiving a stale update.

use uniflow_core::{Path, PathRelation};

use crate::component::ComponentId;
use crate::registry::SubscriptionRegistry;

/// A write recorded for propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Change {
    pub(crate) path: Path,
    pub(crate) origin: Option<ComponentId>,
}

/// Why a target is being delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reach {
    /// First push after registration.
    Initial,
    /// The subscription path equals or contains a changed path.
    Covering,
    /// The subscription path lies below a changed path.
    Nested,
}

/// A subscription selected for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Target {
    pub(crate) component: ComponentId,
    pub(crate) seq: u64,
    pub(crate) reach: Reach,
}

/// Select the subscriptions affected by `changes`, in registration order.
pub(crate) fn plan(registry: &SubscriptionRegistry, changes: &[Change]) -> Vec<Target> {
    let mut targets = Vec::new();
    for (component, entry) in registry.ordered() {
        let mut reach = None;
        for change in changes {
            if change.origin == Some(component) {
                continue;
            }
            match entry.path.relation(&change.path) {
                PathRelation::Equal | PathRelation::Ancestor => {
                    reach = Some(Reach::Covering);
                    break;
                }
                PathRelation::Descendant => reach = reach.or(Some(Reach::Nested)),
                PathRelation::Unrelated => {}
            }
        }
        if let Some(reach) = reach {
            targets.push(Target {
                component,
                seq: entry.seq,
                reach,
            });
        }
    }
    targets
}

/// Drop changes already covered by an earlier or broader change with the
/// same origin.
pub(crate) fn coalesce(changes: Vec<Change>) -> Vec<Change> {
    let mut kept: Vec<Change> = Vec::with_capacity(changes.len());
    for change in changes {
        if kept
            .iter()
            .any(|k| k.origin == change.origin && k.path.relation(&change.path).covers())
        {
            continue;
        }
        kept.retain(|k| !(k.origin == change.origin && change.path.is_ancestor_of(&k.path)));
        kept.push(change);
    }
    kept
}
