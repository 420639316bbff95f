#![forbid(unsafe_code)]

//! Integration tests: dispatcher ordering, consumption, and fault isolation.

use serde_json::json;
use uniflow_core::{Action, Path, StateTree};
use uniflow_harness::{CallLog, RecordingDispatcher, UpdateRecorder, call_order};
use uniflow_runtime::{
    ActionEmitter, DiagnosticKind, DispatchState, DispatcherChain, DispatcherNode, Emission, Flow,
    Store,
};

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

fn recording(name: &str, log: &CallLog, flow: Flow) -> RecordingDispatcher {
    RecordingDispatcher::new(name, log, flow)
}

fn emitter(store: &Store, nodes: Vec<DispatcherNode>) -> ActionEmitter {
    let mut chain = DispatcherChain::new();
    for node in nodes {
        chain.attach(None, node).unwrap();
    }
    ActionEmitter::new(store.clone(), chain)
}

fn report(emission: Emission) -> uniflow_runtime::DispatchReport {
    match emission {
        Emission::Dispatched { report, .. } => report,
        other => panic!("expected dispatch, got {other:?}"),
    }
}

// ============================================================================
// Consumption
// ============================================================================

#[test]
fn add_item_through_declining_then_consuming_dispatcher() {
    let store = Store::new(StateTree::from_value(json!({ "items": [] })).unwrap());
    let log = CallLog::default();
    let a = recording("A", &log, Flow::Continue);
    let b = recording("B", &log, Flow::Stop).writing(p("items"), json!(["X"]));
    let c = recording("C", &log, Flow::Stop).writing(p("items"), json!(["never"]));
    let emitter = emitter(
        &store,
        vec![
            DispatcherNode::new(a),
            DispatcherNode::new(b),
            DispatcherNode::new(c),
        ],
    );

    let report = report(emitter.emit(Action::new("ADD_ITEM").with("value", "X")));
    assert_eq!(report.state, DispatchState::Consumed);
    assert_eq!(report.consumed_name.as_deref(), Some("B"));
    assert_eq!(report.visited.len(), 2);
    assert_eq!(call_order(&log), vec!["A", "B"]);
    assert_eq!(store.get(&p("items")).unwrap(), json!(["X"]));
}

#[test]
fn declined_by_everyone_is_exhausted_not_an_error() {
    let store = Store::new(StateTree::new());
    let log = CallLog::default();
    let emitter = emitter(
        &store,
        vec![
            DispatcherNode::new(recording("A", &log, Flow::Continue)),
            DispatcherNode::new(recording("B", &log, Flow::Continue)),
        ],
    );
    let report = report(emitter.emit(Action::new("UNKNOWN")));
    assert_eq!(report.state, DispatchState::Exhausted);
    assert!(report.faults.is_empty());
    assert!(store.diagnostics().is_empty());
}

// ============================================================================
// Hierarchical ordering
// ============================================================================

#[test]
fn children_before_parent() {
    let store = Store::new(StateTree::new());
    let log = CallLog::default();
    let tree = DispatcherNode::new(recording("app", &log, Flow::Continue))
        .child(
            DispatcherNode::new(recording("sidebar", &log, Flow::Continue))
                .child(DispatcherNode::new(recording("menu", &log, Flow::Continue))),
        )
        .child(DispatcherNode::new(recording("editor", &log, Flow::Continue)));
    let emitter = emitter(&store, vec![tree]);
    emitter.emit(Action::new("PING"));
    assert_eq!(call_order(&log), vec!["menu", "sidebar", "editor", "app"]);
}

#[test]
fn specialized_child_overrides_generic_parent() {
    let store = Store::new(StateTree::from_value(json!({ "handled_by": null })).unwrap());
    let log = CallLog::default();
    let generic = recording("generic", &log, Flow::Stop).writing(p("handled_by"), json!("generic"));
    let special = recording("special", &log, Flow::Stop)
        .only("SAVE")
        .writing(p("handled_by"), json!("special"));
    let emitter = emitter(
        &store,
        vec![DispatcherNode::new(generic).child(DispatcherNode::new(special))],
    );

    emitter.emit(Action::new("SAVE"));
    assert_eq!(store.get(&p("handled_by")).unwrap(), json!("special"));

    emitter.emit(Action::new("LOAD"));
    assert_eq!(store.get(&p("handled_by")).unwrap(), json!("generic"));
}

#[test]
fn runtime_attach_recomputes_order() {
    let store = Store::new(StateTree::new());
    let log = CallLog::default();
    let mut chain = DispatcherChain::new();
    let app = chain
        .attach(None, DispatcherNode::new(recording("app", &log, Flow::Continue)))
        .unwrap();
    let emitter = ActionEmitter::new(store, chain);
    emitter
        .attach(Some(app), DispatcherNode::new(recording("dialog", &log, Flow::Continue)))
        .unwrap();
    assert_eq!(emitter.dispatcher_names(), vec!["dialog", "app"]);
    emitter.emit(Action::new("PING"));
    assert_eq!(call_order(&log), vec!["dialog", "app"]);
}

// ============================================================================
// Faults
// ============================================================================

#[test]
fn faulting_handler_leaves_tree_unchanged_and_next_still_runs() {
    let store = Store::new(StateTree::from_value(json!({ "count": 0 })).unwrap());
    let watcher = UpdateRecorder::new();
    watcher.subscribe(&store, "count");

    let log = CallLog::default();
    let broken = recording("broken", &log, Flow::Stop)
        .writing(p("count"), json!(41))
        .failing("disk on fire");
    let next = recording("next", &log, Flow::Continue);
    let emitter = emitter(&store, vec![DispatcherNode::new(broken), DispatcherNode::new(next)]);

    let report = report(emitter.emit(Action::new("INC")));
    assert_eq!(call_order(&log), vec!["broken", "next"]);
    assert_eq!(report.state, DispatchState::Exhausted);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].error.to_string(), "disk on fire");
    assert_eq!(store.get(&p("count")).unwrap(), json!(0));
    assert!(watcher.changes().is_empty(), "rolled-back writes are not delivered");

    let diagnostics = store.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::HandlerFault);
}

#[test]
fn state_error_in_handler_is_a_fault() {
    let store = Store::new(StateTree::from_value(json!({ "list": [] })).unwrap());
    let log = CallLog::default();
    let bad_write = recording("bad", &log, Flow::Stop).writing(p("list.#3"), json!(1));
    let emitter = emitter(&store, vec![DispatcherNode::new(bad_write)]);
    let report = report(emitter.emit(Action::new("X")));
    assert_eq!(report.faults.len(), 1);
    assert!(matches!(
        report.faults[0].error,
        uniflow_runtime::HandlerError::State(_)
    ));
}
