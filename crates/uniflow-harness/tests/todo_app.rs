#![forbid(unsafe_code)]

//! End-to-end: the reference todo application.

use serde_json::json;
use uniflow_core::{Action, Path};
use uniflow_harness::UpdateRecorder;
use uniflow_harness::fixtures::{TODOS, todo_app};
use uniflow_runtime::{DispatchState, Emission, VersionedSnapshot};
use uniflow_widgets::ListView;

fn p(s: &str) -> Path {
    Path::parse(s).unwrap()
}

#[test]
fn add_toggle_delete_cycle() {
    let app = todo_app().unwrap();
    let store = app.store();
    let list = UpdateRecorder::new();
    list.subscribe(store, TODOS);
    let view = ListView::attach(store, p(TODOS), |_| {});
    assert_eq!(view.len(), 2);

    let emission = app.emit(Action::new("ADD_ITEM").with("value", "bread"));
    assert_eq!(
        emission.report().map(|r| r.state),
        Some(DispatchState::Consumed)
    );
    assert_eq!(view.len(), 3);
    assert_eq!(
        store.get(&p("todos.#2")).unwrap(),
        json!({ "id": 3, "text": "bread", "done": false })
    );

    app.emit(Action::new("TOGGLE_DONE").with("index", 0));
    assert_eq!(store.get(&p("todos.#0.done")).unwrap(), json!(true));

    view.set_selected(0, true).unwrap();
    view.set_selected(1, true).unwrap();
    list.clear();
    app.emit(Action::new("DELETE_SELECTED"));
    assert_eq!(list.changes().len(), 1);
    assert_eq!(view.len(), 1);
    assert_eq!(store.get(&p("todos.#0.text")).unwrap(), json!("bread"));
}

#[test]
fn malformed_payload_faults_without_touching_state() {
    let app = todo_app().unwrap();
    let before = app.store().snapshot();
    let Emission::Dispatched { report, .. } = app.emit(Action::new("ADD_ITEM")) else {
        panic!("expected immediate dispatch");
    };
    assert_eq!(report.state, DispatchState::Exhausted);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(app.store().snapshot(), before);
}

#[test]
fn actions_from_json_and_snapshot_restore() {
    let app = todo_app().unwrap();
    let store = app.store();
    let saved = store.snapshot().to_json().unwrap();

    let action = Action::from_json_str(r#"{"type":"ADD_ITEM","value":"tea"}"#).unwrap();
    app.emit(action);
    assert_eq!(store.len_at(&p(TODOS)).unwrap(), 3);

    let view = ListView::attach(store, p(TODOS), |_| {});
    store
        .restore(VersionedSnapshot::from_json(&saved).unwrap())
        .unwrap();
    assert_eq!(store.len_at(&p(TODOS)).unwrap(), 2);
    assert_eq!(view.len(), 2);
}
