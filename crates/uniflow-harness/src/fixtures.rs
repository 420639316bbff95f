#![forbid(unsafe_code)]

//! Reference fixtures: a small todo application and proptest strategies.

use proptest::prelude::*;
use serde_json::{Value, json};
use uniflow_core::{Path, Segment};
use uniflow_runtime::{App, AppBuilder, ConfigError, DispatcherNode, Flow, HandlerTable};
use uniflow_widgets::{SELECTED_FIELD, is_marked};

/// Path of the todo list in [`todo_state`].
pub const TODOS: &str = "todos";

/// Initial todo application state: two items and a user.
#[must_use]
pub fn todo_state() -> Value {
    json!({
        "user": { "name": "ada" },
        "todos": [
            { "id": 1, "text": "milk", "done": false },
            { "id": 2, "text": "eggs", "done": true }
        ]
    })
}

/// The mixed-selection list used by deletion tests.
#[must_use]
pub fn selection_list() -> Value {
    json!([
        { "id": 1, SELECTED_FIELD: true },
        { "id": 2, SELECTED_FIELD: false },
        { "id": 3, SELECTED_FIELD: true }
    ])
}

/// `[{ "id": 0 }, .. { "id": n-1 }]`.
#[must_use]
pub fn numbered_list(n: usize) -> Value {
    Value::Array((0..n).map(|id| json!({ "id": id })).collect())
}

fn todos() -> Path {
    Path::from_segments([Segment::key(TODOS)])
}

/// Handlers for the todo application:
///
/// | Action | Payload | Effect |
/// |--------|---------|--------|
/// | `ADD_ITEM` | `value` | append `{ id, text: value, done: false }` |
/// | `TOGGLE_DONE` | `index` | flip `done` |
/// | `DELETE_SELECTED` | | drop items marked selected |
#[must_use]
pub fn todo_handlers() -> HandlerTable {
    HandlerTable::new("todo-list")
        .on("ADD_ITEM", |action, ctx| {
            let text: String = action.field("value")?;
            let store = ctx.store();
            let next_id = store
                .with(&todos(), |list| {
                    list.as_array()
                        .and_then(|items| items.iter().filter_map(|i| i["id"].as_u64()).max())
                        .map_or(1, |max| max + 1)
                })
                .unwrap_or(1);
            store.push(&todos(), json!({ "id": next_id, "text": text, "done": false }))?;
            Ok(Flow::Stop)
        })
        .on("TOGGLE_DONE", |action, ctx| {
            let index: usize = action.field("index")?;
            let done = todos().child_index(index).child_key("done");
            let current = ctx.store().get(&done)?;
            ctx.store().set(&done, Value::Bool(current != Value::Bool(true)))?;
            Ok(Flow::Stop)
        })
        .on("DELETE_SELECTED", |_, ctx| {
            ctx.store().update(&todos(), |list| {
                if let Some(items) = list.as_array_mut() {
                    items.retain(|item| !is_marked(item));
                }
            })?;
            Ok(Flow::Stop)
        })
}

/// The todo application with [`todo_handlers`] as its only dispatcher.
pub fn todo_app() -> Result<App, ConfigError> {
    AppBuilder::new()
        .application_state("todo-app", todo_state())
        .dispatcher(DispatcherNode::new(todo_handlers()))
        .build()
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// A segment drawn from a small alphabet so generated paths often overlap.
pub fn arb_segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        prop::sample::select(vec!["a", "b", "c"]).prop_map(Segment::key),
        (0usize..3).prop_map(Segment::index),
    ]
}

/// A path of up to `max_len` segments.
pub fn arb_path(max_len: usize) -> impl Strategy<Value = Path> {
    prop::collection::vec(arb_segment(), 0..=max_len).prop_map(Path::from_segments)
}
