#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};
use uniflow_core::{Path, Segment, StateTree};
use uniflow_runtime::{ComponentId, Store};

#[derive(Debug, Arbitrary)]
enum Step {
    Key(u8),
    Index(u8),
}

#[derive(Debug, Arbitrary)]
enum Op {
    Set(Vec<Step>, u8),
    Remove(Vec<Step>),
    Push(Vec<Step>, u8),
    Subscribe(Vec<Step>),
}

fn path(steps: &[Step]) -> Path {
    steps
        .iter()
        .take(4)
        .map(|s| match s {
            Step::Key(k) => Segment::key(format!("k{}", k % 4)),
            Step::Index(i) => Segment::index(usize::from(i % 4)),
        })
        .collect()
}

fn value(v: u8) -> Value {
    match v % 4 {
        0 => json!(v),
        1 => json!({}),
        2 => json!([]),
        _ => json!([v, v]),
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let store = Store::new(StateTree::new());
    for op in ops.iter().take(64) {
        let before = store.tree();
        let failed = match op {
            Op::Set(steps, v) => store.set(&path(steps), value(*v)).is_err(),
            Op::Remove(steps) => store.remove(&path(steps)).is_err(),
            Op::Push(steps, v) => store.push(&path(steps), value(*v)).is_err(),
            Op::Subscribe(steps) => {
                store.subscribe(ComponentId::new(), path(steps), |_| {});
                false
            }
        };
        if failed {
            assert_eq!(store.tree(), before, "failed write must not change the tree");
        }
        assert!(store.tree().root().is_object());
    }
});
