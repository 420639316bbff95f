#![forbid(unsafe_code)]

//! Path resolution against a [`Value`] tree.
//!
//! Reads walk the tree segment by segment: key segments index mappings,
//! `#N` segments index sequences. Writes share the same walk but create
//! missing intermediate mappings on the way down.
//!
//! # Invariants
//!
//! 1. Writes never create sequence slots: an index segment must address an
//!    existing element, at any depth.
//! 2. A failed write leaves the tree untouched: the whole walk is checked
//!    before any intermediate mapping is created.
//! 3. The root of a tree can only be replaced by a mapping.
//!
//! # Failure Modes
//!
//! | Failure | Cause |
//! |---------|-------|
//! | [`StateError::PathNotFound`] | Missing key, index out of bounds |
//! | [`StateError::TypeMismatch`] | Key on a sequence, index on a mapping, any segment on a scalar |

use serde_json::{Map, Value};

use crate::error::{NodeKind, StateError};
use crate::path::{Path, Segment};

enum Step {
    Missing,
    Mismatch { expected: NodeKind, found: NodeKind },
}

impl Step {
    fn mismatch(segment: &Segment, found: &Value) -> Self {
        let expected = match segment {
            Segment::Key(_) => NodeKind::Mapping,
            Segment::Index(_) => NodeKind::Sequence,
        };
        Self::Mismatch {
            expected,
            found: NodeKind::of(found),
        }
    }

    fn into_error(self, path: &Path, depth: usize) -> StateError {
        let at = path.prefix(depth + 1);
        match self {
            Self::Missing => StateError::PathNotFound {
                path: path.clone(),
                at,
            },
            Self::Mismatch { expected, found } => StateError::TypeMismatch {
                path: path.clone(),
                at,
                expected,
                found,
            },
        }
    }
}

fn step<'a>(node: &'a Value, segment: &Segment) -> Result<&'a Value, Step> {
    match (segment, node) {
        (Segment::Key(key), Value::Object(map)) => map.get(key).ok_or(Step::Missing),
        (Segment::Index(index), Value::Array(items)) => items.get(*index).ok_or(Step::Missing),
        (segment, other) => Err(Step::mismatch(segment, other)),
    }
}

fn step_mut<'a>(node: &'a mut Value, segment: &Segment) -> Result<&'a mut Value, Step> {
    match (segment, node) {
        (Segment::Key(key), Value::Object(map)) => map.get_mut(key).ok_or(Step::Missing),
        (Segment::Index(index), Value::Array(items)) => {
            items.get_mut(*index).ok_or(Step::Missing)
        }
        (segment, other) => Err(Step::mismatch(segment, other)),
    }
}

/// Like [`step_mut`], but a missing key in a mapping is filled with an
/// empty mapping.
fn step_or_create<'a>(node: &'a mut Value, segment: &Segment) -> Result<&'a mut Value, Step> {
    match (segment, node) {
        (Segment::Key(key), Value::Object(map)) => Ok(map
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()))),
        (Segment::Index(index), Value::Array(items)) => {
            items.get_mut(*index).ok_or(Step::Missing)
        }
        (segment, other) => Err(Step::mismatch(segment, other)),
    }
}

/// Resolve `path` for reading.
pub fn resolve<'a>(tree: &'a Value, path: &Path) -> Result<&'a Value, StateError> {
    let mut node = tree;
    for (depth, segment) in path.segments().iter().enumerate() {
        node = step(node, segment).map_err(|s| s.into_error(path, depth))?;
    }
    Ok(node)
}

/// Resolve `path` for in-place mutation. Nothing is created.
pub fn resolve_mut<'a>(tree: &'a mut Value, path: &Path) -> Result<&'a mut Value, StateError> {
    let mut node = tree;
    for (depth, segment) in path.segments().iter().enumerate() {
        node = step_mut(node, segment).map_err(|s| s.into_error(path, depth))?;
    }
    Ok(node)
}

/// Whether `path` resolves to a value.
#[must_use]
pub fn exists(tree: &Value, path: &Path) -> bool {
    resolve(tree, path).is_ok()
}

/// Check that [`write`] to `path` would succeed, without touching `tree`.
///
/// Below the first missing key every node is an empty mapping that
/// `write` would create, so only key segments can follow it.
fn check_write(tree: &Value, path: &Path) -> Result<(), StateError> {
    let mut node = Some(tree);
    for (depth, segment) in path.segments().iter().enumerate() {
        let Some(current) = node else {
            if matches!(segment, Segment::Index(_)) {
                let created = Value::Object(Map::new());
                return Err(Step::mismatch(segment, &created).into_error(path, depth));
            }
            continue;
        };
        node = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(index), Value::Array(items)) => Some(
                items
                    .get(*index)
                    .ok_or_else(|| Step::Missing.into_error(path, depth))?,
            ),
            (segment, other) => return Err(Step::mismatch(segment, other).into_error(path, depth)),
        };
    }
    Ok(())
}

/// Store `value` at `path`, returning the value it replaced.
///
/// Missing intermediate keys are created as empty mappings. The last
/// segment may add a new key to a mapping, but an index must address an
/// existing element.
pub fn write(tree: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, StateError> {
    let Some((last, init)) = path.segments().split_last() else {
        if !value.is_object() {
            return Err(StateError::TypeMismatch {
                path: path.clone(),
                at: Path::root(),
                expected: NodeKind::Mapping,
                found: NodeKind::of(&value),
            });
        }
        return Ok(Some(std::mem::replace(tree, value)));
    };
    check_write(tree, path)?;

    let mut node = tree;
    for (depth, segment) in init.iter().enumerate() {
        node = step_or_create(node, segment).map_err(|s| s.into_error(path, depth))?;
    }

    let depth = init.len();
    match (last, node) {
        (Segment::Key(key), Value::Object(map)) => Ok(map.insert(key.clone(), value)),
        (Segment::Index(index), Value::Array(items)) => match items.get_mut(*index) {
            Some(slot) => Ok(Some(std::mem::replace(slot, value))),
            None => Err(Step::Missing.into_error(path, depth)),
        },
        (segment, other) => Err(Step::mismatch(segment, other).into_error(path, depth)),
    }
}

/// Remove and return the value at `path`.
///
/// Removing a sequence element shifts the trailing elements down. The root
/// has no enclosing slot and reports [`StateError::PathNotFound`].
pub fn remove(tree: &mut Value, path: &Path) -> Result<Value, StateError> {
    let Some((last, init)) = path.segments().split_last() else {
        return Err(StateError::PathNotFound {
            path: path.clone(),
            at: Path::root(),
        });
    };
    let parent_path = path.prefix(init.len());
    let parent = resolve_mut(tree, &parent_path)?;
    let depth = init.len();
    match (last, parent) {
        (Segment::Key(key), Value::Object(map)) => map
            .remove(key)
            .ok_or_else(|| Step::Missing.into_error(path, depth)),
        (Segment::Index(index), Value::Array(items)) => {
            if *index < items.len() {
                Ok(items.remove(*index))
            } else {
                Err(Step::Missing.into_error(path, depth))
            }
        }
        (segment, other) => Err(Step::mismatch(segment, other).into_error(path, depth)),
    }
}

fn sequence_mut<'a>(tree: &'a mut Value, path: &Path) -> Result<&'a mut Vec<Value>, StateError> {
    match resolve_mut(tree, path)? {
        Value::Array(items) => Ok(items),
        other => Err(StateError::TypeMismatch {
            path: path.clone(),
            at: path.clone(),
            expected: NodeKind::Sequence,
            found: NodeKind::of(other),
        }),
    }
}

/// Insert `value` at position `index` of the sequence at `path`.
///
/// `index` may equal the current length (append).
pub fn insert(tree: &mut Value, path: &Path, index: usize, value: Value) -> Result<(), StateError> {
    let items = sequence_mut(tree, path)?;
    if index > items.len() {
        let target = path.child_index(index);
        return Err(StateError::PathNotFound {
            path: target.clone(),
            at: target,
        });
    }
    items.insert(index, value);
    Ok(())
}

/// Append `value` to the sequence at `path`, returning its index.
pub fn push(tree: &mut Value, path: &Path, value: Value) -> Result<usize, StateError> {
    let items = sequence_mut(tree, path)?;
    items.push(value);
    Ok(items.len() - 1)
}

/// Length of the sequence at `path`.
pub fn sequence_len(tree: &Value, path: &Path) -> Result<usize, StateError> {
    match resolve(tree, path)? {
        Value::Array(items) => Ok(items.len()),
        other => Err(StateError::TypeMismatch {
            path: path.clone(),
            at: path.clone(),
            expected: NodeKind::Sequence,
            found: NodeKind::of(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn sample() -> Value {
        json!({
            "user": { "name": "ada", "tags": ["x", "y"] },
            "todos": [
                { "id": 1, "title": "write" },
                { "id": 2, "title": "test" }
            ]
        })
    }

    #[test]
    fn resolves_keys_and_indices() {
        let tree = sample();
        assert_eq!(resolve(&tree, &p("user.name")).unwrap(), &json!("ada"));
        assert_eq!(resolve(&tree, &p("todos.#1.title")).unwrap(), &json!("test"));
        assert_eq!(resolve(&tree, &p("user.tags.#0")).unwrap(), &json!("x"));
        assert_eq!(resolve(&tree, &Path::root()).unwrap(), &tree);
    }

    #[test]
    fn missing_intermediate_is_not_found() {
        let tree = sample();
        let err = resolve(&tree, &p("user.address.city")).unwrap_err();
        assert_eq!(
            err,
            StateError::PathNotFound {
                path: p("user.address.city"),
                at: p("user.address"),
            }
        );
        let err = resolve(&tree, &p("todos.#5")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn index_on_mapping_is_type_mismatch() {
        let tree = sample();
        let err = resolve(&tree, &p("user.#0")).unwrap_err();
        assert_eq!(
            err,
            StateError::TypeMismatch {
                path: p("user.#0"),
                at: p("user.#0"),
                expected: NodeKind::Sequence,
                found: NodeKind::Mapping,
            }
        );
    }

    #[test]
    fn key_on_sequence_is_type_mismatch() {
        let tree = sample();
        let err = resolve(&tree, &p("todos.first")).unwrap_err();
        assert!(matches!(
            err,
            StateError::TypeMismatch {
                expected: NodeKind::Mapping,
                found: NodeKind::Sequence,
                ..
            }
        ));
    }

    #[test]
    fn descending_into_scalar_is_type_mismatch() {
        let tree = sample();
        let err = resolve(&tree, &p("user.name.first")).unwrap_err();
        assert!(matches!(
            err,
            StateError::TypeMismatch {
                found: NodeKind::String,
                ..
            }
        ));
    }

    #[test]
    fn write_creates_intermediate_mappings() {
        let mut tree = sample();
        let prev = write(&mut tree, &p("settings.theme.mode"), json!("dark")).unwrap();
        assert_eq!(prev, None);
        assert_eq!(tree["settings"], json!({ "theme": { "mode": "dark" } }));
    }

    #[test]
    fn write_replaces_and_returns_previous() {
        let mut tree = sample();
        let prev = write(&mut tree, &p("todos.#0.title"), json!("draft")).unwrap();
        assert_eq!(prev, Some(json!("write")));
        assert_eq!(tree["todos"][0]["title"], json!("draft"));
    }

    #[test]
    fn write_never_creates_array_slots() {
        let mut tree = sample();
        let before = tree.clone();
        let err = write(&mut tree, &p("todos.#2"), json!({})).unwrap_err();
        assert!(err.is_not_found());
        let err = write(&mut tree, &p("todos.#7.title"), json!("x")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(tree, before);
    }

    #[test]
    fn write_through_scalar_fails() {
        let mut tree = sample();
        let err = write(&mut tree, &p("user.name.first"), json!("a")).unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
    }

    #[test]
    fn failed_write_creates_no_intermediate_mappings() {
        let mut tree = json!({});
        let err = write(&mut tree, &p("a.#0"), json!(1)).unwrap_err();
        assert!(matches!(
            err,
            StateError::TypeMismatch {
                expected: NodeKind::Sequence,
                found: NodeKind::Mapping,
                ..
            }
        ));
        assert_eq!(tree, json!({}));

        let mut tree = sample();
        let before = tree.clone();
        assert!(write(&mut tree, &p("settings.theme.#0.mode"), json!("dark")).is_err());
        assert!(write(&mut tree, &p("settings.todos.#0"), json!(1)).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn root_write_requires_mapping() {
        let mut tree = sample();
        assert!(write(&mut tree, &Path::root(), json!([1, 2])).is_err());
        let prev = write(&mut tree, &Path::root(), json!({ "fresh": true })).unwrap();
        assert_eq!(prev, Some(sample()));
        assert_eq!(tree, json!({ "fresh": true }));
    }

    #[test]
    fn remove_key_and_element() {
        let mut tree = sample();
        assert_eq!(remove(&mut tree, &p("user.name")).unwrap(), json!("ada"));
        let removed = remove(&mut tree, &p("todos.#0")).unwrap();
        assert_eq!(removed["id"], json!(1));
        assert_eq!(tree["todos"], json!([{ "id": 2, "title": "test" }]));
        assert!(remove(&mut tree, &p("todos.#3")).unwrap_err().is_not_found());
        assert!(remove(&mut tree, &Path::root()).unwrap_err().is_not_found());
    }

    #[test]
    fn insert_and_push() {
        let mut tree = sample();
        insert(&mut tree, &p("user.tags"), 1, json!("mid")).unwrap();
        assert_eq!(tree["user"]["tags"], json!(["x", "mid", "y"]));
        assert_eq!(push(&mut tree, &p("user.tags"), json!("z")).unwrap(), 3);
        assert_eq!(sequence_len(&tree, &p("user.tags")).unwrap(), 4);
        assert!(insert(&mut tree, &p("user.tags"), 9, json!("far")).is_err());
        assert!(push(&mut tree, &p("user"), json!(1)).is_err());
    }

    #[test]
    fn exists_reports_resolution() {
        let tree = sample();
        assert!(exists(&tree, &p("todos.#1")));
        assert!(!exists(&tree, &p("todos.#2")));
    }
}
