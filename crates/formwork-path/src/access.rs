#![forbid(unsafe_code)]

//! Reading and writing values by [`FieldPath`].
//!
//! # Invariants
//!
//! 1. [`get_by_path`] never panics: a missing or mistyped step yields `None`.
//! 2. [`set_by_path`] never mutates its input. Every container on the path
//!    from the root to the target is shallow-copied; everything else is
//!    shared with the input.
//! 3. `get_by_path(&set_by_path(root, p, |_| v), p) == Some(&v)` for every
//!    root and every path.
//!
//! # Writing through missing or mistyped containers
//!
//! | Parent | Segment | Result |
//! |--------|---------|--------|
//! | object | key or index | copy of the object, index used as decimal key |
//! | array | index inside it or up to [`MAX_PADDED_INDEX`] | copy, padded with `Null` if short |
//! | array | key, or index past length and bound | object with items under `"0"`, `"1"`, ... |
//! | missing or scalar | index up to [`MAX_PADDED_INDEX`] | fresh array padded with `Null` |
//! | missing or scalar | key, or index past the bound | fresh object |
//!
//! Indices past the bound are written under their decimal key.
//! [`get_by_path`] reads an index on an object through the same key, so
//! such writes still read back.

use std::borrow::Cow;
use std::sync::Arc;

use crate::path::{FieldPath, Segment};
use crate::value::{Map, Value};

/// Largest index that [`set_by_path`] will pad an array out to.
pub const MAX_PADDED_INDEX: usize = 65_535;

/// Read the value at `path`, or `None` if any step is missing.
///
/// # Examples
///
/// ```
/// use formwork_path::{FieldPath, Value, get_by_path};
///
/// let root = Value::from(serde_json::json!({"items": [{"qty": 3}]}));
/// let qty = get_by_path(&root, &FieldPath::parse("items[0].qty"));
/// assert_eq!(qty.and_then(Value::as_i64), Some(3));
/// assert!(get_by_path(&root, &FieldPath::parse("items[5].qty")).is_none());
/// ```
#[must_use]
pub fn get_by_path<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match (node, segment) {
            (Value::Object(map), segment) => map.get(&*object_key(segment)),
            (Value::Array(items), Segment::Index(i)) => items.get(*i),
            _ => None,
        })
}

/// Return a copy of `root` whose value at `path` is `updater(current)`.
///
/// `current` is `None` when nothing exists at `path` yet.
///
/// # Examples
///
/// ```
/// use formwork_path::{FieldPath, Value, get_by_path, set_by_path};
///
/// let root = Value::from(serde_json::json!({"name": "", "tags": []}));
/// let next = set_by_path(&root, &FieldPath::parse("tags[1]"), |_| Value::from("b"));
///
/// assert_eq!(next, Value::from(serde_json::json!({"name": "", "tags": [null, "b"]})));
/// // The input is untouched.
/// assert_eq!(get_by_path(&root, &FieldPath::parse("tags[1]")), None);
/// ```
#[must_use]
pub fn set_by_path<F>(root: &Value, path: &FieldPath, updater: F) -> Value
where
    F: FnOnce(Option<&Value>) -> Value,
{
    write_at(Some(root), path.segments(), updater)
}

fn write_at<F>(node: Option<&Value>, segments: &[Segment], updater: F) -> Value
where
    F: FnOnce(Option<&Value>) -> Value,
{
    let Some((head, rest)) = segments.split_first() else {
        return updater(node);
    };

    match (node, head) {
        (Some(Value::Object(map)), segment) => {
            let key = object_key(segment);
            let child = write_at(map.get(&*key), rest, updater);
            let mut next: Map = (**map).clone();
            next.insert(key.into_owned(), child);
            Value::Object(Arc::new(next))
        }
        (Some(Value::Array(items)), Segment::Index(i)) if *i < items.len() => {
            let child = write_at(items.get(*i), rest, updater);
            let mut next: Vec<Value> = (**items).clone();
            next[*i] = child;
            Value::Array(Arc::new(next))
        }
        (Some(Value::Array(items)), Segment::Index(i)) if *i <= MAX_PADDED_INDEX => {
            let child = write_at(None, rest, updater);
            let mut next: Vec<Value> = (**items).clone();
            next.resize(*i, Value::Null);
            next.push(child);
            Value::Array(Arc::new(next))
        }
        (Some(Value::Array(items)), segment) => {
            let key = object_key(segment);
            let mut next: Map = items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item.clone()))
                .collect();
            let child = write_at(next.get(&*key), rest, updater);
            next.insert(key.into_owned(), child);
            Value::Object(Arc::new(next))
        }
        (_, Segment::Index(i)) if *i <= MAX_PADDED_INDEX => {
            let child = write_at(None, rest, updater);
            let mut next = vec![Value::Null; *i];
            next.push(child);
            Value::Array(Arc::new(next))
        }
        (_, segment) => {
            let child = write_at(None, rest, updater);
            let mut next = Map::new();
            next.insert(object_key(segment).into_owned(), child);
            Value::Object(Arc::new(next))
        }
    }
}

fn object_key(segment: &Segment) -> Cow<'_, str> {
    match segment {
        Segment::Key(key) => Cow::Borrowed(key),
        Segment::Index(i) => Cow::Owned(i.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn p(text: &str) -> FieldPath {
        FieldPath::parse(text)
    }

    #[test]
    fn get_nested_object_and_array() {
        let root = v(json!({"a": {"b": [10, {"c": "deep"}]}}));
        assert_eq!(get_by_path(&root, &p("a.b[0]")), Some(&Value::from(10)));
        assert_eq!(
            get_by_path(&root, &p("a.b.1.c")).and_then(Value::as_str),
            Some("deep")
        );
    }

    #[test]
    fn get_root_path_returns_root() {
        let root = v(json!({"a": 1}));
        assert_eq!(get_by_path(&root, &FieldPath::root()), Some(&root));
    }

    #[test]
    fn get_missing_is_none() {
        let root = v(json!({"a": {"b": 1}}));
        assert_eq!(get_by_path(&root, &p("a.x")), None);
        assert_eq!(get_by_path(&root, &p("x.y.z")), None);
        assert_eq!(get_by_path(&root, &p("a.b.c")), None, "through scalar");
        assert_eq!(get_by_path(&v(json!([1])), &p("[3]")), None);
    }

    #[test]
    fn get_null_leaf_is_present() {
        let root = v(json!({"a": null}));
        assert_eq!(get_by_path(&root, &p("a")), Some(&Value::Null));
        assert_eq!(get_by_path(&root, &p("a.b")), None);
    }

    #[test]
    fn get_index_on_object_uses_decimal_key() {
        let root = v(json!({"0": "zero"}));
        assert_eq!(
            get_by_path(&root, &p("0")).and_then(Value::as_str),
            Some("zero")
        );
    }

    #[test]
    fn get_key_on_array_is_none() {
        let root = v(json!({"list": [1, 2]}));
        assert_eq!(get_by_path(&root, &FieldPath::root().key("list").key("len")), None);
    }

    #[test]
    fn set_replaces_leaf() {
        let root = v(json!({"first": "", "age": 0}));
        let next = set_by_path(&root, &p("age"), |_| Value::from(30));
        assert_eq!(next, v(json!({"first": "", "age": 30})));
        assert_eq!(root, v(json!({"first": "", "age": 0})));
    }

    #[test]
    fn set_passes_current_value_to_updater() {
        let root = v(json!({"count": 41}));
        let next = set_by_path(&root, &p("count"), |cur| {
            Value::from(cur.and_then(Value::as_i64).unwrap_or(0) + 1)
        });
        assert_eq!(get_by_path(&next, &p("count")), Some(&Value::from(42)));
    }

    #[test]
    fn set_missing_path_sees_none() {
        let root = Value::object();
        let mut seen = Some(Value::Null);
        let _ = set_by_path(&root, &p("a.b"), |cur| {
            seen = cur.cloned();
            Value::from(1)
        });
        assert_eq!(seen, None);
    }

    #[test]
    fn set_creates_objects_and_arrays() {
        let next = set_by_path(&Value::object(), &p("a.list[2].name"), |_| Value::from("x"));
        assert_eq!(next, v(json!({"a": {"list": [null, null, {"name": "x"}]}})));
    }

    #[test]
    fn set_root_path_replaces_whole_value() {
        let next = set_by_path(&v(json!({"a": 1})), &FieldPath::root(), |_| Value::from(7));
        assert_eq!(next, Value::from(7));
    }

    #[test]
    fn set_index_on_object_writes_decimal_key() {
        let root = v(json!({"keep": true}));
        let next = set_by_path(&root, &p("3"), |_| Value::from("c"));
        assert_eq!(next, v(json!({"keep": true, "3": "c"})));
    }

    #[test]
    fn set_index_pads_short_array() {
        let root = v(json!({"xs": [1]}));
        let next = set_by_path(&root, &p("xs[3]"), |_| Value::from(4));
        assert_eq!(next, v(json!({"xs": [1, null, null, 4]})));
    }

    #[test]
    fn set_index_at_bound_pads() {
        let path = FieldPath::root().index(MAX_PADDED_INDEX);
        let next = set_by_path(&Value::Null, &path, |_| Value::from(1));
        assert_eq!(next.as_array().map(<[Value]>::len), Some(MAX_PADDED_INDEX + 1));
        assert_eq!(get_by_path(&next, &path), Some(&Value::from(1)));
    }

    #[test]
    fn set_max_index_on_array_writes_decimal_key() {
        let root = v(json!({"items": [1]}));
        let path = FieldPath::root().key("items").index(usize::MAX);
        let next = set_by_path(&root, &path, |cur| {
            assert_eq!(cur, None);
            Value::from("far")
        });
        let far = usize::MAX.to_string();
        assert_eq!(next, v(json!({"items": {"0": 1, far: "far"}})));
        assert_eq!(get_by_path(&next, &path), Some(&Value::from("far")));
    }

    #[test]
    fn set_max_index_on_missing_creates_object() {
        let path = FieldPath::root().index(usize::MAX).key("x");
        let next = set_by_path(&Value::object(), &path, |_| Value::from(true));
        assert_eq!(get_by_path(&next, &path), Some(&Value::from(true)));
        assert!(next.get(&usize::MAX.to_string()).is_some());
    }

    #[test]
    fn set_large_parsed_index_stays_small() {
        let path = p("rows[4294967295]");
        let next = set_by_path(&v(json!({"rows": []})), &path, |_| Value::from(0));
        assert_eq!(next, v(json!({"rows": {"4294967295": 0}})));
        assert_eq!(get_by_path(&next, &path), Some(&Value::from(0)));
    }

    #[test]
    fn set_existing_index_past_bound_stays_array() {
        let items = vec![Value::Null; MAX_PADDED_INDEX + 2];
        let root = Value::from(items);
        let path = FieldPath::root().index(MAX_PADDED_INDEX + 1);
        let next = set_by_path(&root, &path, |_| Value::from(5));
        assert!(next.as_array().is_some());
        assert_eq!(get_by_path(&next, &path), Some(&Value::from(5)));
    }

    #[test]
    fn set_key_on_array_converts_to_object() {
        let root = v(json!({"xs": ["a", "b"]}));
        let next = set_by_path(&root, &FieldPath::root().key("xs").key("extra"), |_| {
            Value::from(true)
        });
        assert_eq!(next, v(json!({"xs": {"0": "a", "1": "b", "extra": true}})));
    }

    #[test]
    fn set_through_scalar_creates_container() {
        let root = v(json!({"a": 5}));
        let next = set_by_path(&root, &p("a.b"), |_| Value::from(1));
        assert_eq!(next, v(json!({"a": {"b": 1}})));
        let next = set_by_path(&root, &p("a[1]"), |_| Value::from(1));
        assert_eq!(next, v(json!({"a": [null, 1]})));
    }

    #[test]
    fn set_shares_untouched_siblings() {
        let root = v(json!({
            "left": {"deep": [1, 2, 3]},
            "right": {"target": {"x": 1}, "sibling": {"y": 2}}
        }));
        let next = set_by_path(&root, &p("right.target.x"), |_| Value::from(9));

        assert!(!next.ptr_eq(&root));
        assert!(next.get("left").expect("left").ptr_eq(root.get("left").expect("left")));

        let old_right = root.get("right").expect("right");
        let new_right = next.get("right").expect("right");
        assert!(!new_right.ptr_eq(old_right), "ancestor is copied");
        assert!(
            new_right
                .get("sibling")
                .expect("sibling")
                .ptr_eq(old_right.get("sibling").expect("sibling"))
        );
        assert_eq!(get_by_path(&root, &p("right.target.x")), Some(&Value::from(1)));
    }

    #[test]
    fn set_shares_array_siblings() {
        let root = v(json!([{"a": 1}, {"b": 2}, {"c": 3}]));
        let next = set_by_path(&root, &p("[1].b"), |_| Value::from(20));
        let (old, new) = (root.as_array().expect("array"), next.as_array().expect("array"));
        assert!(new[0].ptr_eq(&old[0]));
        assert!(!new[1].ptr_eq(&old[1]));
        assert!(new[2].ptr_eq(&old[2]));
    }
}
