//! Dot-notation access and shape checks over JSON containers.
//!
//! Objects and arrays are both "containers". Numeric path segments index into
//! arrays; every other segment is an object key.

use serde_json::{Map, Value};

/// True for a non-empty array, or a non-empty object keyed `"0".."n-1"` in order.
pub fn is_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => {
            !map.is_empty()
                && map
                    .keys()
                    .enumerate()
                    .all(|(index, key)| *key == index.to_string())
        }
        _ => false,
    }
}

/// Loose truthiness: `null`, `false`, zero, `""`, `"0"` and empty containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// True for containers that are not collections, including empty ones.
pub fn is_assoc(value: &Value) -> bool {
    (value.is_object() || value.is_array()) && !is_collection(value)
}

/// Set a value using a dot-notation key, creating intermediate objects.
///
/// A `None` key replaces `target` entirely. Intermediate segments that are
/// missing or hold a scalar are replaced with an empty object. On arrays a
/// numeric segment up to the length indexes (or appends); any other segment
/// rekeys the array as `"0".."n-1"` and adds the key alongside.
pub fn set(target: &mut Value, key: Option<&str>, value: Value) {
    let Some(key) = key else {
        *target = value;
        return;
    };

    let mut segments: Vec<&str> = key.split('.').collect();
    let last = segments.pop().unwrap_or_default();

    let mut current = target;
    for segment in segments {
        let child = child_mut(current, segment);
        if !child.is_object() && !child.is_array() {
            *child = Value::Object(Map::new());
        }
        current = child;
    }

    *child_mut(current, last) = value;
}

fn child_mut<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    // Arrays grow by at most one slot; any other key turns them into objects.
    let index = match (&*current, segment.parse::<usize>()) {
        (Value::Array(items), Ok(index)) if index <= items.len() => Some(index),
        _ => None,
    };

    if index.is_none() {
        if let Value::Array(items) = &mut *current {
            let items = std::mem::take(items);
            *current = keyed_by_position(items);
        }
    }

    match (current, index) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(Value::Null);
            }
            &mut items[index]
        }
        (current, _) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            &mut current[segment]
        }
    }
}

/// `[a, b]` → `{"0": a, "1": b}`.
fn keyed_by_position(items: Vec<Value>) -> Value {
    Value::Object(
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
    )
}

/// Read a value using a dot-notation key. Missing paths and explicit nulls
/// both come back as `None`.
pub fn get_dot<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|found| !found.is_null())
}

/// Flatten nested containers into a `"a.b.c" => leaf` map.
///
/// Empty containers contribute nothing; a scalar input yields an empty map.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    let mut path = Vec::new();
    flatten_into(value, &mut path, &mut flat);
    flat
}

fn flatten_into(value: &Value, path: &mut Vec<String>, flat: &mut Map<String, Value>) {
    let entries: Vec<(String, &Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return,
    };

    for (key, child) in entries {
        path.push(key);
        if child.is_object() || child.is_array() {
            flatten_into(child, path, flat);
        } else {
            flat.insert(path.join("."), child.clone());
        }
        path.pop();
    }
}

/// Recursively turn `{"foo": {"name": "foo", ..}, ..}` maps into lists.
///
/// A child container is converted when its first entry carries a `name`
/// equal to that entry's key; otherwise it is fixed recursively.
pub fn fix_collections(data: Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| (key, fix_child(child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(fix_child).collect()),
        scalar => scalar,
    }
}

fn fix_child(child: Value) -> Value {
    if !child.is_object() && !child.is_array() {
        return child;
    }
    if first_is_named_after_key(&child) {
        return match child {
            Value::Object(map) => Value::Array(map.into_iter().map(|(_, v)| v).collect()),
            list => list,
        };
    }
    fix_collections(child)
}

fn first_is_named_after_key(container: &Value) -> bool {
    let first = match container {
        Value::Object(map) => map.iter().next().map(|(k, v)| (k.clone(), v)),
        Value::Array(items) => items.first().map(|v| ("0".to_string(), v)),
        _ => None,
    };
    let Some((key, entry)) = first else {
        return false;
    };
    match entry.get("name") {
        Some(Value::String(name)) => *name == key,
        Some(Value::Number(name)) => name.to_string() == key,
        _ => false,
    }
}

/// Remove the first element equal to `needle`. Returns whether anything was removed.
pub fn remove_by_value(target: &mut Value, needle: &Value) -> bool {
    match target {
        Value::Array(items) => match items.iter().position(|item| item == needle) {
            Some(index) => {
                items.remove(index);
                true
            }
            None => false,
        },
        Value::Object(map) => {
            let Some(key) = map
                .iter()
                .find(|(_, item)| *item == needle)
                .map(|(k, _)| k.clone())
            else {
                return false;
            };
            *map = std::mem::take(map)
                .into_iter()
                .filter(|(k, _)| *k != key)
                .collect();
            true
        }
        _ => false,
    }
}
