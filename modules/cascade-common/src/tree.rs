//! Tree flatten/unflatten over JSON nodes.
//!
//! A nested tree is an object whose children live under `keys.children`.
//! The flat form is a list of nodes keyed by `keys.id`, each carrying a
//! `keys.parent` back-reference and the ids of its direct children.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::array::{is_collection, is_truthy};
use crate::config::TreeKeys;
use crate::error::{CommonError, CommonResult};

/// Flatten a nested tree into a list of nodes, root first.
///
/// Nodes without an id get a generated one. Traversal is stack-driven, so
/// deep trees do not recurse.
pub fn normalize(nested: &Value, keys: &TreeKeys) -> Vec<Value> {
    let mut stack = vec![nested.clone()];
    let mut list = Vec::new();

    while let Some(node) = stack.pop() {
        if let Value::Object(node) = node {
            list.push(Value::Object(normalize_node(&mut stack, node, keys)));
        }
    }

    list
}

fn normalize_node(
    stack: &mut Vec<Value>,
    mut node: Map<String, Value>,
    keys: &TreeKeys,
) -> Map<String, Value> {
    ensure_id(&mut node, keys);
    let id = node.get(&keys.id).cloned().unwrap_or(Value::Null);
    let parent = node.get(&keys.parent).cloned().unwrap_or(Value::Null);
    let children = node.get(&keys.children).cloned();

    let mut data: Map<String, Value> = node
        .into_iter()
        .filter(|(key, _)| *key != keys.children)
        .collect();
    data.insert(keys.parent.clone(), parent);

    let mut child_ids = Vec::new();
    let mut pending = Vec::new();
    if let Some(children) = children.filter(is_collection) {
        for child in into_items(children) {
            let Value::Object(mut child) = child else {
                continue;
            };
            ensure_id(&mut child, keys);
            child.insert(keys.parent.clone(), id.clone());
            child_ids.push(child.get(&keys.id).cloned().unwrap_or(Value::Null));
            pending.push(Value::Object(child));
        }
    }

    // Reversed so the first child is popped next.
    stack.extend(pending.into_iter().rev());
    data.insert(keys.children.clone(), Value::Array(child_ids));
    data
}

fn ensure_id(node: &mut Map<String, Value>, keys: &TreeKeys) {
    if node.get(&keys.id).map_or(true, Value::is_null) {
        node.insert(keys.id.clone(), Value::String(generate_id()));
    }
}

fn into_items(container: Value) -> Vec<Value> {
    match container {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => Vec::new(),
    }
}

/// Rebuild a nested tree from a flat node list.
///
/// Without an explicit `root` id, the first node with no parent is used.
/// Children are resolved through their parent reference, and the parent key
/// is dropped from every rebuilt node.
pub fn denormalize(flat: &[Value], keys: &TreeKeys, root: Option<&Value>) -> CommonResult<Value> {
    let mut path = Vec::new();
    denormalize_from(flat, keys, root, &mut path)
}

fn denormalize_from(
    flat: &[Value],
    keys: &TreeKeys,
    root: Option<&Value>,
    path: &mut Vec<Value>,
) -> CommonResult<Value> {
    let tree = match root {
        Some(id) => find_node(flat, id, &keys.id),
        None => find_root(flat, &keys.parent),
    };
    let Some(Value::Object(tree)) = tree else {
        return Err(CommonError::NodeNotFound {
            key: keys.id.clone(),
            id: root.map_or_else(|| "<root>".to_string(), Value::to_string),
        });
    };

    let id = tree.get(&keys.id).cloned().unwrap_or(Value::Null);
    path.push(id.clone());

    let child_ids: Vec<Value> = find_children(flat, &id, &keys.parent)
        .into_iter()
        .filter_map(|child| child.get(&keys.id).cloned())
        .filter(|child_id| !path.iter().any(|seen| loose_eq(seen, child_id)))
        .collect();

    let mut children = Vec::with_capacity(child_ids.len());
    for child_id in &child_ids {
        children.push(denormalize_from(flat, keys, Some(child_id), path)?);
    }
    path.pop();

    let mut rebuilt: Map<String, Value> = tree
        .iter()
        .filter(|(key, _)| **key != keys.parent)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    rebuilt.insert(keys.children.clone(), Value::Array(children));
    Ok(Value::Object(rebuilt))
}

/// First node whose `id_key` matches `id`.
pub fn find_node<'a>(nodes: &'a [Value], id: &Value, id_key: &str) -> Option<&'a Value> {
    nodes.iter().find(|node| loose_eq(field(node, id_key), id))
}

/// First node without a parent.
pub fn find_root<'a>(nodes: &'a [Value], parent_key: &str) -> Option<&'a Value> {
    nodes.iter().find(|node| field(node, parent_key).is_null())
}

/// Direct children of the node with the given id.
pub fn find_children<'a>(nodes: &'a [Value], id: &Value, parent_key: &str) -> Vec<&'a Value> {
    nodes
        .iter()
        .filter(|node| loose_eq(field(node, parent_key), id))
        .collect()
}

/// All descendants: direct children first, then each child's descendants in turn.
pub fn find_all_children<'a>(nodes: &'a [Value], id: &Value, keys: &TreeKeys) -> Vec<&'a Value> {
    let mut seen = vec![id.clone()];
    collect_descendants(nodes, id, keys, &mut seen)
}

fn collect_descendants<'a>(
    nodes: &'a [Value],
    id: &Value,
    keys: &TreeKeys,
    seen: &mut Vec<Value>,
) -> Vec<&'a Value> {
    let children = find_children(nodes, id, &keys.parent);
    let mut all = children.clone();

    for child in children {
        let child_id = field(child, &keys.id);
        if seen.iter().any(|s| loose_eq(s, child_id)) {
            continue;
        }
        seen.push(child_id.clone());
        all.extend(collect_descendants(nodes, child_id, keys, seen));
    }

    all
}

/// Ancestors of a node, root first, optionally ending with the node itself.
pub fn find_parents<'a>(
    nodes: &'a [Value],
    id: &Value,
    include_node: bool,
    keys: &TreeKeys,
) -> Vec<&'a Value> {
    let mut chain: Vec<&'a Value> = Vec::new();
    let mut cursor = find_node(nodes, id, &keys.id);

    while let Some(node) = cursor {
        if chain.iter().any(|seen| std::ptr::eq(*seen, node)) {
            break;
        }
        chain.push(node);
        let parent = field(node, &keys.parent);
        cursor = if is_truthy(parent) {
            find_node(nodes, parent, &keys.id)
        } else {
            None
        };
    }

    if !include_node && !chain.is_empty() {
        chain.remove(0);
    }
    chain.reverse();
    chain
}

/// Nodes that carry every `where` key with a strictly equal value.
pub fn filter<'a>(nodes: &'a [Value], conditions: &Map<String, Value>) -> Vec<&'a Value> {
    nodes
        .iter()
        .filter(|node| {
            conditions
                .iter()
                .all(|(key, expected)| node.get(key) == Some(expected))
        })
        .collect()
}

/// The truthy reference values of all nodes that have one.
pub fn find_references<'a>(nodes: &'a [Value], reference_key: &str) -> Vec<&'a Value> {
    nodes
        .iter()
        .map(|node| field(node, reference_key))
        .filter(|reference| is_truthy(reference))
        .collect()
}

/// Swap every node that has a reference for the reference itself.
pub fn replace_with_references(nodes: &[Value], reference_key: &str) -> Vec<Value> {
    nodes
        .iter()
        .map(|node| {
            let reference = field(node, reference_key);
            if is_truthy(reference) {
                reference.clone()
            } else {
                node.clone()
            }
        })
        .collect()
}

/// The nodes followed by all of their references.
pub fn merge_references(nodes: &[Value], reference_key: &str) -> Vec<Value> {
    let references: Vec<Value> = find_references(nodes, reference_key)
        .into_iter()
        .cloned()
        .collect();
    nodes.iter().cloned().chain(references).collect()
}

/// Distinct values of `key` across nodes, first occurrence wins, minus `except`.
pub fn unique(nodes: &[Value], key: &str, except: &[Value]) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::new();
    for node in nodes {
        let value = field(node, key);
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
    values.retain(|value| !except.contains(value));
    values
}

/// Random node id: a lowercase letter followed by 31 hex digits.
pub fn generate_id() -> String {
    let uuid = Uuid::new_v4();
    let lead = char::from(b'a' + uuid.as_bytes()[0] % 26);
    let hex = uuid.simple().to_string();
    format!("{lead}{}", &hex[1..])
}

fn field<'a>(node: &'a Value, key: &str) -> &'a Value {
    node.get(key).unwrap_or(&Value::Null)
}

/// Id comparison that treats `1` and `"1"` as the same id.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            n.to_string() == *s
        }
        _ => a == b,
    }
}
