//! Core traits for the dispatch engine.

use serde_json::{Map, Value};

/// The value threaded through every resolver.
///
/// The engine only ever replaces state wholesale. A resolver's return value
/// is adopted when it is truthy and differs from the state that resolver was
/// handed; falsy returns (`null`, empty containers, ...) mean "no change".
pub trait State: Clone + PartialEq {
    /// The state a fresh engine starts with.
    fn empty() -> Self;

    /// Whether a returned value counts as a replacement at all.
    fn is_truthy(&self) -> bool;
}

impl State for Value {
    fn empty() -> Self {
        Value::Object(Map::new())
    }

    fn is_truthy(&self) -> bool {
        cascade_common::array::is_truthy(self)
    }
}

impl State for Map<String, Value> {
    fn empty() -> Self {
        Map::new()
    }

    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}
