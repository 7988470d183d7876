//! The message passed between callers and resolvers.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A typed message: `{"type": "FETCH_RESOURCES", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// The payload handed to type-filtered and method resolvers.
    /// Absent (or `null`) payloads become an empty object.
    pub fn payload_or_default(&self) -> Cow<'_, Value> {
        match &self.payload {
            Some(payload) if !payload.is_null() => Cow::Borrowed(payload),
            _ => Cow::Owned(Value::Object(Map::new())),
        }
    }
}
