//! Request-scoped payloads produced by the assembler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller values grouped by where they travel in the outbound request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssembledPayload {
    pub path_params: Map<String, Value>,
    pub query_params: Map<String, Value>,
    pub headers: Map<String, Value>,
    /// Nested JSON object built from dotted keys.
    pub body: Map<String, Value>,
}

impl AssembledPayload {
    pub fn is_empty(&self) -> bool {
        self.path_params.is_empty() && self.query_params.is_empty() && self.headers.is_empty() && self.body.is_empty()
    }

    /// The body as a JSON value, or `None` when nothing was routed to it.
    pub fn body_value(&self) -> Option<Value> {
        (!self.body.is_empty()).then(|| Value::Object(self.body.clone()))
    }
}

/// Result of assembling one call: the payload plus the names filled from session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub payload: AssembledPayload,
    pub autofilled: Vec<String>,
}
