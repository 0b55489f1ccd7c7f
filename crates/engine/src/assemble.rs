//! Payload assembly: from a flat map of caller values to a request-shaped payload.
//!
//! Assembly runs in three passes. Missing inputs of the operation are autofilled from
//! session state, string values are coerced to primitives, and every key is routed to
//! path, query, header or body. Body keys are expanded on `.` into nested objects.

use once_cell::sync::Lazy;
use oaish_types::{AssembledPayload, Assembly, ParameterLocation};
use oaish_util::infer_value;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalog::Catalog;
use crate::state::SessionState;

static POSITIONAL_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").expect("valid positional regex"));
static WHOLE_POSITIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\$(\d+)$").expect("valid positional regex"));
static STATE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$STATE\.([A-Za-z_][A-Za-z0-9_]*)").expect("valid state regex"));

/// Builds payloads for one catalog against one state snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PayloadAssembler<'a> {
    catalog: &'a Catalog,
    state: &'a SessionState,
}

impl<'a> PayloadAssembler<'a> {
    pub fn new(catalog: &'a Catalog, state: &'a SessionState) -> Self {
        Self { catalog, state }
    }

    /// Expands a mapping template.
    ///
    /// Non-string templates are returned unchanged. `$1`, `$2`, ... are replaced by the
    /// matching positional argument and are left as written when out of range. A template
    /// that is exactly one positional placeholder yields that argument verbatim. Then
    /// `$STATE.name` is replaced by the state value's text, or left as written when the
    /// key is absent.
    pub fn resolve_value(&self, template: &Value, args: &[String]) -> Value {
        let Value::String(text) = template else {
            return template.clone();
        };

        if let Some(argument) = WHOLE_POSITIONAL
            .captures(text)
            .and_then(|captures| positional_argument(&captures, args))
        {
            return Value::String(argument.to_string());
        }

        let substituted = POSITIONAL_PLACEHOLDER.replace_all(text, |captures: &Captures<'_>| {
            positional_argument(captures, args).map_or_else(|| captures[0].to_string(), str::to_string)
        });
        let substituted = STATE_PLACEHOLDER.replace_all(&substituted, |captures: &Captures<'_>| match self.state.get(&captures[1]) {
            Some(Value::String(value)) => value.clone(),
            Some(value) => value.to_string(),
            None => captures[0].to_string(),
        });
        Value::String(substituted.into_owned())
    }

    /// Assembles the payload for `operation_id` from caller-supplied `params`.
    ///
    /// An unknown operation yields an empty payload. Names filled from state are
    /// reported in [`Assembly::autofilled`] in the order the operation declares them.
    pub fn assemble(&self, operation_id: &str, params: Map<String, Value>) -> Assembly {
        let Some(operation) = self.catalog.get(operation_id) else {
            debug!(operation_id, "cannot assemble payload for unknown operation");
            return Assembly::default();
        };

        let mut params = params;
        let mut autofilled = Vec::new();
        for input in self.catalog.params_for_operation(operation_id) {
            if params.contains_key(&input.name) {
                continue;
            }
            if let Some(value) = self.state.lookup(&input.name) {
                params.insert(input.name.clone(), value.clone());
                autofilled.push(input.name);
            }
        }

        let placeholders = operation.path_placeholders();
        let mut payload = AssembledPayload::default();
        for (key, value) in params {
            let value = infer_value(value);
            if placeholders.contains(&key.as_str()) {
                payload.path_params.insert(key, value);
                continue;
            }
            match operation.declared(&key).map(|parameter| parameter.location) {
                Some(ParameterLocation::Query) => {
                    payload.query_params.insert(key, value);
                }
                Some(ParameterLocation::Header) => {
                    payload.headers.insert(key, value);
                }
                _ => insert_dotted(&mut payload.body, &key, value),
            }
        }

        if !autofilled.is_empty() {
            debug!(operation_id, autofilled = ?autofilled, "filled parameters from session state");
        }
        Assembly { payload, autofilled }
    }
}

fn positional_argument<'s>(captures: &Captures<'_>, args: &'s [String]) -> Option<&'s str> {
    let index: usize = captures[1].parse().ok()?;
    index.checked_sub(1).and_then(|index| args.get(index)).map(String::as_str)
}

/// Writes `value` at the dotted `key`, creating (or replacing non-object) intermediates.
fn insert_dotted(body: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = body;
    for segment in segments {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(next) => next,
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}
