//! Configured shorthand commands.
//!
//! A command binds an invocation name to one operation and maps positional arguments
//! and state values onto its parameters through templates (`$1`, `$STATE.token`).
//! After a successful call it can copy response fields into state.

use oaish_types::CommandConfig;
use oaish_util::{resolve_data, validate_path};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::assemble::PayloadAssembler;
use crate::catalog::Catalog;

/// Prefix of `save_to_state` sources that read from the JSON response body.
pub const JSON_SOURCE_PREFIX: &str = "json:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseFieldError {
    #[error("operation '{0}' is not in the catalog")]
    UnknownOperation(String),
    #[error("default_response_field '{field}' does not match the 200 response schema of '{operation_id}'")]
    InvalidField { operation_id: String, field: String },
}

/// Flat parameters for a command call.
///
/// Mapping templates are resolved against `positional` and state first; explicit
/// `flags` then override any mapped value of the same name.
pub fn command_params(
    assembler: &PayloadAssembler<'_>,
    command: &CommandConfig,
    positional: &[String],
    flags: Map<String, Value>,
) -> Map<String, Value> {
    let mut params: Map<String, Value> = command
        .mapping
        .iter()
        .map(|(name, template)| (name.clone(), assembler.resolve_value(&Value::String(template.clone()), positional)))
        .collect();
    params.extend(flags);
    params
}

/// Splits `--name value` pairs from positional arguments.
///
/// A flag followed by another flag (or by nothing) is a boolean `true`.
pub fn parse_flag_args(args: &[String]) -> (Map<String, Value>, Vec<String>) {
    let mut flags = Map::new();
    let mut positional = Vec::new();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(name) = arg.strip_prefix("--").filter(|name| !name.is_empty()) else {
            positional.push(arg.clone());
            continue;
        };
        if let Some((name, value)) = name.split_once('=') {
            flags.insert(name.to_string(), Value::String(value.to_string()));
            continue;
        }
        match iter.next_if(|next| !next.starts_with("--")) {
            Some(value) => flags.insert(name.to_string(), Value::String(value.clone())),
            None => flags.insert(name.to_string(), Value::Bool(true)),
        };
    }
    (flags, positional)
}

/// Values `after_call.save_to_state` extracts from `response`.
///
/// Sources without the `json:` prefix and paths that do not resolve are skipped.
pub fn after_call_updates(command: &CommandConfig, response: &Value) -> Vec<(String, Value)> {
    let Some(after_call) = &command.after_call else {
        return Vec::new();
    };
    after_call
        .save_to_state
        .iter()
        .filter_map(|(key, source)| {
            let Some(path) = source.strip_prefix(JSON_SOURCE_PREFIX) else {
                debug!(key = %key, source = %source, "unsupported save_to_state source");
                return None;
            };
            match resolve_data(response, path.trim()) {
                Some(value) => Some((key.clone(), value.clone())),
                None => {
                    debug!(key = %key, path, "save_to_state path not found in response");
                    None
                }
            }
        })
        .collect()
}

/// Checks `default_response_field` against the operation's `200` response schema.
///
/// Passes when no field is set, when `force_response_field` is on, or when the
/// operation documents no `200` schema to check against.
pub fn check_response_field(catalog: &Catalog, command: &CommandConfig) -> Result<(), ResponseFieldError> {
    let Some(field) = &command.default_response_field else {
        return Ok(());
    };
    if command.force_response_field {
        return Ok(());
    }
    let operation = catalog
        .get(&command.operation_id)
        .ok_or_else(|| ResponseFieldError::UnknownOperation(command.operation_id.clone()))?;
    let Some(schema) = operation.response_schema("200") else {
        return Ok(());
    };
    if validate_path(schema, field, &catalog.resolver()) {
        Ok(())
    } else {
        Err(ResponseFieldError::InvalidField {
            operation_id: command.operation_id.clone(),
            field: field.clone(),
        })
    }
}

/// The part of `response` a command displays: its `default_response_field` when set
/// and present, otherwise the whole response.
pub fn select_response<'a>(command: Option<&CommandConfig>, response: &'a Value) -> &'a Value {
    command
        .and_then(|command| command.default_response_field.as_deref())
        .and_then(|field| resolve_data(response, field))
        .unwrap_or(response)
}
