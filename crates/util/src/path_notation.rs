//! Dotted and bracketed addressing into JSON data and JSON schemas.
//!
//! A path such as `items[0].name` tokenizes into a field, an index and a field.
//! The same tokens drive both data lookups ([`resolve_data`]) and schema checks
//! ([`validate_path`]), so a path that validates against a response schema addresses
//! the same place in a response body.

use std::fmt;

use serde_json::{Map, Value};

use crate::schema::{SchemaResolver, schema_type};

/// One step of a dotted/bracketed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    /// Object key (`name` in `user.name`).
    Field(String),
    /// Sequence index (`0` in `items[0]`).
    Index(usize),
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Splits a path on `.` and bracketed indices.
///
/// Empty segments are dropped (`a..b` equals `a.b`). Bracket contents that are not
/// integers are kept as field names, and an unterminated bracket is read as part of
/// the field text.
///
/// ```rust
/// use oaish_util::{PathToken, tokenize};
///
/// assert_eq!(
///     tokenize("items[0].name"),
///     vec![PathToken::Field("items".into()), PathToken::Index(0), PathToken::Field("name".into())]
/// );
/// ```
pub fn tokenize(path: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();
    let mut field = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => flush_field(&mut field, &mut tokens),
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    field.push('[');
                    field.push_str(&inner);
                    continue;
                }
                flush_field(&mut field, &mut tokens);
                match inner.trim().parse::<usize>() {
                    Ok(index) => tokens.push(PathToken::Index(index)),
                    Err(_) if !inner.is_empty() => tokens.push(PathToken::Field(inner)),
                    Err(_) => {}
                }
            }
            other => field.push(other),
        }
    }
    flush_field(&mut field, &mut tokens);
    tokens
}

fn flush_field(field: &mut String, tokens: &mut Vec<PathToken>) {
    if !field.is_empty() {
        tokens.push(PathToken::Field(std::mem::take(field)));
    }
}

/// Reads the value at `path`, or `None` when any step is missing or mistyped.
///
/// An empty path returns `value` itself.
pub fn resolve_data<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    resolve_tokens(value, &tokenize(path))
}

/// Walks already tokenized `tokens` into `value`. See [`resolve_data`].
pub fn resolve_tokens<'a>(value: &'a Value, tokens: &[PathToken]) -> Option<&'a Value> {
    tokens.iter().try_fold(value, |current, token| match (token, current) {
        (PathToken::Field(name), Value::Object(map)) => map.get(name),
        (PathToken::Index(index), Value::Array(items)) => items.get(*index),
        _ => None,
    })
}

/// Checks that `path` exists in `schema`.
///
/// Field tokens must name a declared property of the current node and index tokens
/// must land on an `array` node, descending into its `items`. Every node is passed
/// through `resolver` first, so `$ref`-based schemas validate the same as inline ones.
pub fn validate_path(schema: &Value, path: &str, resolver: &SchemaResolver<'_>) -> bool {
    let mut current = resolver.resolve(schema);
    for token in tokenize(path) {
        let next = match token {
            PathToken::Field(name) => match current.get("properties").and_then(|properties| properties.get(&name)) {
                Some(property) => property.clone(),
                None => return false,
            },
            PathToken::Index(_) => {
                if schema_type(&current).as_deref() != Some("array") {
                    return false;
                }
                current.get("items").cloned().unwrap_or_else(|| Value::Object(Map::new()))
            }
        };
        current = resolver.resolve(&next);
    }
    true
}
