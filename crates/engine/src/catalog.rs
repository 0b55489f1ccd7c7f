//! Operation catalog built from an OpenAPI document.
//!
//! The catalog indexes every operation that carries an `operationId`, computes the
//! slash-aligned path prefix shared by all paths, and keeps the raw document around so
//! `$ref` pointers can be resolved later by the flattener and response validation.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use oaish_types::{DeclaredParameter, OperationRecord, ParameterLocation};
use oaish_util::{SchemaResolver, schema_type};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Methods indexed from each path item, in the order they are visited.
pub const SUPPORTED_METHODS: [&str; 5] = ["get", "post", "put", "delete", "patch"];

/// Parsed API description with its operations indexed by `operationId`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    document: Value,
    common_prefix: String,
    operations: IndexMap<String, OperationRecord>,
}

impl Catalog {
    /// Indexes all operations in `document`.
    ///
    /// Never fails: a document without `paths` yields an empty catalog, operations
    /// without an `operationId` are skipped, and a repeated `operationId` keeps the
    /// operation seen last.
    pub fn from_document(document: Value) -> Self {
        let paths = document.get("paths").and_then(Value::as_object).cloned().unwrap_or_default();
        let common_prefix = common_path_prefix(paths.keys().map(String::as_str));
        let resolver = SchemaResolver::new(&document);

        let mut operations: IndexMap<String, OperationRecord> = IndexMap::new();
        for (path, path_item) in &paths {
            let path_item = resolver.resolve(path_item);
            for method in SUPPORTED_METHODS {
                let Some(operation) = path_item.get(method).filter(|value| value.is_object()) else {
                    continue;
                };
                let Some(operation_id) = operation.get("operationId").and_then(Value::as_str) else {
                    debug!(method, path = %path, "skipping operation without operationId");
                    continue;
                };

                let record = build_record(&resolver, &common_prefix, path, &path_item, method, operation_id, operation);
                if let Some(previous) = operations.insert(operation_id.to_string(), record) {
                    warn!(
                        operation_id,
                        previous = %format!("{} {}", previous.method, previous.path),
                        current = %format!("{} {}", method.to_ascii_uppercase(), path),
                        "duplicate operationId; keeping the later definition"
                    );
                }
            }
        }

        debug!(count = operations.len(), prefix = %common_prefix, "indexed operations");
        Self {
            document,
            common_prefix,
            operations,
        }
    }

    /// Parses JSON or YAML text and indexes it.
    pub fn from_text(text: &str) -> Result<Self> {
        parse_document(text).map(Self::from_document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Resolver bound to this catalog's document.
    pub fn resolver(&self) -> SchemaResolver<'_> {
        SchemaResolver::new(&self.document)
    }

    /// Slash-aligned prefix shared by every path; empty when nothing meaningful is shared.
    pub fn common_prefix(&self) -> &str {
        &self.common_prefix
    }

    pub fn get(&self, operation_id: &str) -> Option<&OperationRecord> {
        self.operations.get(operation_id)
    }

    pub fn contains(&self, operation_id: &str) -> bool {
        self.operations.contains_key(operation_id)
    }

    /// Operations in document order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationRecord> {
        self.operations.values()
    }

    pub fn operation_ids(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Parses an API description given as JSON, falling back to YAML.
pub fn parse_document(text: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(json_error) => serde_yaml::from_str::<Value>(text)
            .with_context(|| format!("document is neither JSON ({json_error}) nor YAML")),
    }
}

/// Longest prefix shared by all `paths`, trimmed back to its last `/`.
///
/// Fewer than two paths share nothing, and a bare `/` counts as nothing shared.
///
/// ```rust
/// use oaish_engine::catalog::common_path_prefix;
///
/// assert_eq!(common_path_prefix(["/api/v1/users", "/api/v1/items"]), "/api/v1/");
/// assert_eq!(common_path_prefix(["/api/users", "/api/v2/items"]), "/api/");
/// assert_eq!(common_path_prefix(["/users", "/items"]), "");
/// ```
pub fn common_path_prefix<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let paths: Vec<&str> = paths.into_iter().collect();
    if paths.len() < 2 {
        return String::new();
    }
    let (Some(smallest), Some(largest)) = (paths.iter().min(), paths.iter().max()) else {
        return String::new();
    };

    let shared = smallest
        .char_indices()
        .zip(largest.chars())
        .take_while(|((_, left), right)| left == right)
        .last()
        .map(|((index, ch), _)| index + ch.len_utf8())
        .unwrap_or(0);

    let mut prefix = &smallest[..shared];
    if !prefix.ends_with('/') {
        prefix = match prefix.rfind('/') {
            Some(index) => &prefix[..=index],
            None => "",
        };
    }
    if prefix == "/" { String::new() } else { prefix.to_string() }
}

/// Strips `prefix` from `path` and guarantees a leading `/`.
pub fn display_path(path: &str, prefix: &str) -> String {
    let stripped = if prefix.is_empty() { path } else { path.strip_prefix(prefix).unwrap_or(path) };
    if stripped.starts_with('/') { stripped.to_string() } else { format!("/{stripped}") }
}

fn build_record(
    resolver: &SchemaResolver<'_>,
    common_prefix: &str,
    path: &str,
    path_item: &Value,
    method: &str,
    operation_id: &str,
    operation: &Value,
) -> OperationRecord {
    let mut parameters = Vec::new();
    let mut request_body = json_body_schema(resolver, operation);

    for parameter in collect_parameters(resolver, path_item, operation) {
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            continue;
        };
        let location_text = parameter.get("in").and_then(Value::as_str).unwrap_or("query");
        let Some(location) = ParameterLocation::parse(location_text) else {
            debug!(operation_id, parameter = name, location = location_text, "skipping parameter with unsupported location");
            continue;
        };

        if location == ParameterLocation::Body {
            if request_body.is_none() {
                request_body = parameter.get("schema").cloned();
            }
            continue;
        }

        let declared_type = parameter
            .get("schema")
            .map(|schema| resolver.resolve(schema))
            .and_then(|schema| schema_type(&schema))
            .or_else(|| parameter.get("type").and_then(Value::as_str).map(str::to_string));
        let required = parameter.get("required").and_then(Value::as_bool).unwrap_or(false);

        parameters.push(DeclaredParameter {
            name: name.to_string(),
            location,
            declared_type,
            required,
        });
    }

    let mut responses = IndexMap::new();
    if let Some(declared) = operation.get("responses").and_then(Value::as_object) {
        for (status, response) in declared {
            let response = resolver.resolve(response);
            if let Some(schema) = content_json_schema(&response).or_else(|| response.get("schema").cloned()) {
                responses.insert(status.clone(), schema);
            }
        }
    }

    OperationRecord {
        operation_id: operation_id.to_string(),
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        display_path: display_path(path, common_prefix),
        summary: operation.get("summary").and_then(Value::as_str).map(str::to_string),
        tags: operation
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        parameters,
        request_body,
        responses,
        raw: operation.clone(),
    }
}

/// Path-level then operation-level parameters with `$ref`s resolved. An operation
/// parameter replaces a path-level one with the same name and location.
fn collect_parameters(resolver: &SchemaResolver<'_>, path_item: &Value, operation: &Value) -> Vec<Map<String, Value>> {
    let mut out: Vec<Map<String, Value>> = Vec::new();

    let declared = [path_item, operation]
        .into_iter()
        .filter_map(|owner| owner.get("parameters").and_then(Value::as_array))
        .flatten();
    for parameter in declared {
        let Value::Object(resolved) = resolver.resolve(parameter) else {
            continue;
        };
        let key = |map: &Map<String, Value>| (map.get("name").cloned(), map.get("in").cloned());
        match out.iter().position(|existing| key(existing) == key(&resolved)) {
            Some(index) => out[index] = resolved,
            None => out.push(resolved),
        }
    }
    out
}

fn json_body_schema(resolver: &SchemaResolver<'_>, operation: &Value) -> Option<Value> {
    let request_body = resolver.resolve(operation.get("requestBody")?);
    content_json_schema(&request_body)
}

/// Schema of the JSON media type in a `content` map, preferring `application/json`.
fn content_json_schema(owner: &Value) -> Option<Value> {
    let content = owner.get("content")?.as_object()?;
    let media = content
        .get("application/json")
        .or_else(|| content.iter().find(|(media_type, _)| media_type.contains("json")).map(|(_, media)| media))?;
    media.get("schema").cloned()
}
