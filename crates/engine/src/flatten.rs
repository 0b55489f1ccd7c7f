//! Flattening of an operation's inputs into addressable parameters.
//!
//! Declared path, query, header and cookie parameters are reported as-is. The JSON
//! request body is walked property by property and every scalar (or array) leaf is
//! reported under its dotted name, so `{"profile": {"name": ...}}` yields
//! `profile.name`. A leaf is required only when every object on its chain lists the
//! next key in `required`.

use std::collections::HashSet;

use oaish_types::{FlattenedParameter, ParameterLocation};
use oaish_util::{SchemaResolver, schema_type};
use serde_json::Value;
use tracing::debug;

use crate::catalog::Catalog;

/// Type reported for body leaves whose schema declares none.
pub const UNTYPED_LEAF: &str = "any";
/// Type reported for declared parameters without a schema type.
pub const DEFAULT_PARAMETER_TYPE: &str = "string";

impl Catalog {
    /// All inputs of `operation_id`: declared parameters first, then body leaves in
    /// property order. Unknown operations have no inputs.
    pub fn params_for_operation(&self, operation_id: &str) -> Vec<FlattenedParameter> {
        let Some(operation) = self.get(operation_id) else {
            debug!(operation_id, "no such operation to flatten");
            return Vec::new();
        };

        let mut params: Vec<FlattenedParameter> = operation
            .parameters
            .iter()
            .map(|parameter| FlattenedParameter {
                name: parameter.name.clone(),
                location: parameter.location,
                param_type: parameter.declared_type.clone().unwrap_or_else(|| DEFAULT_PARAMETER_TYPE.to_string()),
                required: parameter.required,
            })
            .collect();

        if let Some(schema) = &operation.request_body {
            let mut flattener = BodyFlattener {
                resolver: self.resolver(),
                active_references: HashSet::new(),
                out: &mut params,
            };
            flattener.visit(schema, "", true);
        }
        params
    }
}

struct BodyFlattener<'a, 'o> {
    resolver: SchemaResolver<'a>,
    /// References currently being expanded on the walk from the root to this node.
    active_references: HashSet<String>,
    out: &'o mut Vec<FlattenedParameter>,
}

impl BodyFlattener<'_, '_> {
    /// `prefix` is empty at the root and otherwise the dotted chain followed by `.`.
    fn visit(&mut self, schema: &Value, prefix: &str, required: bool) {
        let reference = schema.get("$ref").and_then(Value::as_str).map(str::to_string);
        if let Some(reference) = &reference
            && !self.active_references.insert(reference.clone())
        {
            // Recursive structure: report the repeat as one opaque object.
            self.push_leaf(prefix, "object", required);
            return;
        }

        let resolved = self.resolver.resolve(schema);
        let declared_type = schema_type(&resolved);
        if declared_type.as_deref() == Some("object") {
            let required_keys: Vec<&str> = resolved
                .get("required")
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            if let Some(properties) = resolved.get("properties").and_then(Value::as_object) {
                for (name, property) in properties {
                    let child_required = required && required_keys.contains(&name.as_str());
                    self.visit(property, &format!("{prefix}{name}."), child_required);
                }
            }
        } else {
            self.push_leaf(prefix, declared_type.as_deref().unwrap_or(UNTYPED_LEAF), required);
        }

        if let Some(reference) = reference {
            self.active_references.remove(&reference);
        }
    }

    fn push_leaf(&mut self, prefix: &str, param_type: &str, required: bool) {
        let name = prefix.strip_suffix('.').unwrap_or(prefix);
        if name.is_empty() {
            return;
        }
        self.out.push(FlattenedParameter {
            name: name.to_string(),
            location: ParameterLocation::Body,
            param_type: param_type.to_string(),
            required,
        });
    }
}
