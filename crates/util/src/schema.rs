//! `$ref` resolution within a single API description.
//!
//! References are local JSON pointers (`#/components/schemas/Foo`). Resolution never
//! fails: a pointer into nothing resolves to an empty object, and a pointer that is
//! already being followed in the current chain ends the chain instead of looping.

use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

const REF_KEY: &str = "$ref";
const MAX_SCHEMA_RESOLUTION_DEPTH: usize = 128;

#[derive(Default)]
struct SchemaResolutionContext {
    depth: usize,
    visited_references: HashSet<String>,
}

/// Resolves schema fragments against the document they were taken from.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    document: &'a Value,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self { document }
    }

    pub fn document(&self) -> &'a Value {
        self.document
    }

    /// Returns `fragment` with its `$ref` chain inlined.
    ///
    /// Non-object fragments are returned unchanged. Keys that sit next to `$ref` in the
    /// fragment are merged over the referenced target, so local constraints win. When
    /// a pointer repeats within one chain, the fragment built so far is returned with
    /// the `$ref` key dropped.
    ///
    /// ```rust
    /// use oaish_util::SchemaResolver;
    /// use serde_json::json;
    ///
    /// let document = json!({
    ///     "components": { "schemas": { "User": { "type": "object", "description": "a user" } } }
    /// });
    /// let resolver = SchemaResolver::new(&document);
    /// let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/User", "description": "owner" }));
    /// assert_eq!(resolved, json!({ "type": "object", "description": "owner" }));
    /// ```
    pub fn resolve(&self, fragment: &Value) -> Value {
        let mut context = SchemaResolutionContext::default();
        self.resolve_internal(fragment, &mut context)
    }

    fn resolve_internal(&self, fragment: &Value, context: &mut SchemaResolutionContext) -> Value {
        let Some(map) = fragment.as_object() else {
            return fragment.clone();
        };
        let Some(reference) = map.get(REF_KEY).and_then(Value::as_str) else {
            return fragment.clone();
        };

        let siblings: Map<String, Value> = map
            .iter()
            .filter(|(key, _)| key.as_str() != REF_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let normalized_reference = normalize_reference(reference);
        if context.depth >= MAX_SCHEMA_RESOLUTION_DEPTH || !context.visited_references.insert(normalized_reference) {
            debug!(reference, "schema reference cycle detected; stopping resolution");
            return Value::Object(siblings);
        }

        let mut merged = self.lookup_pointer(reference).as_object().cloned().unwrap_or_default();
        merged.extend(siblings);

        context.depth += 1;
        self.resolve_internal(&Value::Object(merged), context)
    }

    /// Walks a slash-delimited pointer from the document root. The first segment (`#`) is
    /// skipped and any missing segment yields an empty object.
    fn lookup_pointer(&self, reference: &str) -> Value {
        let mut current = self.document;
        for segment in reference.split('/').skip(1) {
            let segment = decode_pointer_segment(segment);
            let next = match current {
                Value::Object(map) => map.get(segment.as_str()),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Value::Object(Map::new()),
            }
        }
        current.clone()
    }
}

fn normalize_reference(reference: &str) -> String {
    reference.strip_prefix('#').unwrap_or(reference).to_string()
}

fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Reads the primitive type of an already resolved schema.
///
/// Handles `type` given as a string or as an array with `null` alongside a single
/// concrete type (`["string", "null"]`). Returns `None` when no single type is declared.
pub fn schema_type(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(name) => Some(name.clone()),
        Value::Array(names) => {
            let mut concrete = names.iter().filter_map(Value::as_str).filter(|name| *name != "null");
            let first = concrete.next()?;
            concrete.next().is_none().then(|| first.to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contains_ref(value: &Value) -> bool {
        value.as_object().is_some_and(|map| map.contains_key(REF_KEY))
    }

    #[test]
    fn non_object_fragments_pass_through() {
        let document = json!({});
        let resolver = SchemaResolver::new(&document);
        assert_eq!(resolver.resolve(&json!("plain")), json!("plain"));
        assert_eq!(resolver.resolve(&json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn follows_chained_references() {
        let document = json!({
            "components": {
                "schemas": {
                    "Alias": { "$ref": "#/components/schemas/Middle" },
                    "Middle": { "$ref": "#/components/schemas/Leaf", "description": "middle" },
                    "Leaf": { "type": "string", "format": "uuid" }
                }
            }
        });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/Alias" }));

        assert!(!contains_ref(&resolved));
        assert_eq!(resolved, json!({ "type": "string", "format": "uuid", "description": "middle" }));
    }

    #[test]
    fn sibling_keys_override_target() {
        let document = json!({ "definitions": { "Count": { "type": "integer", "minimum": 0 } } });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/definitions/Count", "minimum": 5 }));

        assert_eq!(resolved["minimum"], json!(5));
        assert_eq!(resolved["type"], json!("integer"));
    }

    #[test]
    fn missing_target_resolves_to_empty_object() {
        let document = json!({ "components": {} });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/Nope" }));

        assert_eq!(resolved, json!({}));
    }

    #[test]
    fn escaped_pointer_segments_are_decoded() {
        let document = json!({ "paths": { "/users/{id}": { "x": { "type": "boolean" } } } });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/paths/~1users~1{id}/x" }));

        assert_eq!(resolved, json!({ "type": "boolean" }));
    }

    #[test]
    fn self_reference_terminates() {
        let document = json!({
            "components": { "schemas": { "Loop": { "$ref": "#/components/schemas/Loop" } } }
        });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/Loop", "title": "loop" }));

        assert!(!contains_ref(&resolved));
        assert_eq!(resolved, json!({ "title": "loop" }));
    }

    #[test]
    fn mutual_references_terminate() {
        let document = json!({
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B", "description": "a" },
                    "B": { "$ref": "#/components/schemas/A", "type": "object" }
                }
            }
        });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/A" }));

        assert!(!contains_ref(&resolved));
        assert_eq!(resolved["type"], json!("object"));
    }

    #[test]
    fn recursive_properties_are_not_expanded_eagerly() {
        let document = json!({
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": { "next": { "$ref": "#/components/schemas/Node" } }
                    }
                }
            }
        });
        let resolver = SchemaResolver::new(&document);

        let resolved = resolver.resolve(&json!({ "$ref": "#/components/schemas/Node" }));

        assert_eq!(resolved["properties"]["next"], json!({ "$ref": "#/components/schemas/Node" }));
    }

    #[test]
    fn schema_type_handles_nullable_arrays() {
        assert_eq!(schema_type(&json!({ "type": "integer" })).as_deref(), Some("integer"));
        assert_eq!(schema_type(&json!({ "type": ["string", "null"] })).as_deref(), Some("string"));
        assert_eq!(schema_type(&json!({ "type": ["string", "integer"] })), None);
        assert_eq!(schema_type(&json!({})), None);
    }
}
