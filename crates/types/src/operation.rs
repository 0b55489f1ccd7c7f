//! Cataloged operations and the inputs they accept.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a parameter travels in the outbound request.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    /// A leaf of the JSON request body, addressed by dotted name.
    Body,
}

impl ParameterLocation {
    /// Parses an OpenAPI `in` value. `body` is accepted for Swagger-style documents.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            "body" => Some(Self::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standard (non-body) parameter as declared on an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredParameter {
    pub name: String,
    pub location: ParameterLocation,
    /// Schema type of the parameter, `None` when the document leaves it out.
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// One callable endpoint, keyed by its `operationId`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationRecord {
    pub operation_id: String,
    /// Upper-case HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Raw path template including `{name}` placeholders.
    pub path: String,
    /// Path with the catalog's common prefix removed, always starting with `/`.
    pub display_path: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<DeclaredParameter>,
    /// JSON schema of the `application/json` request body, if any.
    #[serde(default)]
    pub request_body: Option<Value>,
    /// JSON response schemas keyed by status code (`"200"`, `"default"`, ...).
    #[serde(default)]
    pub responses: IndexMap<String, Value>,
    /// The operation object exactly as it appeared in the document.
    #[serde(default)]
    pub raw: Value,
}

impl OperationRecord {
    /// Placeholder names in the raw path template, in order of appearance.
    pub fn path_placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.path.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                break;
            };
            names.push(&after[..end]);
            rest = &after[end + 1..];
        }
        names
    }

    /// Finds a declared parameter by exact name.
    pub fn declared(&self, name: &str) -> Option<&DeclaredParameter> {
        self.parameters.iter().find(|parameter| parameter.name == name)
    }

    /// JSON schema of the response for `status`, if documented.
    pub fn response_schema(&self, status: &str) -> Option<&Value> {
        self.responses.get(status)
    }
}

/// A single addressable input of an operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlattenedParameter {
    /// Parameter name, or dotted property chain for body leaves (`profile.name`).
    pub name: String,
    pub location: ParameterLocation,
    /// Primitive type (`string`, `integer`, ...). Body leaves without a type report `any`.
    pub param_type: String,
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str) -> OperationRecord {
        OperationRecord {
            operation_id: "op".into(),
            method: "GET".into(),
            path: path.into(),
            display_path: path.into(),
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: IndexMap::new(),
            raw: Value::Null,
        }
    }

    #[test]
    fn path_placeholders_are_listed_in_order() {
        let op = record("/orgs/{org}/users/{user_id}/keys");
        assert_eq!(op.path_placeholders(), vec!["org", "user_id"]);
    }

    #[test]
    fn unterminated_placeholder_is_ignored() {
        let op = record("/things/{id");
        assert!(op.path_placeholders().is_empty());
    }

    #[test]
    fn location_parsing_is_case_insensitive() {
        assert_eq!(ParameterLocation::parse("Header"), Some(ParameterLocation::Header));
        assert_eq!(ParameterLocation::parse("formData"), None);
        assert_eq!(ParameterLocation::Query.to_string(), "query");
    }
}
