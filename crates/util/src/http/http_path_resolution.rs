use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

use crate::coerce::to_plain_string;

/// Bytes left as-is in a path placeholder value: RFC 3986 unreserved characters.
const PATH_PLACEHOLDER_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Substitutes `{name}` placeholders in an OpenAPI path template.
///
/// Values are rendered without JSON quoting and percent-encoded, so a value can never
/// introduce extra path segments. Placeholders without a value stay in the output.
///
/// ```rust
/// use oaish_util::build_path;
/// use serde_json::{Map, Value};
///
/// let mut variables = Map::new();
/// variables.insert("id".into(), Value::from(42));
/// assert_eq!(build_path("/users/{id}/keys/{key}", &variables), "/users/42/keys/{key}");
/// ```
pub fn build_path(template: &str, variables: &Map<String, Value>) -> String {
    let mut path = template.to_string();
    for (name, value) in variables {
        let plain = to_plain_string(value);
        let encoded = utf8_percent_encode(&plain, PATH_PLACEHOLDER_SET).to_string();
        path = path.replace(&format!("{{{}}}", name), &encoded);
    }
    path
}

/// Joins a base URL and an API-relative path with exactly one `/` between them.
/// Absolute `http(s)://` targets are returned unchanged.
pub fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
