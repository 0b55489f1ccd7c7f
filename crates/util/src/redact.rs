//! Masks credentials in text before it is logged or printed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const REDACTED: &str = "<redacted>";

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*)(.+)",
        r"(?i)(\bBearer\s+)([A-Za-z0-9\-._~+/]+=*)",
        r"(?i)(\b[A-Z0-9_\-]*(?:KEY|TOKEN|SECRET|PASSWORD)[\x22']?\s*[=:]\s*[\x22']?)([^\s\x22',]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Replaces values that look like credentials with `<redacted>`, keeping the key or
/// scheme that introduced them.
///
/// ```rust
/// use oaish_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Bearer abc.def"), "Authorization: <redacted>");
/// assert_eq!(redact_sensitive("API_KEY=hunter2 region=eu"), "API_KEY=<redacted> region=eu");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    REDACT_PATTERNS.iter().fold(input.to_string(), |text, pattern| {
        pattern
            .replace_all(&text, |caps: &Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}{REDACTED}")
            })
            .into_owned()
    })
}

/// Redacts a single header value when the header name suggests a credential.
pub fn redact_header(name: &str, value: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    if lowered == "authorization" || ["key", "token", "secret", "password"].iter().any(|word| lowered.contains(word)) {
        return REDACTED.to_string();
    }
    redact_sensitive(value)
}
