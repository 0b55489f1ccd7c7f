//! Best-effort inference of primitive values from loosely typed string input.
//!
//! Command lines and form fields deliver everything as text. These helpers turn
//! `"30"` into `30`, `"true"` into `true` and leave anything else alone. They never
//! fail: text that does not parse stays a string.

use serde_json::{Number, Value};

/// Infers a primitive from a string value; other values pass through unchanged.
pub fn infer_value(value: Value) -> Value {
    match value {
        Value::String(text) => infer_str(&text),
        other => other,
    }
}

/// Infers a boolean, integer or float from `text`.
///
/// - `true`/`false` in any letter case become booleans
/// - text without a decimal point that parses as an integer becomes an integer
/// - text with a decimal point that parses as a finite float becomes a float
/// - everything else is returned as the original string
///
/// ```rust
/// use oaish_util::infer_str;
/// use serde_json::json;
///
/// assert_eq!(infer_str("123"), json!(123));
/// assert_eq!(infer_str("12.3"), json!(12.3));
/// assert_eq!(infer_str("True"), json!(true));
/// assert_eq!(infer_str("abc"), json!("abc"));
/// ```
pub fn infer_str(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if text.contains('.') {
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    } else if let Ok(integer) = text.parse::<i64>() {
        return Value::Number(integer.into());
    } else if let Ok(unsigned) = text.parse::<u64>() {
        return Value::Number(unsigned.into());
    }

    Value::String(text.to_string())
}

/// Renders a value the way it should appear inside a URL, header or template:
/// strings without quotes, `null` as an empty string, everything else as JSON text.
pub fn to_plain_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
