//! Leaf helpers shared by the oaish engine, transport, and CLI.
//!
//! - [`schema`]: `$ref` resolution against a single in-memory document
//! - [`path_notation`]: dotted/bracketed addressing (`items[0].name`) over JSON data and schemas
//! - [`coerce`]: best-effort string to primitive inference
//! - [`http`]: path template substitution
//! - [`redact`]: masking credentials before they reach logs or the terminal

pub mod coerce;
pub mod http;
pub mod path_notation;
pub mod path_processing;
pub mod redact;
pub mod schema;

pub use coerce::{infer_str, infer_value, to_plain_string};
pub use http::*;
pub use path_notation::{PathToken, resolve_data, resolve_tokens, tokenize, validate_path};
pub use path_processing::expand_tilde;
pub use redact::{redact_header, redact_sensitive};
pub use schema::{SchemaResolver, schema_type};
