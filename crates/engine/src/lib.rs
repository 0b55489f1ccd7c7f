//! # Oaish Engine
//!
//! Turns an OpenAPI document into callable operations and turns loosely typed caller
//! input into request-shaped payloads.
//!
//! - **`catalog`**: indexes operations by `operationId` and computes display paths
//! - **`flatten`**: lists every input of an operation, body leaves by dotted name
//! - **`state`**: ordered key/value session store, optionally persisted as JSON
//! - **`assemble`**: autofill from state, coercion, and routing to path/query/header/body
//! - **`session`**: the current catalog plus state, with catalog hot swap
//! - **`commands`**: configured shorthand commands and after-call state capture
//! - **`render`**: plain-text response rendering
//! - **`suggest`**: completion candidates
//! - **`config`**: YAML configuration loading
//!
//! ```rust
//! use oaish_engine::{Catalog, PayloadAssembler, SessionState};
//! use serde_json::json;
//!
//! let catalog = Catalog::from_document(json!({
//!     "paths": {
//!         "/users/{id}": {
//!             "put": {
//!                 "operationId": "update_user",
//!                 "requestBody": { "content": { "application/json": { "schema": {
//!                     "type": "object",
//!                     "properties": { "profile": { "type": "object", "properties": { "name": { "type": "string" } } } }
//!                 } } } }
//!             }
//!         }
//!     }
//! }));
//! let state = SessionState::ephemeral();
//! let params = json!({ "id": "7", "profile.name": "Ada" }).as_object().cloned().unwrap_or_default();
//!
//! let assembly = PayloadAssembler::new(&catalog, &state).assemble("update_user", params);
//! assert_eq!(assembly.payload.path_params["id"], json!(7));
//! assert_eq!(assembly.payload.body["profile"], json!({ "name": "Ada" }));
//! ```

pub mod assemble;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod flatten;
pub mod render;
pub mod session;
pub mod state;
pub mod suggest;

pub use assemble::PayloadAssembler;
pub use catalog::{Catalog, parse_document};
pub use commands::{ResponseFieldError, after_call_updates, check_response_field, command_params, parse_flag_args, select_response};
pub use config::load_config;
pub use render::render_response;
pub use session::Session;
pub use state::{SessionState, StateStoreError};
pub use suggest::{complete_targets, flag_for, suggest_parameters};
