//! YAML configuration model.
//!
//! A config file names the API to discover, optional shorthand commands that map
//! positional arguments onto an operation's parameters, and how the session state
//! is stored and seeded. Maps use `IndexMap` so commands list in authoring order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default location of the API description relative to the base URL.
pub const DEFAULT_OPENAPI_URL: &str = "/openapi.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Absolute URL or base-relative path of the API description.
    #[serde(default = "default_openapi_url")]
    pub openapi_url: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Shorthand commands keyed by their invocation name (for example `/login`).
    #[serde(default)]
    pub commands: IndexMap<String, CommandConfig>,
    #[serde(default)]
    pub state: StateConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            openapi_url: default_openapi_url(),
            base_url: None,
            commands: IndexMap::new(),
            state: StateConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Finds the first command bound to `operation_id`.
    pub fn command_for_operation(&self, operation_id: &str) -> Option<&CommandConfig> {
        self.commands.values().find(|command| command.operation_id == operation_id)
    }
}

fn default_name() -> String {
    "oaish".to_string()
}

fn default_openapi_url() -> String {
    DEFAULT_OPENAPI_URL.to_string()
}

/// A shorthand command bound to one operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandConfig {
    #[serde(rename = "operationId", alias = "operation_id")]
    pub operation_id: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Parameter name to template (`$1`, `$STATE.token`, literals).
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
    #[serde(default)]
    pub after_call: Option<AfterCallConfig>,
    /// Dotted path into the response shown instead of the full body.
    #[serde(default)]
    pub default_response_field: Option<String>,
    /// Skip validating `default_response_field` against the response schema.
    #[serde(default)]
    pub force_response_field: bool,
    #[serde(default)]
    pub formatting: Option<ResponseFormatting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AfterCallConfig {
    /// State key to extraction path, written as `json:<dotted path>`.
    #[serde(default)]
    pub save_to_state: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateConfig {
    /// JSON file backing the session state. `None` keeps state in memory.
    #[serde(default)]
    pub storage: Option<String>,
    /// State keys injected into every call that does not supply them.
    #[serde(default)]
    pub auto_inject: Vec<String>,
    /// Values merged into state at startup.
    #[serde(default)]
    pub defaults: IndexMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseFormatting {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub blocks: Vec<FormatBlock>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatBlock {
    /// Dotted path selecting the block's data; empty selects the whole response.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub layout: LayoutKind,
    /// Skip the block entirely when `path` does not resolve.
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// How a block of response data is laid out.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    List,
    Table,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub format: FieldFormat,
    #[serde(default)]
    pub optional: bool,
}

impl FieldSpec {
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldFormat {
    #[default]
    Text,
    Json,
    Markdown,
}
