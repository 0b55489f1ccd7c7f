//! A session ties the current catalog to the state store.
//!
//! The catalog is shared behind an `Arc` so a rediscovered document can be swapped in
//! without disturbing callers still holding the old one. State outlives catalog swaps.

use std::path::PathBuf;
use std::sync::Arc;

use oaish_types::{Assembly, CommandConfig, StateConfig};
use oaish_util::expand_tilde;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::assemble::PayloadAssembler;
use crate::catalog::Catalog;
use crate::commands::after_call_updates;
use crate::state::{SessionState, StateStoreError};

#[derive(Debug, Clone)]
pub struct Session {
    catalog: Arc<Catalog>,
    state: SessionState,
    auto_inject: Vec<String>,
}

impl Session {
    pub fn new(catalog: Catalog, state: SessionState) -> Self {
        Self {
            catalog: Arc::new(catalog),
            state,
            auto_inject: Vec::new(),
        }
    }

    /// Opens the configured state store and seeds it.
    ///
    /// This is the shell's startup contract: defaults only fill keys the store does
    /// not already hold, so values saved by earlier sessions survive a restart and a
    /// configured default never overwrites them. A state file that cannot be parsed
    /// fails here and is not rewritten.
    pub fn from_config(catalog: Catalog, config: &StateConfig) -> Result<Self, StateStoreError> {
        let path: Option<PathBuf> = config.storage.as_deref().map(expand_tilde);
        let mut state = SessionState::open(path)?;

        let seeds: Vec<(String, Value)> = config
            .defaults
            .iter()
            .filter(|(key, _)| !state.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !seeds.is_empty() {
            debug!(keys = seeds.len(), "seeding session state with defaults");
            state.update(seeds)?;
        }

        Ok(Self {
            catalog: Arc::new(catalog),
            state,
            auto_inject: config.auto_inject.clone(),
        })
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Swaps in a freshly discovered catalog; state is kept.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        info!(operations = catalog.len(), "replacing operation catalog");
        self.catalog = Arc::new(catalog);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn auto_inject(&self) -> &[String] {
        &self.auto_inject
    }

    pub fn assembler(&self) -> PayloadAssembler<'_> {
        PayloadAssembler::new(&self.catalog, &self.state)
    }

    /// Assembles a call, first adding configured `auto_inject` keys that the caller
    /// left out and that hold a non-empty value in state.
    pub fn prepare_call(&self, operation_id: &str, params: Map<String, Value>) -> Assembly {
        let mut params = params;
        for key in &self.auto_inject {
            if params.contains_key(key) {
                continue;
            }
            if let Some(value) = self.state.get(key).filter(|value| is_truthy(value)) {
                params.insert(key.clone(), value.clone());
            }
        }
        self.assembler().assemble(operation_id, params)
    }

    /// Stores the values a command's `after_call` extracts from `response`.
    ///
    /// Returns the keys written, in configuration order.
    pub fn apply_after_call(&mut self, command: &CommandConfig, response: &Value) -> Result<Vec<String>, StateStoreError> {
        let updates = after_call_updates(command, response);
        let keys: Vec<String> = updates.iter().map(|(key, _)| key.clone()).collect();
        if !updates.is_empty() {
            self.state.update(updates)?;
        }
        Ok(keys)
    }
}

/// Empty strings, zero, `false`, `null` and empty collections count as unset.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
