//! Session state: a small ordered key/value store carried across calls.
//!
//! State feeds autofill (`session_id`, `user.id`, ...) and `$STATE.name` templates, and
//! receives values extracted from responses. When opened with a path it is mirrored
//! to a pretty-printed JSON file after every update; without one it lives in memory.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use oaish_util::{PathToken, resolve_tokens, tokenize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("state file I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    path: Option<PathBuf>,
    data: IndexMap<String, Value>,
}

impl SessionState {
    /// Opens the store, loading `path` when given.
    ///
    /// A missing file is an empty store. A file that is not a JSON object is an error
    /// and is left as it is on disk.
    pub fn open(path: Option<PathBuf>) -> Result<Self, StateStoreError> {
        let data = match &path {
            Some(path) => load_entries(path)?,
            None => IndexMap::new(),
        };
        Ok(Self { path, data })
    }

    /// In-memory store that never touches disk.
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.data.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn entries(&self) -> &IndexMap<String, Value> {
        &self.data
    }

    /// Merges `entries` over the current contents and persists the result.
    ///
    /// Existing keys keep their position; new keys are appended.
    pub fn update<I, K>(&mut self, entries: I) -> Result<(), StateStoreError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            self.data.insert(key.into(), value);
        }
        self.persist()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Result<(), StateStoreError> {
        self.update([(key.into(), value)])
    }

    /// Finds a non-null value for `name`.
    ///
    /// An exact key wins; otherwise a dotted or bracketed name (`user.id`,
    /// `orgs[0].name`) is walked into the stored values.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.data.get(name) {
            return (!value.is_null()).then_some(value);
        }
        let tokens = tokenize(name);
        let (PathToken::Field(first), rest) = tokens.split_first()? else {
            return None;
        };
        if rest.is_empty() {
            return None;
        }
        resolve_tokens(self.data.get(first)?, rest).filter(|value| !value.is_null())
    }

    /// Snapshot of the whole store as one JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.data.iter().map(|(key, value)| (key.clone(), value.clone())).collect())
    }

    fn persist(&self) -> Result<(), StateStoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StateStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, data).map_err(|source| StateStoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), keys = self.data.len(), "persisted session state");
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<IndexMap<String, Value>, StateStoreError> {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str::<IndexMap<String, Value>>(&data).map_err(|source| {
            warn!(path = %path.display(), error = %source, "failed to parse session state file");
            StateStoreError::Parse {
                path: path.to_path_buf(),
                source,
            }
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(IndexMap::new()),
        Err(source) => Err(StateStoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let mut state = SessionState::open(Some(path.clone())).expect("open");
        assert!(state.is_empty());
        state.update([("token", json!("abc")), ("count", json!(2))]).expect("update");
        state.set("token", json!("def")).expect("set");

        let reopened = SessionState::open(Some(path)).expect("reopen");
        assert_eq!(reopened.get("token"), Some(&json!("def")));
        assert_eq!(reopened.get("count"), Some(&json!(2)));
        assert_eq!(reopened.entries().keys().collect::<Vec<_>>(), vec!["token", "count"]);
    }

    #[test]
    fn malformed_file_is_an_error_and_stays_on_disk() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        let original = r#"{ "token": "precious", "user": {"id": "u1"}, }"#;
        fs::write(&path, original).expect("write");

        let error = SessionState::open(Some(path.clone())).expect_err("trailing comma");
        assert!(matches!(error, StateStoreError::Parse { .. }));
        assert!(error.to_string().contains("state.json"));
        assert_eq!(fs::read_to_string(&path).expect("read"), original);

        fs::write(&path, "[1, 2, 3]").expect("write");
        assert!(SessionState::open(Some(path)).is_err());
    }

    #[test]
    fn ephemeral_state_stays_in_memory() {
        let mut state = SessionState::ephemeral();
        state.set("k", json!("v")).expect("set");
        assert_eq!(state.get("k"), Some(&json!("v")));
        assert!(state.path().is_none());
        let fallback = json!("fallback");
        assert_eq!(state.get_or("missing", &fallback), &fallback);
    }

    #[test]
    fn lookup_prefers_exact_keys_then_walks_paths() {
        let mut state = SessionState::ephemeral();
        state
            .update([
                ("user", json!({ "id": "nested", "orgs": [{ "name": "acme" }] })),
                ("user.id", json!("flat")),
                ("cleared", Value::Null),
            ])
            .expect("update");

        assert_eq!(state.lookup("user.id"), Some(&json!("flat")));
        assert_eq!(state.lookup("user.orgs[0].name"), Some(&json!("acme")));
        assert_eq!(state.lookup("cleared"), None);
        assert_eq!(state.lookup("user.missing"), None);
        assert_eq!(state.lookup("absent"), None);
    }
}
