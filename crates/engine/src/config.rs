//! Loading of the YAML shell configuration.

use std::{env, fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, bail};
use dirs_next::config_dir;
use oaish_types::ShellConfig;
use oaish_util::expand_tilde;
use tracing::debug;

/// Environment variable pointing at the configuration file.
pub const CONFIG_PATH_ENV: &str = "OAISH_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Loads the configuration from `explicit`, then `OAISH_CONFIG_PATH`, then the
/// default location.
///
/// A path the user named must exist. A missing file at the default location yields
/// the default configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<ShellConfig> {
    let named = explicit.map(Path::to_path_buf).or_else(env_config_path);
    match named {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            read_config(&path)
        }
        None => {
            let path = default_config_path();
            if path.exists() {
                read_config(&path)
            } else {
                debug!(path = %path.display(), "no config file; using defaults");
                Ok(ShellConfig::default())
            }
        }
    }
}

/// Parses one YAML config file. An empty file is the default configuration.
pub fn read_config(path: &Path) -> Result<ShellConfig> {
    let content = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(ShellConfig::default());
    }
    let config: ShellConfig = serde_yaml::from_str(&content).with_context(|| format!("parse config {}", path.display()))?;
    debug!(path = %path.display(), commands = config.commands.len(), "loaded config");
    Ok(config)
}

fn env_config_path() -> Option<PathBuf> {
    env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|path| !path.trim().is_empty())
        .map(|path| expand_tilde(&path))
}

/// `<config dir>/oaish/config.yaml`.
pub fn default_config_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oaish")
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_explicit_config() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("shell.yaml");
        fs::write(
            &path,
            "name: Demo\nbase_url: http://localhost:8001\ncommands:\n  /ping:\n    operationId: ping\n",
        )
        .expect("write");

        let config = load_config(Some(&path)).expect("config");
        assert_eq!(config.name, "Demo");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8001"));
        assert_eq!(config.commands["/ping"].operation_id, "ping");
    }

    #[test]
    fn empty_file_is_default() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "\n").expect("write");
        assert_eq!(read_config(&path).expect("config"), ShellConfig::default());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let error = load_config(Some(&dir.path().join("absent.yaml"))).expect_err("missing file");
        assert!(error.to_string().contains("does not exist"));
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "commands: [unclosed").expect("write");
        let error = read_config(&path).expect_err("bad yaml");
        assert!(format!("{error:#}").contains("bad.yaml"));
    }
}
