//! Configuration file discovery and loading.
//!
//! Merge order (later overrides earlier):
//! 1. Built-in defaults
//! 2. The config file (`--config`, else `./.manifest-cache.yml` if present)
//! 3. Environment overrides (`MANIFEST_CACHE_API_BASE`, `MANIFEST_CACHE_DIR`)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::schema::Config;
use crate::error::{CacheError, Result};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".manifest-cache.yml";

/// Overrides `api_base`.
pub const ENV_API_BASE: &str = "MANIFEST_CACHE_API_BASE";

/// Overrides `cache_dir`.
pub const ENV_CACHE_DIR: &str = "MANIFEST_CACHE_DIR";

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigParse` naming `path` if the file can't be read or the
/// YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| CacheError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse YAML content into a [`Config`].
///
/// An empty file yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    serde_yaml::from_str(content).map_err(|e| CacheError::ConfigParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply environment overrides.
///
/// Looks in `env_vars` first, then falls back to the process environment.
pub fn apply_env_overrides(config: &mut Config, env_vars: &HashMap<String, String>) {
    let lookup = |key: &str| {
        env_vars
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.is_empty())
    };

    if let Some(api_base) = lookup(ENV_API_BASE) {
        config.api_base = api_base;
    }
    if let Some(dir) = lookup(ENV_CACHE_DIR) {
        config.cache_dir = Some(PathBuf::from(dir));
    }
}

/// Load the effective configuration.
///
/// An explicit `path` must exist; the implicit `./.manifest-cache.yml` is
/// only read when present.
pub fn load_config(path: Option<&Path>, env_vars: &HashMap<String, String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => {
            let implicit = Path::new(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                load_config_file(implicit)?
            } else {
                Config::default()
            }
        }
    };

    apply_env_overrides(&mut config, env_vars);
    tracing::debug!("Effective config: {:?}", config);

    Ok(config)
}

/// Resolve the cache directory.
///
/// `cache_dir` from config wins, then `$XDG_CACHE_HOME/manifest-cache`,
/// then `$HOME/.cache/manifest-cache`, then `./.manifest-cache`.
pub fn resolve_cache_dir(config: &Config) -> PathBuf {
    if let Some(dir) = &config.cache_dir {
        return dir.clone();
    }

    if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg).join("manifest-cache");
    }

    if let Some(home) = std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".cache").join("manifest-cache");
    }

    PathBuf::from(".manifest-cache")
}

/// Read the API bearer token named by `config.token_env`, if set.
pub fn resolve_auth_token(config: &Config, env_vars: &HashMap<String, String>) -> Option<String> {
    env_vars
        .get(&config.token_env)
        .cloned()
        .or_else(|| std::env::var(&config.token_env).ok())
        .filter(|v| !v.is_empty())
}
