//! Configuration loading.
//!
//! - [`schema`] - the [`Config`] structure and its defaults
//! - [`loader`] - file discovery, parsing and environment overrides

pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_config, load_config_file, parse_config, resolve_auth_token,
    resolve_cache_dir, DEFAULT_CONFIG_FILE, ENV_API_BASE, ENV_CACHE_DIR,
};
pub use schema::Config;
