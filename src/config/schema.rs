//! Configuration schema.
//!
//! Maps to the YAML configuration file. Every field is optional; missing
//! fields take the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_ENTRY_COST;
use crate::fetch::StatusPolicy;
use crate::source::DEFAULT_API_BASE;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the repository metadata API.
    pub api_base: String,

    /// `User-Agent` sent with probes.
    pub user_agent: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Environment variable holding a bearer token for the API.
    pub token_env: String,

    /// Admission cost charged per cache entry.
    pub entry_cost: i64,

    /// Total admission budget of the on-disk store.
    pub max_cost: i64,

    /// Where cached entries live. Defaults to the user cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Treat rate limits, auth failures and server errors as "unavailable"
    /// instead of "modified".
    pub strict_status: bool,

    /// Renderer executable.
    pub kustomize_bin: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: "manifest-cache".to_string(),
            timeout_secs: 30,
            token_env: "GITHUB_TOKEN".to_string(),
            entry_cost: DEFAULT_ENTRY_COST,
            max_cost: 1 << 30,
            cache_dir: None,
            strict_status: false,
            kustomize_bin: PathBuf::from("kustomize"),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn status_policy(&self) -> StatusPolicy {
        if self.strict_status {
            StatusPolicy::Strict
        } else {
            StatusPolicy::Coarse
        }
    }
}
