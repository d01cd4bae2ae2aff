//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results. Commands are
//! routed by [`CommandDispatcher`], which also owns the loaded configuration
//! every command builds its store and probe from.

pub mod cache;
pub mod dispatcher;
pub mod probe;
pub mod render;

pub use dispatcher::{Command, CommandDispatcher};

use crate::cache::{DiskStore, RevalidatingCache};
use crate::config::{resolve_cache_dir, Config};
use crate::error::Result;
use crate::fetch::HttpProbe;

/// Open the on-disk store the configuration points at.
pub(crate) fn open_store(config: &Config) -> DiskStore {
    DiskStore::new(resolve_cache_dir(config), config.max_cost)
}

/// Build the revalidating cache used by `render` and `probe`.
pub(crate) fn open_cache(
    config: &Config,
    auth_token: Option<String>,
) -> Result<RevalidatingCache<DiskStore, HttpProbe>> {
    let probe = HttpProbe::builder()
        .api_base(config.api_base.as_str())
        .user_agent(config.user_agent.as_str())
        .auth_token(auth_token)
        .policy(config.status_policy())
        .timeout(config.timeout())
        .build()?;

    Ok(RevalidatingCache::new(open_store(config), probe).with_entry_cost(config.entry_cost))
}
