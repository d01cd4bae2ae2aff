//! Cache command implementation.
//!
//! Provides `manifest-cache cache list`, `cache clear` and `cache stats`.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cache::{CacheEntry, DiskStore};
use crate::config::Config;
use crate::ui::UserInterface;

use super::dispatcher::Command;
use super::open_store;

/// Arguments for the cache command.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

/// Cache subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CacheSubcommand {
    /// List cached entries.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached entry.
    Clear,
    /// Show cache statistics.
    Stats,
}

/// The cache command implementation.
pub struct CacheCommand {
    store: DiskStore,
    args: CacheArgs,
}

impl CacheCommand {
    /// Create a new cache command over the configured store.
    pub fn new(config: &Config, args: CacheArgs) -> Self {
        Self {
            store: open_store(config),
            args,
        }
    }
}

impl Command for CacheCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> crate::error::Result<()> {
        match &self.args.command {
            CacheSubcommand::List { json } => list_cache(&self.store, *json, ui)?,
            CacheSubcommand::Clear => clear_cache(&self.store, ui)?,
            CacheSubcommand::Stats => show_stats(&self.store, ui)?,
        }

        Ok(())
    }
}

/// Listing row; the cached value itself is left out.
#[derive(Debug, Serialize)]
struct EntrySummary<'a> {
    key: &'a str,
    kind: &'a str,
    cost: i64,
    size_bytes: u64,
    cached_at: DateTime<Utc>,
}

impl<'a> From<&'a CacheEntry> for EntrySummary<'a> {
    fn from(entry: &'a CacheEntry) -> Self {
        Self {
            key: &entry.key,
            kind: entry.kind(),
            cost: entry.cost,
            size_bytes: entry.size_bytes,
            cached_at: entry.cached_at,
        }
    }
}

fn list_cache(store: &DiskStore, json: bool, ui: &mut dyn UserInterface) -> Result<()> {
    let entries = store.list()?;

    if json {
        let summaries: Vec<EntrySummary<'_>> = entries.iter().map(EntrySummary::from).collect();
        ui.output(&serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if entries.is_empty() {
        ui.message("Cache is empty");
        return Ok(());
    }

    ui.message(&format!("{} cached entries:", entries.len()));
    for entry in &entries {
        ui.output(&format!(
            "  {:<9} {} ({} bytes, {} ago)",
            entry.kind(),
            entry.key,
            entry.size_bytes,
            format_age(entry.age())
        ));
    }

    Ok(())
}

fn clear_cache(store: &DiskStore, ui: &mut dyn UserInterface) -> Result<()> {
    let cleared = store.clear()?;

    if cleared == 0 {
        ui.message("Cache is already empty");
    } else {
        ui.success(&format!("Cleared {} entries", cleared));
    }

    Ok(())
}

fn show_stats(store: &DiskStore, ui: &mut dyn UserInterface) -> Result<()> {
    let entries = store.list()?;
    let tokens = entries.iter().filter(|e| e.kind() == "token").count();
    let used = store.total_cost()?;
    let total_size: u64 = entries.iter().map(|e| e.size_bytes).sum();

    ui.output("Cache Statistics:");
    ui.output(&format!("  Total entries: {}", entries.len()));
    ui.output(&format!("  Tokens: {}", tokens));
    ui.output(&format!("  Manifests: {}", entries.len() - tokens));
    ui.output(&format!("  Cost: {} / {}", used, store.max_cost()));
    ui.output(&format!("  Total size: {} bytes", total_size));
    ui.output(&format!("  Location: {}", store.root().display()));

    Ok(())
}

/// Compact age such as `42s`, `5m`, `3h` or `2d`.
fn format_age(age: Duration) -> String {
    let secs = age.num_seconds().max(0);

    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}
