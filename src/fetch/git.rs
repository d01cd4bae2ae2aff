//! Source fetching.
//!
//! Local directories are copied; everything else is shallow-cloned with the
//! `git` executable.

use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::SourceFetcher;
use crate::error::{CacheError, Result};
use crate::source::SourceId;

/// Fetches sources from local paths or git remotes.
pub struct DefaultFetcher {
    git_binary: PathBuf,
}

impl DefaultFetcher {
    /// Create a fetcher that runs `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_git_binary("git")
    }

    /// Create a fetcher that runs a specific git executable.
    pub fn with_git_binary(git_binary: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    fn clone_repo(&self, url: &str, destination: &Path) -> anyhow::Result<()> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let output = Command::new(&self.git_binary)
            .args(["clone", "--depth", "1", "--quiet"])
            .arg(url)
            .arg(destination)
            .output()
            .with_context(|| format!("Failed to run {:?}", self.git_binary))?;

        if !output.status.success() {
            bail!(
                "Git clone failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

impl Default for DefaultFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFetcher for DefaultFetcher {
    fn fetch(&self, source: &SourceId, destination: &Path) -> Result<()> {
        let local = Path::new(source.as_str());

        let result = if local.is_dir() {
            tracing::debug!("Copying {} to {}", source, destination.display());
            copy_dir(local, destination)
        } else {
            let url = clone_url(source.as_str());
            tracing::debug!("Cloning {} into {}", url, destination.display());
            self.clone_repo(&url, destination)
        };

        result.map_err(|e| CacheError::Fetch {
            source_id: source.to_string(),
            message: format!("{:#}", e),
        })
    }
}

/// Turn a source identifier into something `git clone` accepts.
///
/// `git::` forcing prefixes are dropped and scheme-less hosts get `https://`.
pub fn clone_url(source: &str) -> String {
    let source = source.strip_prefix("git::").unwrap_or(source);

    if source.contains("://") || source.starts_with("git@") {
        source.to_string()
    } else {
        format!("https://{}", source)
    }
}

fn copy_dir(from: &Path, to: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(to).with_context(|| format!("Failed to create {:?}", to))?;

    for entry in fs::read_dir(from).with_context(|| format!("Failed to read {:?}", from))? {
        let entry = entry?;
        let target = to.join(entry.file_name());

        if entry.file_type()?.is_dir() {
            if entry.file_name() == ".git" {
                continue;
            }
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
        }
    }

    Ok(())
}
