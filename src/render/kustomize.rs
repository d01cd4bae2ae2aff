//! Manifest rendering through the `kustomize` executable.

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::document::{decode_documents, Document};
use crate::error::{CacheError, Result};

/// Produces rendered documents from a directory on disk.
pub trait Renderer: Send + Sync {
    fn render(&self, root: &Path) -> Result<Vec<Document>>;
}

/// Runs `<binary> build <root>` and decodes its YAML output.
pub struct KustomizeRenderer {
    binary: PathBuf,
}

impl KustomizeRenderer {
    /// Use `kustomize` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("kustomize")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn build(&self, root: &Path) -> anyhow::Result<Vec<Document>> {
        let output = Command::new(&self.binary)
            .arg("build")
            .arg(root)
            .output()
            .with_context(|| format!("Failed to run {:?}", self.binary))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let stdout = String::from_utf8(output.stdout).context("Renderer output is not UTF-8")?;
        decode_documents(&stdout).context("Error converting rendered resources to documents")
    }
}

impl Default for KustomizeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for KustomizeRenderer {
    fn render(&self, root: &Path) -> Result<Vec<Document>> {
        tracing::debug!("Rendering {}", root.display());
        self.build(root).map_err(|e| CacheError::Render {
            path: root.to_path_buf(),
            message: format!("{:#}", e),
        })
    }
}
