//! Source identifiers.
//!
//! A source names a remote configuration repository, e.g.
//! `github.com/owner/repo`. The last two path segments are taken as the
//! owner and repository when building the probe endpoint.
//!
//! A source may be narrowed to a directory inside it with
//! [`SourceId::with_path`]. Each such directory is cached on its own, under
//! `{source}//{path}`.

use std::fmt;
use std::path::{Component, Path};

use crate::error::{CacheError, Result};

/// Default base for the repository metadata API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// A parsed source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId {
    raw: String,
    owner: String,
    repository: String,
    path: Option<String>,
}

impl SourceId {
    /// Parse a source identifier.
    ///
    /// A single trailing `/` is ignored. Fails with
    /// [`CacheError::InvalidSource`] when fewer than two non-empty segments
    /// remain.
    pub fn parse(source: &str) -> Result<Self> {
        let trimmed = source.trim().trim_end_matches('/');
        let mut segments = trimmed.rsplit('/');

        let repository = segments.next().filter(|s| !s.is_empty());
        let owner = segments.next().filter(|s| !s.is_empty());

        match (owner, repository) {
            (Some(owner), Some(repository)) => Ok(Self {
                raw: source.trim().to_string(),
                owner: owner.to_string(),
                repository: repository.to_string(),
                path: None,
            }),
            _ => Err(CacheError::InvalidSource {
                source_id: source.to_string(),
            }),
        }
    }

    /// Narrow this source to the directory `path` inside it.
    ///
    /// `.` components are dropped; `.` alone names the source root. Absolute
    /// paths and `..` components fail with [`CacheError::InvalidPath`].
    pub fn with_path(&self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut segments = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_string_lossy()),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(CacheError::InvalidPath {
                        path: path.to_path_buf(),
                    })
                }
            }
        }

        Ok(Self {
            path: (!segments.is_empty()).then(|| segments.join("/")),
            ..self.clone()
        })
    }

    /// The identifier exactly as given (minus surrounding whitespace).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory inside the source, if narrowed.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Identity under which rendered output is cached.
    pub fn cache_id(&self) -> String {
        match &self.path {
            Some(path) => format!("{}//{}", self.raw, path),
            None => self.raw.clone(),
        }
    }

    /// Second-to-last path segment.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Last path segment.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Metadata endpoint for this source under `api_base`.
    pub fn api_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repository
        )
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)?;
        if let Some(path) = &self.path {
            write!(f, "//{}", path)?;
        }
        Ok(())
    }
}
