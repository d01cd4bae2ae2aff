//! Error types for manifest-cache operations.
//!
//! This module defines [`CacheError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `CacheError` for conditions callers need to tell apart
//!   (transport failures, store rejections, invariant violations)
//! - Use `anyhow::Error` (via `CacheError::Other`) inside collaborators
//!   where only the message matters
//! - "First request" and "resource modified" are protocol signals, carried by
//!   [`Lookup`](crate::cache::Lookup); the `NotYetCached` and
//!   `ResourceModified` variants exist for callers that want them as errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for manifest-cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source identifier does not name an owner and a repository.
    #[error("Invalid source '{source_id}': expected at least two path segments")]
    InvalidSource { source_id: String },

    /// The render path is absolute or climbs out of the source checkout.
    #[error("Invalid render path '{path}': must be relative and stay inside the source")]
    InvalidPath { path: PathBuf },

    /// The upstream probe could not be sent or answered (network, DNS, timeout).
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The upstream answered with a status that says nothing about the
    /// resource itself (rate limit, auth failure, server error).
    #[error("Upstream unavailable for {source_id}: HTTP {status}")]
    UpstreamUnavailable { source_id: String, status: u16 },

    /// The cache store refused a write.
    #[error("Cache store rejected write for key {key}")]
    StoreRejected { key: String },

    /// A token is on file but the output it points to is gone.
    #[error("Failed to get cached value for key {key}")]
    MissingCachedValue { key: String },

    /// `add` was called before any token was observed for the source.
    #[error("No validator token cached for source {source_id}")]
    MissingToken { source_id: String },

    /// First request for a source; nothing has been rendered yet.
    #[error("first request, not cached yet")]
    NotYetCached,

    /// Upstream reports a new version; the source must be rendered again.
    #[error("resource modified, should download it again")]
    ResourceModified,

    /// The source fetcher failed to materialize the source.
    #[error("Failed to fetch {source_id}: {message}")]
    Fetch { source_id: String, message: String },

    /// The manifest renderer failed.
    #[error("Failed to render {path}: {message}")]
    Render { path: PathBuf, message: String },

    /// A configuration file could not be read or parsed.
    #[error("Failed to load config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for manifest-cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
