//! manifest-cache - rendered configuration manifests, revalidated by ETag.
//!
//! Rendering a remote configuration source (fetch, then `kustomize build`)
//! is slow. This crate keeps the rendered documents and, on each request,
//! asks the upstream metadata API whether the source changed since the
//! validator token on file. Unchanged sources are served from the cache;
//! changed ones are rendered again and stored under the new token.
//!
//! # Modules
//!
//! - [`cache`] - Revalidating cache and its stores
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and environment overrides
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - Upstream probes and source fetching
//! - [`render`] - Documents, the renderer, and the fetch-render pipeline
//! - [`source`] - Source identifiers
//! - [`ui`] - Terminal output
//!
//! # Example
//!
//! ```
//! use manifest_cache::cache::{CacheKey, ValidatorToken};
//! use manifest_cache::source::SourceId;
//!
//! let source = SourceId::parse("github.com/owner/repo").unwrap();
//! assert_eq!(source.api_url("https://api.github.com"), "https://api.github.com/repos/owner/repo");
//!
//! let key = CacheKey::manifests(&source, &ValidatorToken::new("\"abc\""));
//! assert!(key.encode().starts_with("manifests:"));
//! ```
//!
//! For the HTTP round trips, see the integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod render;
pub mod source;
pub mod ui;

pub use error::{CacheError, Result};
