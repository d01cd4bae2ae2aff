//! Cache keys, values and stored entry metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::render::Document;
use crate::source::SourceId;

/// Opaque upstream-issued version marker (an HTTP ETag), kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorToken(String);

impl ValidatorToken {
    /// Wrap a raw token value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, e.g. `"W/\"abc123\""`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed key into a [`CacheStore`](super::CacheStore).
///
/// Rendered output is keyed by the (source, token) pair so two sources that
/// happen to share a token never read each other's manifests. The source
/// part is [`SourceId::cache_id`], so each rendered directory of a source
/// has its own tokens and output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Token backed by stored output.
    Token { source: String },
    /// Token seen upstream whose output has not been stored yet.
    PendingToken { source: String },
    /// Rendered output for a source at a token.
    Manifests { source: String, token: String },
}

impl CacheKey {
    pub fn token(source: &SourceId) -> Self {
        Self::Token {
            source: source.cache_id(),
        }
    }

    pub fn pending_token(source: &SourceId) -> Self {
        Self::PendingToken {
            source: source.cache_id(),
        }
    }

    pub fn manifests(source: &SourceId, token: &ValidatorToken) -> Self {
        Self::Manifests {
            source: source.cache_id(),
            token: token.as_str().to_string(),
        }
    }

    /// Flat string form used by stores.
    ///
    /// The source length prefix keeps the composite key unambiguous even when
    /// sources or tokens contain separator characters.
    pub fn encode(&self) -> String {
        match self {
            Self::Token { source } => format!("token:{}", source),
            Self::PendingToken { source } => format!("pending:{}", source),
            Self::Manifests { source, token } => {
                format!("manifests:{}:{}:{}", source.len(), source, token)
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// A value held by a cache store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Token(ValidatorToken),
    Manifests(Vec<Document>),
}

impl CacheValue {
    /// The token, if this value holds one.
    pub fn into_token(self) -> Option<ValidatorToken> {
        match self {
            Self::Token(token) => Some(token),
            Self::Manifests(_) => None,
        }
    }

    /// The documents, if this value holds rendered output.
    pub fn into_manifests(self) -> Option<Vec<Document>> {
        match self {
            Self::Manifests(documents) => Some(documents),
            Self::Token(_) => None,
        }
    }
}

/// A persisted cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Encoded [`CacheKey`].
    pub key: String,
    /// Stored value.
    pub value: CacheValue,
    /// Admission cost charged for this entry.
    pub cost: i64,
    /// When this entry was written.
    pub cached_at: DateTime<Utc>,
    /// Serialized size of the value in bytes.
    pub size_bytes: u64,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(key: &CacheKey, value: CacheValue, cost: i64) -> Self {
        Self {
            key: key.encode(),
            value,
            cost,
            cached_at: Utc::now(),
            size_bytes: 0,
        }
    }

    /// Set size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size_bytes = size;
        self
    }

    /// Get the age of this entry.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.cached_at)
    }

    /// Short label for listings.
    pub fn kind(&self) -> &'static str {
        match self.value {
            CacheValue::Token(_) => "token",
            CacheValue::Manifests(_) => "manifests",
        }
    }
}
