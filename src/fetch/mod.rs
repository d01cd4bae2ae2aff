//! Upstream access: revalidation probes and source fetching.
//!
//! - [`RevalidationProbe`] asks upstream whether a source changed since a
//!   token; [`HttpProbe`] answers it with HTTP conditional requests.
//! - [`SourceFetcher`] materializes a source on local disk;
//!   [`DefaultFetcher`] copies local directories and clones git remotes.

pub mod git;
pub mod http;

use std::path::Path;

use crate::cache::ValidatorToken;
use crate::error::Result;
use crate::source::SourceId;

pub use git::DefaultFetcher;
pub use http::{HttpProbe, StatusPolicy};

/// What upstream said about a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The token presented is still current.
    NotModified,
    /// The resource is at a different version than the token presented
    /// (or no token was presented). Carries the current token, if any.
    Changed { token: Option<ValidatorToken> },
    /// Upstream could not answer for reasons unrelated to the resource.
    Unavailable { status: u16 },
}

/// Cheap "has this changed since token T?" check against upstream.
pub trait RevalidationProbe: Send + Sync {
    /// Probe `source`, conditionally on `token` when one is given.
    ///
    /// Exactly one round trip; transport failures are returned as errors and
    /// never retried.
    fn probe(&self, source: &SourceId, token: Option<&ValidatorToken>) -> Result<ProbeOutcome>;
}

impl<P: RevalidationProbe + ?Sized> RevalidationProbe for &P {
    fn probe(&self, source: &SourceId, token: Option<&ValidatorToken>) -> Result<ProbeOutcome> {
        (**self).probe(source, token)
    }
}

/// Materializes a source's content on local disk.
pub trait SourceFetcher: Send + Sync {
    /// Fetch `source` into `destination`, which must not exist yet.
    fn fetch(&self, source: &SourceId, destination: &Path) -> Result<()>;
}
