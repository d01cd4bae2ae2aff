//! HTTP revalidation probe.
//!
//! Sends `GET {api_base}/repos/{owner}/{repository}` with `If-None-Match`
//! when a token is on file and maps the status to a [`ProbeOutcome`].

use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::time::Duration;

use super::{ProbeOutcome, RevalidationProbe};
use crate::cache::ValidatorToken;
use crate::error::{CacheError, Result};
use crate::source::{SourceId, DEFAULT_API_BASE};

/// How non-304 statuses are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Anything other than 304 means the resource changed.
    #[default]
    Coarse,
    /// 401, 403, 408, 429 and 5xx mean upstream is unavailable; the cached
    /// output is left alone and the caller gets an error instead of a
    /// re-render request.
    Strict,
}

impl StatusPolicy {
    fn is_unavailable(self, status: StatusCode) -> bool {
        match self {
            Self::Coarse => false,
            Self::Strict => {
                status.is_server_error()
                    || matches!(
                        status,
                        StatusCode::UNAUTHORIZED
                            | StatusCode::FORBIDDEN
                            | StatusCode::REQUEST_TIMEOUT
                            | StatusCode::TOO_MANY_REQUESTS
                    )
            }
        }
    }
}

/// Probes the repository metadata API with conditional requests.
pub struct HttpProbe {
    client: Client,
    api_base: String,
    auth_token: Option<String>,
    policy: StatusPolicy,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe against the public GitHub API with a 30-second timeout.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Start configuring a probe.
    pub fn builder() -> HttpProbeBuilder {
        HttpProbeBuilder::default()
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the status policy.
    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }
}

impl RevalidationProbe for HttpProbe {
    fn probe(&self, source: &SourceId, token: Option<&ValidatorToken>) -> Result<ProbeOutcome> {
        let url = source.api_url(&self.api_base);
        let mut request = self.client.get(&url);

        if let Some(token) = token {
            request = request.header("If-None-Match", token.as_str());
        }
        if let Some(auth) = &self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", auth));
        }

        let response = request.send().map_err(|e| CacheError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;
        let status = response.status();
        tracing::debug!("Probe {} -> {}", url, status);

        // Without a precondition a 304 says nothing; treat it as a fresh answer.
        if status == StatusCode::NOT_MODIFIED && token.is_some() {
            return Ok(ProbeOutcome::NotModified);
        }

        if self.policy.is_unavailable(status) {
            return Ok(ProbeOutcome::Unavailable {
                status: status.as_u16(),
            });
        }

        let token = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(ValidatorToken::new);

        Ok(ProbeOutcome::Changed { token })
    }
}

/// Builder for [`HttpProbe`].
#[derive(Debug, Clone)]
pub struct HttpProbeBuilder {
    api_base: String,
    user_agent: String,
    auth_token: Option<String>,
    policy: StatusPolicy,
    timeout: Duration,
}

impl Default for HttpProbeBuilder {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_agent: "manifest-cache".to_string(),
            auth_token: None,
            policy: StatusPolicy::Coarse,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpProbeBuilder {
    /// Base URL of the metadata API.
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// `User-Agent` sent with every probe.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Bearer token sent as `Authorization`.
    pub fn auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the probe.
    pub fn build(self) -> Result<HttpProbe> {
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(HttpProbe {
            client,
            api_base: self.api_base,
            auth_token: self.auth_token,
            policy: self.policy,
            timeout: self.timeout,
        })
    }
}
