//! Minimal API calls that elicit rate-limit headers.
//!
//! A probe sends the smallest request the API will answer (one token,
//! one placeholder message) and only looks at the response headers. The
//! body is read solely to build error excerpts.

use std::sync::Arc;

use headroom_core::{AuthMode, Credential, EndpointMode, PollError, UsageSnapshot};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::error::truncate_excerpt;
use crate::headers::parse_usage;
use crate::http::{JsonRequest, RawResponse, Transport};

/// Default API base URL.
pub const API_BASE: &str = "https://api.anthropic.com/v1";

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Beta flag required for OAuth bearer tokens.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

/// Cheapest model, used in API-key mode.
pub const API_KEY_PROBE_MODEL: &str = "claude-haiku-4-5-20251001";

/// Sonnet-class model used in OAuth mode. The 7-day Sonnet header is only
/// returned when a Sonnet-family model is probed.
pub const OAUTH_PROBE_MODEL: &str = "claude-sonnet-4-6";

// ============================================================================
// Endpoints
// ============================================================================

/// The two endpoints a probe can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeEndpoint {
    /// `POST /messages/count_tokens`.
    CountTokens,
    /// `POST /messages` with `max_tokens = 1`.
    Messages,
}

impl ProbeEndpoint {
    /// Path relative to the API base.
    pub fn path(&self) -> &'static str {
        match self {
            Self::CountTokens => "/messages/count_tokens",
            Self::Messages => "/messages",
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            Self::CountTokens => "x",
            Self::Messages => ".",
        }
    }

    /// Endpoints to try, in order, for an endpoint mode.
    pub fn sequence(mode: EndpointMode) -> Vec<Self> {
        let mut endpoints = Vec::with_capacity(2);
        if mode.uses_count_tokens() {
            endpoints.push(Self::CountTokens);
        }
        if mode.uses_messages() {
            endpoints.push(Self::Messages);
        }
        endpoints
    }
}

// ============================================================================
// Usage Probe
// ============================================================================

/// Issues probe requests and classifies the responses.
#[derive(Clone)]
pub struct UsageProbe {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl UsageProbe {
    /// Creates a probe against the production API.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: API_BASE.to_string(),
        }
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Produces one usage snapshot or one error for the given credential.
    #[instrument(skip(self, credential), fields(mode = %credential.auth_mode()))]
    pub async fn probe(
        &self,
        credential: &Credential,
        endpoint_mode: EndpointMode,
    ) -> Result<UsageSnapshot, PollError> {
        match credential {
            Credential::ApiKey(key) => self.probe_api_key(key, endpoint_mode).await,
            Credential::OAuth(tokens) => self.probe_oauth(&tokens.access_token).await,
        }
    }

    async fn probe_api_key(
        &self,
        api_key: &str,
        endpoint_mode: EndpointMode,
    ) -> Result<UsageSnapshot, PollError> {
        let mut first_error: Option<PollError> = None;

        for endpoint in ProbeEndpoint::sequence(endpoint_mode) {
            let request = self.build_request(endpoint, AuthMode::ApiKey, api_key);
            let outcome = match self.send(&request, AuthMode::ApiKey).await {
                Ok(response) => parse_usage(response.status, &response.headers),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(snapshot) => {
                    debug!(endpoint = endpoint.path(), "Got usage headers");
                    return Ok(snapshot);
                }
                // A headerless 200/429 only matters when nothing else went wrong.
                Err(PollError::NoUsageHeaders) => {
                    debug!(endpoint = endpoint.path(), "No usage headers, trying next");
                }
                Err(e) => {
                    warn!(endpoint = endpoint.path(), error = %e, "Probe attempt failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or(PollError::NoUsageHeaders))
    }

    async fn probe_oauth(&self, access_token: &str) -> Result<UsageSnapshot, PollError> {
        let request = self.build_request(ProbeEndpoint::Messages, AuthMode::OAuth, access_token);
        let response = self.send(&request, AuthMode::OAuth).await?;
        parse_usage(response.status, &response.headers)
    }

    /// Builds the fixed minimal request for an endpoint.
    pub fn build_request(
        &self,
        endpoint: ProbeEndpoint,
        mode: AuthMode,
        secret: &str,
    ) -> JsonRequest {
        let model = match mode {
            AuthMode::ApiKey => API_KEY_PROBE_MODEL,
            AuthMode::OAuth => OAUTH_PROBE_MODEL,
        };
        let body = json!({
            "model": model,
            "max_tokens": 1,
            "messages": [{"role": "user", "content": endpoint.placeholder()}],
        });

        let request = JsonRequest::new(format!("{}{}", self.base_url, endpoint.path()), body);
        let request = match mode {
            AuthMode::ApiKey => request.header("x-api-key", secret),
            AuthMode::OAuth => request
                .header("authorization", format!("Bearer {secret}"))
                .header("anthropic-beta", OAUTH_BETA),
        };
        request
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    async fn send(&self, request: &JsonRequest, mode: AuthMode) -> Result<RawResponse, PollError> {
        let response = self.transport.post_json(request).await?;
        debug!(url = %request.url, status = response.status, "Probe response");
        classify_status(&response, mode)?;
        Ok(response)
    }
}

impl std::fmt::Debug for UsageProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageProbe")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Status Classification
// ============================================================================

/// Maps an HTTP status to `Ok` (read headers) or a poll error.
pub fn classify_status(response: &RawResponse, mode: AuthMode) -> Result<(), PollError> {
    match response.status {
        200 | 429 => Ok(()),
        401 => Err(PollError::AuthInvalid(mode)),
        403 => Err(PollError::AuthForbidden(mode)),
        400 => {
            let excerpt = error_excerpt(response);
            let lower = excerpt.to_lowercase();
            if lower.contains("credit") || lower.contains("billing") {
                Err(PollError::NoCredits)
            } else if excerpt.is_empty() {
                Err(PollError::BadRequest("no details".to_string()))
            } else {
                Err(PollError::BadRequest(excerpt))
            }
        }
        status @ 500..=599 => Err(PollError::ServerError(status)),
        status => Err(PollError::UnexpectedStatus {
            status,
            excerpt: error_excerpt(response),
        }),
    }
}

/// `error.message` from a JSON error body, else the first 200 chars.
pub fn error_excerpt(response: &RawResponse) -> String {
    let message = response.json().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(ToString::to_string)
    });
    truncate_excerpt(message.as_deref().unwrap_or(response.body.trim()))
}

// ============================================================================
// Tests
// ============================================================================
