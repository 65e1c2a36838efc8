//! HTTP transport with tracing, fixed timeouts, and a domain allowlist.
//!
//! Everything that talks to the network goes through the [`Transport`]
//! trait. [`HttpClient`] is the reqwest-backed implementation; tests swap
//! in an in-memory one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;

/// Connect and read timeout, each.
pub const TIMEOUT_SECS: u64 = 15;

/// Hosts the engine is allowed to contact.
pub const ANTHROPIC_DOMAINS: &[&str] = &["api.anthropic.com", "console.anthropic.com"];

/// User agent string for Headroom.
const USER_AGENT: &str = concat!("Headroom/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request / Response
// ============================================================================

/// A JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRequest {
    /// Absolute URL.
    pub url: String,
    /// Extra headers, in order.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: serde_json::Value,
}

impl JsonRequest {
    /// Creates a request with no extra headers.
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Looks up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully-read response.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Parses the body as JSON, if it is JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Sends a JSON POST and returns the response, whatever its status.
///
/// Only transport failures are errors; status interpretation belongs to
/// the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request.
    async fn post_json(&self, request: &JsonRequest) -> Result<RawResponse, HttpError>;
}

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    allowed_domains: Option<Vec<String>>,
}

impl HttpClient {
    /// Creates a client with the fixed timeouts and no domain restriction.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This only happens when
    /// the TLS backend cannot initialize, which leaves no way to talk to
    /// the API at all.
    pub fn new() -> Self {
        let timeout = Duration::from_secs(TIMEOUT_SECS);
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to create HTTP client: {e}. \
                    This usually indicates a broken TLS configuration."
                )
            });

        Self {
            inner: client,
            allowed_domains: None,
        }
    }

    /// Creates a client restricted to the given domains (and subdomains).
    pub fn with_allowed_domains(domains: Vec<String>) -> Self {
        let mut client = Self::new();
        client.allowed_domains = Some(domains);
        client
    }

    /// Creates a client restricted to the Anthropic API and console hosts.
    pub fn for_anthropic() -> Self {
        Self::with_allowed_domains(ANTHROPIC_DOMAINS.iter().map(ToString::to_string).collect())
    }

    fn is_domain_allowed(&self, url: &str) -> Result<(), HttpError> {
        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(e.to_string()))?;

        let Some(ref allowed) = self.allowed_domains else {
            return Ok(());
        };

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl("No host in URL".to_string()))?;

        let allowed = allowed
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")));

        if allowed {
            Ok(())
        } else {
            Err(HttpError::DomainNotAllowed(host.to_string()))
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn post_json(&self, request: &JsonRequest) -> Result<RawResponse, HttpError> {
        self.is_domain_allowed(&request.url)?;
        debug!("POST request with JSON");

        let mut builder = self.inner.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.json(&request.body).send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;
        debug!(status, "Response received");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_allowlist() {
        let client = HttpClient::for_anthropic();

        assert!(client.is_domain_allowed("https://api.anthropic.com/v1/messages").is_ok());
        assert!(client
            .is_domain_allowed("https://console.anthropic.com/v1/oauth/token")
            .is_ok());
        assert!(client.is_domain_allowed("https://evil.com/steal").is_err());
        assert!(client.is_domain_allowed("https://anthropic.com.evil.com").is_err());
    }

    #[test]
    fn test_invalid_url_rejected_even_without_allowlist() {
        let client = HttpClient::new();
        assert!(client.is_domain_allowed("https://any.domain.com").is_ok());
        assert!(matches!(
            client.is_domain_allowed("not-a-valid-url"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_builder_headers() {
        let request = JsonRequest::new("https://api.anthropic.com/v1/messages", serde_json::json!({}))
            .header("x-api-key", "k")
            .header("anthropic-version", "2023-06-01");
        assert_eq!(request.header_value("X-API-KEY"), Some("k"));
        assert_eq!(request.header_value("authorization"), None);
    }

    #[test]
    fn test_raw_response_headers() {
        let response = RawResponse::new(200, "{\"a\":1}")
            .with_header("anthropic-ratelimit-tokens-limit", "100")
            .with_header("bad header", "x");
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.json().unwrap()["a"], 1);
    }
}
