//! OAuth PKCE and token endpoint.
//!
//! Covers the protocol only: generating the verifier/challenge pair,
//! building the authorization URL, and the two token-endpoint grants.
//! Nothing here persists anything; callers write returned tokens back
//! through their own store.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use headroom_core::OAuthTokens;
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::{OAuthError, truncate_excerpt};
use crate::http::{JsonRequest, RawResponse, Transport};

/// Public client id of the Claude.ai OAuth application.
pub const CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";
/// Authorization endpoint.
pub const AUTHORIZE_URL: &str = "https://claude.ai/oauth/authorize";
/// Token endpoint for both grants.
pub const TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";
/// Redirect URI that displays the code for pasting.
pub const REDIRECT_URI: &str = "https://console.anthropic.com/oauth/code/callback";
/// Requested scopes.
pub const SCOPES: &str = "user:inference user:profile";
/// Lifetime assumed when the token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3_600;
/// Upper bound applied to a server-supplied `expires_in`.
pub const MAX_EXPIRES_IN_SECS: i64 = 4_294_967_295;

const VERIFIER_BYTES: usize = 48;
const STATE_BYTES: usize = 16;

// ============================================================================
// PKCE
// ============================================================================

/// A verifier/challenge pair plus a CSRF state token.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    /// Secret kept locally until the code exchange.
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent in the authorization URL.
    pub challenge: String,
    /// Random state echoed back with the code.
    pub state: String,
}

impl PkceChallenge {
    /// Generates a fresh challenge from the system CSPRNG.
    pub fn generate() -> Result<Self, OAuthError> {
        Self::generate_with(&SystemRandom::new())
    }

    /// Generates a challenge from the given secure random source.
    pub fn generate_with(rng: &dyn SecureRandom) -> Result<Self, OAuthError> {
        let verifier = random_token(rng, VERIFIER_BYTES)?;
        let state = random_token(rng, STATE_BYTES)?;
        Ok(Self {
            challenge: challenge_for(&verifier),
            verifier,
            state,
        })
    }

    /// Authorization URL for this challenge.
    pub fn authorization_url(&self) -> String {
        authorization_url(&self.challenge, &self.state)
    }
}

impl fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .field("state", &self.state)
            .finish()
    }
}

fn random_token(rng: &dyn SecureRandom, len: usize) -> Result<String, OAuthError> {
    let mut bytes = vec![0_u8; len];
    rng.fill(&mut bytes).map_err(|_| OAuthError::Random)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 code challenge for a verifier.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(digest(&SHA256, verifier.as_bytes()).as_ref())
}

/// Builds the authorization URL. Pure; no I/O.
pub fn authorization_url(challenge: &str, state: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("client_id", CLIENT_ID)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("scope", SCOPES)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("state", state)
        .finish();
    format!("{AUTHORIZE_URL}?{query}")
}

/// Splits a pasted `code#state` into its parts.
pub fn split_pasted_code(input: &str) -> (&str, Option<&str>) {
    let input = input.trim();
    match input.split_once('#') {
        Some((code, state)) if !state.is_empty() => (code, Some(state)),
        Some((code, _)) => (code, None),
        None => (input, None),
    }
}

/// Extracts the code from pasted text, checking any embedded state.
pub fn verify_pasted_code<'a>(
    input: &'a str,
    expected_state: &str,
) -> Result<&'a str, OAuthError> {
    let (code, state) = split_pasted_code(input);
    match state {
        Some(state) if state != expected_state => Err(OAuthError::StateMismatch),
        _ => Ok(code),
    }
}

// ============================================================================
// Token Refresher
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Talks to the token endpoint.
#[derive(Clone)]
pub struct TokenRefresher {
    transport: Arc<dyn Transport>,
    token_url: String,
}

impl TokenRefresher {
    /// Creates a refresher against the production token endpoint.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            token_url: TOKEN_URL.to_string(),
        }
    }

    /// Overrides the token endpoint URL.
    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Exchanges an authorization code for tokens.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
    ) -> Result<OAuthTokens, OAuthError> {
        let body = json!({
            "grant_type": "authorization_code",
            "client_id": CLIENT_ID,
            "code": code,
            "redirect_uri": REDIRECT_URI,
            "code_verifier": verifier,
        });
        let tokens = self.post_grant(body, None).await?;
        info!(expires_at = tokens.expires_at, "Token exchange successful");
        Ok(tokens)
    }

    /// Mints a new access token. The old refresh token is kept when the
    /// response does not carry a new one.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens, OAuthError> {
        let body = json!({
            "grant_type": "refresh_token",
            "client_id": CLIENT_ID,
            "refresh_token": refresh_token,
        });
        let tokens = self.post_grant(body, Some(refresh_token)).await?;
        info!(expires_at = tokens.expires_at, "Token refresh successful");
        Ok(tokens)
    }

    async fn post_grant(
        &self,
        body: serde_json::Value,
        previous_refresh: Option<&str>,
    ) -> Result<OAuthTokens, OAuthError> {
        let request =
            JsonRequest::new(&self.token_url, body).header("content-type", "application/json");
        let response = self.transport.post_json(&request).await?;
        debug!(status = response.status, "Token endpoint response");

        if response.status != 200 {
            let body = token_error_excerpt(&response);
            warn!(status = response.status, "Token endpoint rejected request");
            return Err(OAuthError::Status {
                status: response.status,
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| OAuthError::InvalidResponse(e.to_string()))?;
        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::InvalidResponse("missing access_token".to_string()))?;

        let refresh_token = parsed
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| previous_refresh.map(ToString::to_string));
        let expires_in = parsed
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .clamp(0, MAX_EXPIRES_IN_SECS);

        Ok(OAuthTokens::new(
            access_token,
            refresh_token,
            Utc::now().timestamp().saturating_add(expires_in),
        ))
    }
}

impl fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("token_url", &self.token_url)
            .finish_non_exhaustive()
    }
}

/// `error_description` from the body, else its first 200 chars.
fn token_error_excerpt(response: &RawResponse) -> String {
    response
        .json()
        .and_then(|v| {
            v.get("error_description")
                .and_then(|d| d.as_str())
                .map(truncate_excerpt)
        })
        .unwrap_or_else(|| truncate_excerpt(&response.body))
}

// ============================================================================
// Tests
// ============================================================================
