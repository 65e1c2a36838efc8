//! Configuration-facing types.
//!
//! These are the values the settings surface owns and the poller reads
//! once per tick:
//! - [`AuthMode`] - Which credential family is active
//! - [`EndpointMode`] - Which probe endpoints API-key mode may use
//! - [`Thresholds`] - Color/flash thresholds in percent remaining
//! - [`Credential`] / [`OAuthTokens`] - The secret material itself

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Seconds before the recorded expiry at which a token counts as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Lower bound on the poll interval, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

// ============================================================================
// Auth Mode
// ============================================================================

/// Which credential family is used to probe the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Claude.ai subscription via OAuth bearer token.
    #[default]
    #[serde(rename = "oauth")]
    OAuth,
    /// Classic console API key.
    ApiKey,
}

impl AuthMode {
    /// Returns the display name for this mode.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OAuth => "OAuth",
            Self::ApiKey => "API key",
        }
    }

    /// Name of the credential this mode needs, for "not set" messages.
    pub fn credential_label(&self) -> &'static str {
        match self {
            Self::OAuth => "OAuth token",
            Self::ApiKey => "API key",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth => write!(f, "oauth"),
            Self::ApiKey => write!(f, "api_key"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "oauth" => Ok(Self::OAuth),
            "api_key" | "apikey" | "key" => Ok(Self::ApiKey),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown auth mode '{other}' (expected oauth or api_key)"
            ))),
        }
    }
}

// ============================================================================
// Endpoint Mode
// ============================================================================

/// Which endpoints API-key mode probes, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndpointMode {
    /// Try count-tokens first, then fall through to messages.
    #[default]
    Both,
    /// Only the count-tokens endpoint.
    CountTokens,
    /// Only the one-token messages endpoint.
    Messages,
}

impl EndpointMode {
    /// Whether the count-tokens call is attempted.
    pub fn uses_count_tokens(&self) -> bool {
        matches!(self, Self::Both | Self::CountTokens)
    }

    /// Whether the messages call is attempted.
    pub fn uses_messages(&self) -> bool {
        matches!(self, Self::Both | Self::Messages)
    }
}

impl fmt::Display for EndpointMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::CountTokens => write!(f, "count_tokens"),
            Self::Messages => write!(f, "messages"),
        }
    }
}

impl FromStr for EndpointMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "both" => Ok(Self::Both),
            "count_tokens" => Ok(Self::CountTokens),
            "messages" => Ok(Self::Messages),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown endpoint mode '{other}' (expected both, count_tokens or messages)"
            ))),
        }
    }
}

// ============================================================================
// Thresholds
// ============================================================================

/// Severity thresholds, each expressed as percent *remaining*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// At or below this remaining percentage a bar turns yellow.
    pub yellow_pct: u8,
    /// At or below this remaining percentage a bar turns red and flashes slowly.
    pub red_pct: u8,
    /// At or below this remaining percentage the flash becomes fast.
    pub critical_pct: u8,
}

impl Thresholds {
    /// Creates thresholds, clamping each value into `[0, 100]`.
    pub fn new(yellow_pct: i64, red_pct: i64, critical_pct: i64) -> Self {
        Self {
            yellow_pct: clamp_pct(yellow_pct),
            red_pct: clamp_pct(red_pct),
            critical_pct: clamp_pct(critical_pct),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            yellow_pct: 25,
            red_pct: 5,
            critical_pct: 3,
        }
    }
}

/// Clamps an arbitrary integer into a percentage.
pub fn clamp_pct(value: i64) -> u8 {
    // Lossless after the clamp.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        value.clamp(0, 100) as u8
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// OAuth token triple. Always read and written as one unit.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Bearer token sent to the API.
    pub access_token: String,
    /// Token used to mint a new access token, if the server issued one.
    pub refresh_token: Option<String>,
    /// Expiry as epoch seconds; `0` means unknown.
    pub expires_at: i64,
}

impl OAuthTokens {
    /// Creates a token triple. Empty refresh tokens are stored as `None`.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        }
    }

    /// Returns the refresh token when one is stored.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether this token should be treated as expired at `now` (epoch seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        is_token_expired(self.expires_at, now)
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token().is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Expiry check with a five minute safety buffer.
///
/// An unknown expiry (`expires_at <= 0`) counts as expired.
pub fn is_token_expired(expires_at: i64, now: i64) -> bool {
    if expires_at <= 0 {
        return true;
    }
    now >= expires_at - EXPIRY_BUFFER_SECS
}

/// Secret material for the active auth mode.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Opaque console API key.
    ApiKey(String),
    /// OAuth token triple.
    OAuth(OAuthTokens),
}

impl Credential {
    /// The auth mode this credential belongs to.
    pub fn auth_mode(&self) -> AuthMode {
        match self {
            Self::ApiKey(_) => AuthMode::ApiKey,
            Self::OAuth(_) => AuthMode::OAuth,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::OAuth(tokens) => f.debug_tuple("OAuth").field(tokens).finish(),
        }
    }
}

// ============================================================================
// Poll Settings
// ============================================================================

/// Everything one poll tick needs, captured in a single read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Active auth mode.
    pub auth_mode: AuthMode,
    /// Credential for `auth_mode`, or `None` when not configured.
    pub credential: Option<Credential>,
    /// Presentation thresholds.
    pub thresholds: Thresholds,
    /// Requested poll interval in seconds (unclamped).
    pub poll_interval_secs: u64,
    /// Endpoint strategy for API-key mode.
    pub endpoint_mode: EndpointMode,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            auth_mode: AuthMode::default(),
            credential: None,
            thresholds: Thresholds::default(),
            poll_interval_secs: 60,
            endpoint_mode: EndpointMode::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
