//! Poll outcomes and the error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::settings::AuthMode;
use super::usage::{StandardUsage, UnifiedUsage, UsageSnapshot};

// ============================================================================
// Error Kind
// ============================================================================

/// Copyable discriminant of [`PollError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No credential configured for the active mode.
    NoCredentials,
    /// Connection could not be made or was dropped.
    NetworkError,
    /// Request did not complete within the timeout.
    Timeout,
    /// HTTP 401.
    AuthInvalid,
    /// HTTP 403.
    AuthForbidden,
    /// HTTP 401 in OAuth mode with nothing to refresh with.
    AuthExpiredNoRefresh,
    /// HTTP 400 mentioning billing or credits.
    NoCredits,
    /// Any other HTTP 400.
    BadRequest,
    /// HTTP 5xx.
    ServerError,
    /// Any status not otherwise classified.
    UnexpectedStatus,
    /// A successful response without usable rate-limit headers.
    NoUsageHeaders,
    /// The token endpoint rejected a refresh.
    RefreshFailed,
}

// ============================================================================
// Poll Error
// ============================================================================

/// A failed poll. `Display` is the user-facing one-line message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Nothing to authenticate with.
    #[error("No {} configured", .0.credential_label())]
    NoCredentials(AuthMode),

    /// Transport failure; the payload is a diagnostic detail for logs.
    #[error("Network error -- check your connection")]
    Network(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The API rejected the credential.
    #[error("{}", auth_invalid_message(.0))]
    AuthInvalid(AuthMode),

    /// The credential lacks permission.
    #[error("{}", auth_forbidden_message(.0))]
    AuthForbidden(AuthMode),

    /// Token rejected and no refresh token stored.
    #[error("OAuth token expired -- sign in again")]
    AuthExpiredNoRefresh,

    /// Account has no credit balance.
    #[error("No API credits -- check Plans & Billing")]
    NoCredits,

    /// Other 400, carrying the server's message excerpt.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 5xx from the API.
    #[error("Anthropic server error ({0})")]
    ServerError(u16),

    /// Unclassified status.
    #[error("Unexpected response ({status})")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Body excerpt for diagnostics.
        excerpt: String,
    },

    /// No rate-limit headers present.
    #[error("No rate-limit headers in response")]
    NoUsageHeaders,

    /// Token endpoint answered with a non-200 status.
    #[error("Token refresh failed ({status})")]
    RefreshFailed {
        /// HTTP status from the token endpoint.
        status: u16,
        /// Body excerpt (at most 200 chars).
        excerpt: String,
    },
}

fn auth_invalid_message(mode: &AuthMode) -> &'static str {
    match mode {
        AuthMode::ApiKey => "Invalid API key",
        AuthMode::OAuth => "OAuth token invalid or expired",
    }
}

fn auth_forbidden_message(mode: &AuthMode) -> &'static str {
    match mode {
        AuthMode::ApiKey => "API key lacks permission",
        AuthMode::OAuth => "OAuth token lacks permission",
    }
}

impl PollError {
    /// Returns the discriminant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCredentials(_) => ErrorKind::NoCredentials,
            Self::Network(_) => ErrorKind::NetworkError,
            Self::Timeout => ErrorKind::Timeout,
            Self::AuthInvalid(_) => ErrorKind::AuthInvalid,
            Self::AuthForbidden(_) => ErrorKind::AuthForbidden,
            Self::AuthExpiredNoRefresh => ErrorKind::AuthExpiredNoRefresh,
            Self::NoCredits => ErrorKind::NoCredits,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::ServerError(_) => ErrorKind::ServerError,
            Self::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Self::NoUsageHeaders => ErrorKind::NoUsageHeaders,
            Self::RefreshFailed { .. } => ErrorKind::RefreshFailed,
        }
    }

    /// Whether a token refresh might fix this error.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, Self::AuthInvalid(_))
    }
}

// ============================================================================
// Poll Result
// ============================================================================

/// Exactly one outcome per tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    /// Classic counters.
    Standard(StandardUsage),
    /// Subscription windows.
    Unified(UnifiedUsage),
    /// The tick failed.
    Error(PollError),
}

impl PollResult {
    /// Returns the error, if this is an error result.
    pub fn error(&self) -> Option<&PollError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the tick produced usage data.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error(_))
    }
}

impl From<UsageSnapshot> for PollResult {
    fn from(snapshot: UsageSnapshot) -> Self {
        match snapshot {
            UsageSnapshot::Standard(u) => Self::Standard(u),
            UsageSnapshot::Unified(u) => Self::Unified(u),
        }
    }
}

impl From<PollError> for PollResult {
    fn from(error: PollError) -> Self {
        Self::Error(error)
    }
}

impl From<Result<UsageSnapshot, PollError>> for PollResult {
    fn from(result: Result<UsageSnapshot, PollError>) -> Self {
        match result {
            Ok(snapshot) => snapshot.into(),
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_mode_specific() {
        assert_eq!(PollError::AuthInvalid(AuthMode::ApiKey).to_string(), "Invalid API key");
        assert_eq!(
            PollError::AuthInvalid(AuthMode::OAuth).to_string(),
            "OAuth token invalid or expired"
        );
        assert_eq!(
            PollError::AuthForbidden(AuthMode::OAuth).to_string(),
            "OAuth token lacks permission"
        );
        assert_eq!(
            PollError::NoCredentials(AuthMode::ApiKey).to_string(),
            "No API key configured"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PollError::Timeout.kind(), ErrorKind::Timeout);
        assert_eq!(PollError::Network("reset".into()).kind(), ErrorKind::NetworkError);
        assert_eq!(PollError::ServerError(502).to_string(), "Anthropic server error (502)");
        assert_eq!(
            PollError::BadRequest("max_tokens".into()).to_string(),
            "Bad request: max_tokens"
        );
        assert!(PollError::AuthInvalid(AuthMode::OAuth).is_auth_invalid());
        assert!(!PollError::AuthForbidden(AuthMode::OAuth).is_auth_invalid());
    }

    #[test]
    fn test_result_from_snapshot() {
        let usage = UnifiedUsage {
            utilization_5h: 0.1,
            utilization_7d: 0.0,
            utilization_7d_sonnet: 0.0,
            reset_5h: 0,
            reset_7d: 0,
            reset_7d_sonnet: 0,
        };
        let result: PollResult = Ok(UsageSnapshot::Unified(usage.clone())).into();
        assert_eq!(result, PollResult::Unified(usage));
        assert!(result.is_success());

        let result: PollResult = Err(PollError::NoUsageHeaders).into();
        assert_eq!(result.error(), Some(&PollError::NoUsageHeaders));
    }
}
