//! Fetch error types.

use headroom_core::PollError;
use thiserror::Error;

/// Maximum length of a response-body excerpt carried in errors.
pub const EXCERPT_LIMIT: usize = 200;

// ============================================================================
// HTTP Error
// ============================================================================

/// Transport-level failure. Any HTTP status counts as success here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connection failed or was dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Connect or read timed out.
    #[error("Request timed out")]
    Timeout,

    /// Domain not allowed.
    #[error("Domain not allowed: {0}")]
    DomainNotAllowed(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<HttpError> for PollError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => PollError::Timeout,
            other => PollError::Network(other.to_string()),
        }
    }
}

// ============================================================================
// OAuth Error
// ============================================================================

/// Error type for PKCE and token endpoint operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// Token endpoint answered with a non-200 status.
    #[error("Token endpoint returned {status}: {body}")]
    Status {
        /// HTTP status.
        status: u16,
        /// Body excerpt (at most 200 chars).
        body: String,
    },

    /// Connection failed.
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("Token request timed out")]
    Timeout,

    /// 200 response that could not be understood.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// The system random source failed.
    #[error("Secure random source unavailable")]
    Random,

    /// Pasted `code#state` carried a different state.
    #[error("Authorization state mismatch; start the login again")]
    StateMismatch,
}

impl From<HttpError> for OAuthError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => Self::Timeout,
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<OAuthError> for PollError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Status { status, body } => PollError::RefreshFailed {
                status,
                excerpt: body,
            },
            OAuthError::Network(msg) => PollError::Network(msg),
            OAuthError::Timeout => PollError::Timeout,
            OAuthError::InvalidResponse(msg) => PollError::RefreshFailed {
                status: 200,
                excerpt: truncate_excerpt(&msg),
            },
            other @ (OAuthError::Random | OAuthError::StateMismatch) => PollError::RefreshFailed {
                status: 0,
                excerpt: other.to_string(),
            },
        }
    }
}

/// Cuts text to at most [`EXCERPT_LIMIT`] characters on a char boundary.
pub fn truncate_excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}
