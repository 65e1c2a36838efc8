//! Store error types.

use std::path::PathBuf;

use headroom_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credentials file at the expected location.
    #[error("No credentials found at {}", .0.display())]
    CredentialsNotFound(PathBuf),

    /// A credentials file exists but holds no usable token.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

impl StoreError {
    /// Returns true if the file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Self::CredentialsNotFound(_) => true,
            _ => false,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => CoreError::Serialization(e),
            StoreError::Config(msg) => CoreError::InvalidConfig(msg),
            other => CoreError::Storage(other.to_string()),
        }
    }
}
