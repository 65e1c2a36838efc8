//! Core error types for Headroom.

use thiserror::Error;

/// Core error type for configuration and credential handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid or unparseable data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential write-back failed.
    #[error("Credential storage failed: {0}")]
    Storage(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
