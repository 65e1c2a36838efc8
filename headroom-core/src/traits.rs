//! Seams between the polling engine and its host.
//!
//! The engine owns no storage and draws nothing. A host supplies a
//! [`CredentialStore`] for settings and write-back, and a [`Renderer`]
//! that receives a [`ViewState`] every tick.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::{AuthMode, Credential, EndpointMode, PollSettings, Thresholds, ViewState};

/// Source of settings and sink for refreshed credentials.
///
/// Implementations must make [`snapshot`](CredentialStore::snapshot) and
/// [`set_credential`](CredentialStore::set_credential) atomic with respect
/// to each other, so the OAuth triple is never observed half-written.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads everything a tick needs in one consistent view.
    async fn snapshot(&self) -> PollSettings;

    /// Writes back a credential produced by a refresh or login.
    async fn set_credential(&self, credential: Credential) -> Result<(), CoreError>;

    /// Active auth mode.
    async fn auth_mode(&self) -> AuthMode {
        self.snapshot().await.auth_mode
    }

    /// Credential for the active mode.
    async fn credential(&self) -> Option<Credential> {
        self.snapshot().await.credential
    }

    /// Presentation thresholds.
    async fn thresholds(&self) -> Thresholds {
        self.snapshot().await.thresholds
    }

    /// Requested poll interval in seconds.
    async fn poll_interval_secs(&self) -> u64 {
        self.snapshot().await.poll_interval_secs
    }

    /// Endpoint strategy for API-key mode.
    async fn endpoint_mode(&self) -> EndpointMode {
        self.snapshot().await.endpoint_mode
    }
}

/// Consumer of view state.
pub trait Renderer: Send {
    /// Called once per tick, including error ticks.
    fn on_view_state(&mut self, view: &ViewState);
}
