//! In-memory doubles for the transport and the credential store.
//!
//! Compiled for unit tests and behind the `test-util` feature so that
//! downstream crates and integration tests can drive the engine without a
//! network or a settings file.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use headroom_core::{CoreError, Credential, CredentialStore, PollSettings};
use tokio::sync::RwLock;

use crate::error::HttpError;
use crate::http::{JsonRequest, RawResponse, Transport};

// ============================================================================
// Scripted Transport
// ============================================================================

/// Replays queued outcomes in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, HttpError>>>,
    requests: Mutex<Vec<JsonRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    #[must_use]
    pub fn respond(self, response: RawResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queues a connection failure.
    #[must_use]
    pub fn fail_network(self) -> Self {
        self.push(Err(HttpError::Network("connection refused".to_string())));
        self
    }

    /// Queues a timeout.
    #[must_use]
    pub fn fail_timeout(self) -> Self {
        self.push(Err(HttpError::Timeout));
        self
    }

    /// Queues an outcome on a shared transport.
    pub fn push(&self, outcome: Result<RawResponse, HttpError>) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<JsonRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// URLs of every request sent so far.
    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Number of requests sent.
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of requests whose URL contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.urls().iter().filter(|u| u.contains(needle)).count()
    }

    /// Outcomes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, request: &JsonRequest) -> Result<RawResponse, HttpError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Network("script exhausted".to_string())))
    }
}

// ============================================================================
// Memory Store
// ============================================================================

/// A [`CredentialStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: RwLock<PollSettings>,
    writes: Mutex<Vec<Credential>>,
    fail_writes: bool,
}

impl MemoryStore {
    /// Creates a store holding the given settings.
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
            writes: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    /// Makes every `set_credential` call fail.
    #[must_use]
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Replaces the settings, as a settings surface would.
    pub async fn replace(&self, settings: PollSettings) {
        *self.settings.write().await = settings;
    }

    /// Every credential written back so far.
    pub fn writes(&self) -> Vec<Credential> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn snapshot(&self) -> PollSettings {
        self.settings.read().await.clone()
    }

    async fn set_credential(&self, credential: Credential) -> Result<(), CoreError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credential.clone());
        if self.fail_writes {
            return Err(CoreError::Storage("read-only store".to_string()));
        }
        let mut settings = self.settings.write().await;
        settings.auth_mode = credential.auth_mode();
        settings.credential = Some(credential);
        Ok(())
    }
}
