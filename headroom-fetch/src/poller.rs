//! Timer-driven polling with a bounded refresh-and-retry.
//!
//! Each tick reads settings once, probes, and at most once refreshes an
//! OAuth token and retries. The tick is written as an explicit state
//! machine so the retry bound is visible:
//!
//! ```text
//! Probing ──AuthInvalid──▶ NeedsRefresh ──ok──▶ Probing(refreshed) ──▶ Done
//!    │                          │
//!    └────────other────────▶ Done ◀──refresh error
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use headroom_core::{
    Credential, CredentialStore, MIN_POLL_INTERVAL_SECS, OAuthTokens, PollError, PollResult,
    PollSettings, Renderer, ViewState, map_view_state,
};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::http::Transport;
use crate::oauth::TokenRefresher;
use crate::probe::UsageProbe;

/// Delay before the first tick.
pub const WARMUP_DELAY: Duration = Duration::from_secs(1);

/// Interval actually used for a requested interval.
pub fn effective_interval(requested_secs: u64) -> Duration {
    Duration::from_secs(requested_secs.max(MIN_POLL_INTERVAL_SECS))
}

// ============================================================================
// Tick State Machine
// ============================================================================

#[derive(Debug)]
enum TickState {
    Probing {
        credential: Credential,
        refreshed: bool,
    },
    NeedsRefresh {
        tokens: OAuthTokens,
    },
    Done(PollResult),
}

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The poll outcome.
    pub result: PollResult,
    /// What the renderer should draw.
    pub view: ViewState,
    /// Delay until the next tick.
    pub next_interval: Duration,
}

// ============================================================================
// Usage Poller
// ============================================================================

/// Orchestrates probe and refresher against a credential store.
#[derive(Clone)]
pub struct UsagePoller {
    store: Arc<dyn CredentialStore>,
    probe: UsageProbe,
    refresher: TokenRefresher,
}

impl UsagePoller {
    /// Creates a poller using one transport for both the API and the token
    /// endpoint.
    pub fn new(store: Arc<dyn CredentialStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            probe: UsageProbe::new(Arc::clone(&transport)),
            refresher: TokenRefresher::new(transport),
        }
    }

    /// Creates a poller from preconfigured parts.
    pub fn with_parts(
        store: Arc<dyn CredentialStore>,
        probe: UsageProbe,
        refresher: TokenRefresher,
    ) -> Self {
        Self {
            store,
            probe,
            refresher,
        }
    }

    /// Runs one tick now: read settings, poll, map.
    pub async fn tick(&self) -> TickOutcome {
        self.tick_at(Utc::now()).await
    }

    /// Runs one tick as of `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickOutcome {
        let settings = self.store.snapshot().await;
        let result = self.poll(&settings, now.timestamp()).await;
        let view = map_view_state(&result, &settings.thresholds, now);
        TickOutcome {
            result,
            view,
            next_interval: effective_interval(settings.poll_interval_secs),
        }
    }

    /// Produces exactly one poll result for the given settings.
    #[instrument(skip_all, fields(mode = %settings.auth_mode))]
    pub async fn poll(&self, settings: &PollSettings, now: i64) -> PollResult {
        let Some(credential) = settings.credential.clone() else {
            debug!("No credential configured");
            return PollResult::Error(PollError::NoCredentials(settings.auth_mode));
        };

        let mut state = match credential {
            Credential::OAuth(tokens)
                if tokens.is_expired_at(now) && tokens.refresh_token().is_some() =>
            {
                info!(
                    expires_at = tokens.expires_at,
                    "Access token expired, refreshing before probe"
                );
                TickState::NeedsRefresh { tokens }
            }
            credential => TickState::Probing {
                credential,
                refreshed: false,
            },
        };

        loop {
            state = match state {
                TickState::Probing {
                    credential,
                    refreshed,
                } => self.step_probe(credential, refreshed, settings).await,
                TickState::NeedsRefresh { tokens } => self.step_refresh(&tokens).await,
                TickState::Done(result) => return result,
            };
        }
    }

    async fn step_probe(
        &self,
        credential: Credential,
        refreshed: bool,
        settings: &PollSettings,
    ) -> TickState {
        match self.probe.probe(&credential, settings.endpoint_mode).await {
            Err(e) if e.is_auth_invalid() && !refreshed => match credential {
                Credential::OAuth(tokens) if tokens.refresh_token().is_some() => {
                    info!("Access token rejected, refreshing");
                    TickState::NeedsRefresh { tokens }
                }
                Credential::OAuth(_) => {
                    warn!("Access token rejected and no refresh token stored");
                    TickState::Done(PollResult::Error(PollError::AuthExpiredNoRefresh))
                }
                Credential::ApiKey(_) => TickState::Done(PollResult::Error(e)),
            },
            outcome => TickState::Done(outcome.into()),
        }
    }

    async fn step_refresh(&self, tokens: &OAuthTokens) -> TickState {
        let Some(refresh_token) = tokens.refresh_token() else {
            return TickState::Done(PollResult::Error(PollError::AuthExpiredNoRefresh));
        };

        match self.refresher.refresh(refresh_token).await {
            Ok(new_tokens) => {
                if let Err(e) = self
                    .store
                    .set_credential(Credential::OAuth(new_tokens.clone()))
                    .await
                {
                    warn!(error = %e, "Failed to write back refreshed credential");
                }
                TickState::Probing {
                    credential: Credential::OAuth(new_tokens),
                    refreshed: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                TickState::Done(PollResult::Error(e.into()))
            }
        }
    }

    /// Starts the timer loop on the current runtime.
    ///
    /// The first tick fires after [`WARMUP_DELAY`]; later ticks follow the
    /// configured interval, re-read every cycle. Views go to `views`; the
    /// loop exits when the receiver is dropped or the handle is stopped.
    pub fn spawn(self, views: mpsc::Sender<ViewState>) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(self.run(views, shutdown_rx, Arc::clone(&refresh)));
        PollerHandle {
            shutdown: shutdown_tx,
            refresh,
            task,
        }
    }

    async fn run(
        self,
        views: mpsc::Sender<ViewState>,
        mut shutdown: watch::Receiver<bool>,
        refresh: Arc<Notify>,
    ) {
        let mut delay = WARMUP_DELAY;
        info!("Poller started");

        loop {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = refresh.notified() => debug!("Refresh requested"),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                break;
            }

            // A stop request during the tick is honored after it completes.
            let outcome = self.tick().await;
            delay = outcome.next_interval;
            tokio::select! {
                sent = views.send(outcome.view) => {
                    if sent.is_err() {
                        debug!("View receiver dropped");
                        break;
                    }
                }
                _ = shutdown.wait_for(|stop| *stop) => {
                    debug!("Stopped while the view channel was full");
                    break;
                }
            }
        }

        info!("Poller stopped");
    }
}

impl std::fmt::Debug for UsagePoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsagePoller")
            .field("probe", &self.probe)
            .field("refresher", &self.refresher)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Controls a spawned poller.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Requests an immediate tick. Requests made while a tick is running
    /// collapse into one follow-up tick.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Cancels the pending timer and waits for any in-flight tick.
    ///
    /// A view still waiting for channel space is dropped.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Feeds views from a poller into a renderer until the channel closes.
pub async fn run_renderer<R: Renderer + ?Sized>(
    mut views: mpsc::Receiver<ViewState>,
    renderer: &mut R,
) {
    while let Some(view) = views.recv().await {
        renderer.on_view_state(&view);
    }
}

// ============================================================================
// Tests
// ============================================================================
