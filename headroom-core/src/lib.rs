// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Headroom Core
//!
//! Core types, presentation mapping, and seams for Headroom.
//!
//! This crate has no I/O. It provides:
//!
//! - Domain models (auth modes, credentials, usage snapshots)
//! - The poll error taxonomy
//! - The pure presentation mapper
//! - Trait seams for the settings store and renderers
//!
//! ## Key Types
//!
//! ### Settings
//! - [`AuthMode`] - API key or OAuth
//! - [`Credential`] / [`OAuthTokens`] - Secret material
//! - [`Thresholds`] - Yellow/red/critical percentages
//! - [`PollSettings`] - One consistent read of everything a tick needs
//!
//! ### Usage
//! - [`StandardUsage`] - Classic token/request counters
//! - [`UnifiedUsage`] - Subscription utilization windows
//! - [`PollResult`] / [`PollError`] - Outcome of one tick
//!
//! ### Presentation
//! - [`ViewState`] - Bars or a message
//! - [`map_view_state`] - `(PollResult, Thresholds, now) -> ViewState`

pub mod error;
pub mod models;
pub mod presentation;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Settings
    AuthMode,
    Credential,
    EXPIRY_BUFFER_SECS,
    EndpointMode,
    MIN_POLL_INTERVAL_SECS,
    OAuthTokens,
    PollSettings,
    Thresholds,
    clamp_pct,
    is_token_expired,
    // Usage
    StandardUsage,
    UnifiedUsage,
    UsageSnapshot,
    UsageWindowKind,
    WindowUsage,
    epoch_to_datetime,
    // Poll
    ErrorKind,
    PollError,
    PollResult,
    // View
    BarView,
    ColorZone,
    FlashState,
    ViewState,
};

pub use presentation::{format_countdown, map_view_state};

// Re-export traits
pub use traits::{CredentialStore, Renderer};
