//! Domain models for Headroom.
//!
//! ## Submodules
//!
//! - [`settings`] - Auth mode, endpoint mode, thresholds, credentials
//! - [`usage`] - Standard and unified usage snapshots
//! - [`poll`] - Poll outcomes and the error taxonomy
//! - [`view`] - Bars, zones and flash state for renderers

pub mod poll;
pub mod settings;
pub mod usage;
pub mod view;

pub use poll::{ErrorKind, PollError, PollResult};
pub use settings::{
    AuthMode, Credential, EXPIRY_BUFFER_SECS, EndpointMode, MIN_POLL_INTERVAL_SECS, OAuthTokens,
    PollSettings, Thresholds, clamp_pct, is_token_expired,
};
pub use usage::{
    StandardUsage, UnifiedUsage, UsageSnapshot, UsageWindowKind, WindowUsage, epoch_to_datetime,
};
pub use view::{BarView, ColorZone, FlashState, ViewState};

#[cfg(test)]
mod serde_tests;
