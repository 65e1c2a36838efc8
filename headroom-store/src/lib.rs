// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Headroom Store
//!
//! Settings persistence for Headroom.
//!
//! This crate provides:
//!
//! - **SettingsStore**: User settings with persistence, change notification
//!   and a [`CredentialStore`](headroom_core::CredentialStore) implementation
//!   the poller reads from and writes refreshed tokens back to
//! - **Claude Code import**: OAuth tokens from `~/.claude/.credentials.json`
//! - **Persistence**: Atomic, owner-only JSON file I/O
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use headroom_store::SettingsStore;
//!
//! let store = Arc::new(SettingsStore::load_default().await);
//! store.set_poll_interval(120).await;
//! store.save().await?;
//!
//! let poller = headroom_fetch::UsagePoller::new(store, transport);
//! ```

pub mod claude_code;
pub mod error;
pub mod persistence;
pub mod settings_store;

pub use claude_code::{default_credentials_path, load_claude_code_credentials, parse_credentials};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_settings_path, load_json, load_json_or_default, save_json,
};
pub use settings_store::{API_KEY_ENV, ApiKeySource, Settings, SettingsStore};
