//! CLI command implementations.

pub mod config;
pub mod login;
pub mod usage;
pub mod watch;

use headroom_store::SettingsStore;

use crate::Cli;

/// Loads the settings store named by `--settings`, or the default one.
pub async fn open_store(cli: &Cli) -> SettingsStore {
    match &cli.settings {
        Some(path) => SettingsStore::load(path.clone()).await,
        None => SettingsStore::load_default().await,
    }
}
