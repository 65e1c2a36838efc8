//! User settings store.
//!
//! Holds the persisted [`Settings`] behind one lock, exposes them to the
//! poller as a [`CredentialStore`] and notifies subscribers on change.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use headroom_core::{
    AuthMode, CoreError, Credential, CredentialStore, EndpointMode, MIN_POLL_INTERVAL_SECS,
    OAuthTokens, PollSettings, Thresholds, clamp_pct,
};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info};

use crate::claude_code::load_claude_code_credentials;
use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json_or_default, save_json};

/// Environment variable consulted when no API key is stored.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

// ============================================================================
// Settings Types
// ============================================================================

/// Persisted user settings.
///
/// Secrets are stored flat so the file stays hand-editable. Empty strings
/// mean "not set".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active credential family.
    #[serde(deserialize_with = "lenient_enum")]
    pub auth_mode: AuthMode,

    /// Console API key.
    pub api_key: String,

    /// Requested seconds between polls.
    pub poll_interval_seconds: u64,

    /// Remaining percentage at which bars turn yellow.
    pub yellow_threshold_pct: i64,

    /// Remaining percentage at which bars turn red.
    pub red_threshold_pct: i64,

    /// Remaining percentage at which flashing becomes fast.
    pub critical_threshold_pct: i64,

    /// Probe endpoints used in API-key mode.
    #[serde(deserialize_with = "lenient_enum")]
    pub endpoint_mode: EndpointMode,

    /// OAuth bearer token.
    pub oauth_access_token: String,

    /// OAuth refresh token.
    pub oauth_refresh_token: String,

    /// OAuth expiry in epoch seconds, `0` when unknown.
    pub oauth_expires_at: i64,
}

impl Default for Settings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            auth_mode: AuthMode::default(),
            api_key: String::new(),
            poll_interval_seconds: 60,
            yellow_threshold_pct: i64::from(thresholds.yellow_pct),
            red_threshold_pct: i64::from(thresholds.red_pct),
            critical_threshold_pct: i64::from(thresholds.critical_pct),
            endpoint_mode: EndpointMode::default(),
            oauth_access_token: String::new(),
            oauth_refresh_token: String::new(),
            oauth_expires_at: 0,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("auth_mode", &self.auth_mode)
            .field("has_api_key", &!self.api_key.is_empty())
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("thresholds", &self.thresholds())
            .field("endpoint_mode", &self.endpoint_mode)
            .field("has_oauth_token", &self.has_oauth_token())
            .field("oauth_expires_at", &self.oauth_expires_at)
            .finish()
    }
}

/// Reads an enum from its string form, falling back to the default for
/// anything unrecognised instead of rejecting the whole file.
fn lenient_enum<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Where the effective API key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    /// The settings file.
    Settings,
    /// The `ANTHROPIC_API_KEY` environment variable.
    Environment,
}

impl ApiKeySource {
    /// Returns the display name for this source.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Settings => "settings file",
            Self::Environment => API_KEY_ENV,
        }
    }
}

impl Settings {
    /// Thresholds clamped into `[0, 100]`.
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(
            self.yellow_threshold_pct,
            self.red_threshold_pct,
            self.critical_threshold_pct,
        )
    }

    /// Whether an OAuth access token is stored.
    pub fn has_oauth_token(&self) -> bool {
        !self.oauth_access_token.is_empty()
    }

    /// The effective API key and where it came from.
    ///
    /// A stored key wins; otherwise `env_api_key` is used.
    pub fn resolved_api_key<'a>(
        &'a self,
        env_api_key: Option<&'a str>,
    ) -> Option<(&'a str, ApiKeySource)> {
        if !self.api_key.is_empty() {
            return Some((self.api_key.as_str(), ApiKeySource::Settings));
        }
        env_api_key
            .filter(|k| !k.is_empty())
            .map(|k| (k, ApiKeySource::Environment))
    }

    /// The stored OAuth triple, if an access token is present.
    pub fn oauth_tokens(&self) -> Option<OAuthTokens> {
        self.has_oauth_token().then(|| {
            OAuthTokens::new(
                self.oauth_access_token.clone(),
                Some(self.oauth_refresh_token.clone()),
                self.oauth_expires_at,
            )
        })
    }

    /// The credential for the active auth mode.
    pub fn credential(&self, env_api_key: Option<&str>) -> Option<Credential> {
        match self.auth_mode {
            AuthMode::ApiKey => self
                .resolved_api_key(env_api_key)
                .map(|(key, _)| Credential::ApiKey(key.to_string())),
            AuthMode::OAuth => self.oauth_tokens().map(Credential::OAuth),
        }
    }

    /// Everything one poll tick needs.
    pub fn to_poll_settings(&self, env_api_key: Option<&str>) -> PollSettings {
        PollSettings {
            auth_mode: self.auth_mode,
            credential: self.credential(env_api_key),
            thresholds: self.thresholds(),
            poll_interval_secs: self.poll_interval_seconds,
            endpoint_mode: self.endpoint_mode,
        }
    }

    /// Stores a credential and switches to its auth mode.
    ///
    /// The OAuth triple is replaced as a whole.
    pub fn apply_credential(&mut self, credential: Credential) {
        self.auth_mode = credential.auth_mode();
        match credential {
            Credential::ApiKey(key) => self.api_key = key,
            Credential::OAuth(tokens) => {
                self.oauth_refresh_token = tokens.refresh_token().unwrap_or_default().to_string();
                self.oauth_access_token = tokens.access_token;
                self.oauth_expires_at = tokens.expires_at;
            }
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: RwLock<Settings>,
    path: PathBuf,
    env_api_key: Option<String>,
    interval_override: Option<u64>,
    // Held from snapshot to rename so saves land on disk in order.
    save_lock: Mutex<()>,
    notify: watch::Sender<u64>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("path", &self.path)
            .field("has_env_api_key", &self.env_api_key.is_some())
            .finish_non_exhaustive()
    }
}

fn env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
}

impl SettingsStore {
    /// Creates a store with default settings backed by `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    /// Creates a store holding `settings`, backed by `path`.
    pub fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: RwLock::new(settings),
            path,
            env_api_key: env_api_key(),
            interval_override: None,
            save_lock: Mutex::new(()),
            notify,
        }
    }

    /// Overrides the API key otherwise read from the environment.
    #[must_use]
    pub fn with_env_api_key(mut self, key: Option<String>) -> Self {
        self.env_api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Polls at `seconds` for this process only; saves keep the stored value.
    #[must_use]
    pub fn with_interval_override(mut self, seconds: Option<u64>) -> Self {
        self.interval_override = seconds.map(|s| s.max(MIN_POLL_INTERVAL_SECS));
        self
    }

    /// Loads settings from the default path.
    pub async fn load_default() -> Self {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path.
    ///
    /// A missing or unreadable file yields defaults; the next save
    /// replaces it.
    pub async fn load(path: PathBuf) -> Self {
        info!(path = %path.display(), "Loading settings");
        let settings: Settings = load_json_or_default(&path).await;
        debug!(settings = ?settings, "Settings loaded");
        Self::with_settings(path, settings)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change();
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().await;
        let settings = self.get().await;
        save_json(&self.path, &settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|version| *version += 1);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Where the effective API key comes from, if there is one.
    pub async fn api_key_source(&self) -> Option<ApiKeySource> {
        let settings = self.settings.read().await;
        settings
            .resolved_api_key(self.env_api_key.as_deref())
            .map(|(_, source)| source)
    }

    /// Sets the auth mode.
    pub async fn set_auth_mode(&self, mode: AuthMode) {
        self.update(|s| s.auth_mode = mode).await;
    }

    /// Sets the stored API key. An empty key defers to the environment.
    pub async fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.update(|s| s.api_key = key).await;
    }

    /// Sets the poll interval, raised to the minimum if lower.
    pub async fn set_poll_interval(&self, seconds: u64) {
        self.update(|s| s.poll_interval_seconds = seconds.max(MIN_POLL_INTERVAL_SECS))
            .await;
    }

    /// Sets all three thresholds, each clamped into `[0, 100]`.
    pub async fn set_thresholds(&self, yellow: i64, red: i64, critical: i64) {
        self.update(|s| {
            s.yellow_threshold_pct = i64::from(clamp_pct(yellow));
            s.red_threshold_pct = i64::from(clamp_pct(red));
            s.critical_threshold_pct = i64::from(clamp_pct(critical));
        })
        .await;
    }

    /// Sets the endpoint mode.
    pub async fn set_endpoint_mode(&self, mode: EndpointMode) {
        self.update(|s| s.endpoint_mode = mode).await;
    }

    /// Clears the stored OAuth triple.
    pub async fn clear_oauth(&self) {
        self.update(|s| {
            s.oauth_access_token.clear();
            s.oauth_refresh_token.clear();
            s.oauth_expires_at = 0;
        })
        .await;
    }

    /// Restores every setting to its default.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Stores a credential and persists it immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the settings file cannot be written. The in-memory
    /// credential is updated either way.
    pub async fn persist_credential(&self, credential: Credential) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().await;
        let snapshot = {
            let mut settings = self.settings.write().await;
            settings.apply_credential(credential);
            settings.clone()
        };
        self.notify_change();
        save_json(&self.path, &snapshot).await?;
        info!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    /// Imports Claude Code's OAuth tokens from `path` and persists them.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, holds no token, or the
    /// settings cannot be saved.
    pub async fn import_claude_code(&self, path: &Path) -> Result<OAuthTokens, StoreError> {
        let tokens = load_claude_code_credentials(path).await?;
        self.persist_credential(Credential::OAuth(tokens.clone()))
            .await?;
        info!(expires_at = tokens.expires_at, "Imported Claude Code credentials");
        Ok(tokens)
    }
}

#[async_trait]
impl CredentialStore for SettingsStore {
    async fn snapshot(&self) -> PollSettings {
        let mut snapshot = self
            .settings
            .read()
            .await
            .to_poll_settings(self.env_api_key.as_deref());
        if let Some(seconds) = self.interval_override {
            snapshot.poll_interval_secs = seconds;
        }
        snapshot
    }

    async fn set_credential(&self, credential: Credential) -> Result<(), CoreError> {
        self.persist_credential(credential).await.map_err(Into::into)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json")).with_env_api_key(None)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.auth_mode, AuthMode::OAuth);
        assert_eq!(settings.poll_interval_seconds, 60);
        assert_eq!(settings.thresholds(), Thresholds::default());
        assert_eq!(settings.endpoint_mode, EndpointMode::Both);
        assert!(!settings.has_oauth_token());
        assert_eq!(settings.oauth_expires_at, 0);
    }

    #[test]
    fn test_unknown_enum_strings_fall_back() {
        let settings: Settings = serde_json::from_str(
            r#"{"auth_mode": "password", "endpoint_mode": 7, "poll_interval_seconds": 30}"#,
        )
        .unwrap();
        assert_eq!(settings.auth_mode, AuthMode::OAuth);
        assert_eq!(settings.endpoint_mode, EndpointMode::Both);
        assert_eq!(settings.poll_interval_seconds, 30);
    }

    #[test]
    fn test_known_enum_strings_parse() {
        let settings: Settings =
            serde_json::from_str(r#"{"auth_mode": "api_key", "endpoint_mode": "count_tokens"}"#)
                .unwrap();
        assert_eq!(settings.auth_mode, AuthMode::ApiKey);
        assert_eq!(settings.endpoint_mode, EndpointMode::CountTokens);
    }

    #[test]
    fn test_env_api_key_fallback() {
        let settings = Settings {
            auth_mode: AuthMode::ApiKey,
            ..Settings::default()
        };
        assert_eq!(
            settings.credential(Some("sk-env")),
            Some(Credential::ApiKey("sk-env".to_string()))
        );
        assert_eq!(settings.credential(None), None);
        assert_eq!(settings.credential(Some("")), None);
    }

    #[test]
    fn test_stored_api_key_wins_over_env() {
        let settings = Settings {
            auth_mode: AuthMode::ApiKey,
            api_key: "sk-file".to_string(),
            ..Settings::default()
        };
        let (key, source) = settings.resolved_api_key(Some("sk-env")).unwrap();
        assert_eq!(key, "sk-file");
        assert_eq!(source, ApiKeySource::Settings);
    }

    #[test]
    fn test_oauth_credential_requires_access_token() {
        let mut settings = Settings {
            oauth_refresh_token: "refresh".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.credential(None), None);

        settings.oauth_access_token = "access".to_string();
        let Some(Credential::OAuth(tokens)) = settings.credential(None) else {
            panic!("expected oauth credential");
        };
        assert_eq!(tokens.refresh_token(), Some("refresh"));
    }

    #[test]
    fn test_empty_refresh_token_is_none() {
        let settings = Settings {
            oauth_access_token: "access".to_string(),
            ..Settings::default()
        };
        let tokens = settings.oauth_tokens().unwrap();
        assert_eq!(tokens.refresh_token(), None);
    }

    #[test]
    fn test_apply_credential_replaces_triple() {
        let mut settings = Settings {
            auth_mode: AuthMode::ApiKey,
            oauth_access_token: "old".to_string(),
            oauth_refresh_token: "old-refresh".to_string(),
            oauth_expires_at: 5,
            ..Settings::default()
        };
        settings.apply_credential(Credential::OAuth(OAuthTokens::new("new", None, 99)));

        assert_eq!(settings.auth_mode, AuthMode::OAuth);
        assert_eq!(settings.oauth_access_token, "new");
        assert_eq!(settings.oauth_refresh_token, "");
        assert_eq!(settings.oauth_expires_at, 99);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let settings = Settings {
            api_key: "sk-secret".to_string(),
            oauth_access_token: "tok-secret".to_string(),
            ..Settings::default()
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("tok-secret"));
    }

    #[tokio::test]
    async fn test_setters_clamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.set_poll_interval(3).await;
        store.set_thresholds(150, -4, 3).await;

        let settings = store.get().await;
        assert_eq!(settings.poll_interval_seconds, MIN_POLL_INTERVAL_SECS);
        assert_eq!(settings.yellow_threshold_pct, 100);
        assert_eq!(settings.red_threshold_pct, 0);
        assert_eq!(settings.critical_threshold_pct, 3);
    }

    #[tokio::test]
    async fn test_concurrent_saves_leave_latest_settings_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let mut tasks = Vec::new();
        for i in 0..16_i64 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    let tokens = OAuthTokens::new(format!("access-{i}"), None, i);
                    store.persist_credential(Credential::OAuth(tokens)).await
                } else {
                    store.set_poll_interval(60 + u64::try_from(i).unwrap()).await;
                    store.save().await
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let on_disk = SettingsStore::load(store.path().to_path_buf()).await;
        let on_disk = on_disk.get().await;
        let in_memory = store.get().await;
        assert_eq!(on_disk.oauth_access_token, in_memory.oauth_access_token);
        assert_eq!(on_disk.oauth_expires_at, in_memory.oauth_expires_at);
        assert_eq!(on_disk.poll_interval_seconds, in_memory.poll_interval_seconds);
    }

    #[tokio::test]
    async fn test_interval_override_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_interval_override(Some(3));

        assert_eq!(store.snapshot().await.poll_interval_secs, MIN_POLL_INTERVAL_SECS);

        store
            .persist_credential(Credential::OAuth(OAuthTokens::new("a", None, 0)))
            .await
            .unwrap();
        let reloaded = SettingsStore::load(store.path().to_path_buf()).await;
        assert_eq!(reloaded.get().await.poll_interval_seconds, 60);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_mode() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_env_api_key(Some("sk-env".to_string()));

        assert_eq!(store.snapshot().await.credential, None);

        store.set_auth_mode(AuthMode::ApiKey).await;
        store.set_endpoint_mode(EndpointMode::Messages).await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.auth_mode, AuthMode::ApiKey);
        assert_eq!(snapshot.endpoint_mode, EndpointMode::Messages);
        assert_eq!(
            snapshot.credential,
            Some(Credential::ApiKey("sk-env".to_string()))
        );
        assert_eq!(
            store.api_key_source().await,
            Some(ApiKeySource::Environment)
        );
    }

    #[tokio::test]
    async fn test_set_credential_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).with_env_api_key(None);

        store
            .set_credential(Credential::OAuth(OAuthTokens::new(
                "fresh",
                Some("refresh".to_string()),
                1_750_000_000,
            )))
            .await
            .unwrap();

        let reloaded = SettingsStore::load(path).await;
        let settings = reloaded.get().await;
        assert_eq!(settings.oauth_access_token, "fresh");
        assert_eq!(settings.oauth_refresh_token, "refresh");
        assert_eq!(settings.oauth_expires_at, 1_750_000_000);
    }

    #[tokio::test]
    async fn test_set_credential_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let store = SettingsStore::new(blocker.join("settings.json")).with_env_api_key(None);

        let result = store
            .set_credential(Credential::OAuth(OAuthTokens::new("fresh", None, 1)))
            .await;

        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert_eq!(store.get().await.oauth_access_token, "fresh");
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let mut rx = store.subscribe();

        store.set_auth_mode(AuthMode::ApiKey).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.set_api_key("sk-file").await;
        store.set_poll_interval(300).await;

        store.reset().await;

        assert_eq!(store.get().await, Settings::default());
    }

    #[tokio::test]
    async fn test_clear_oauth() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .persist_credential(Credential::OAuth(OAuthTokens::new(
                "a",
                Some("r".to_string()),
                10,
            )))
            .await
            .unwrap();

        store.clear_oauth().await;

        assert!(store.snapshot().await.credential.is_none());
    }
}
