//! Config command - manage configuration.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::{Args, Subcommand};
use headroom_core::{
    AuthMode, EndpointMode, MIN_POLL_INTERVAL_SECS, epoch_to_datetime, is_token_expired,
};
use headroom_store::{Settings, SettingsStore, default_config_dir};
use serde::Serialize;
use tracing::info;

use super::open_store;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set the auth mode.
    Mode {
        /// `oauth` or `api_key`.
        mode: AuthMode,
    },

    /// Store an API key, or clear it to fall back to ANTHROPIC_API_KEY.
    ApiKey {
        /// The key. Omit with --clear.
        #[arg(required_unless_present = "clear")]
        key: Option<String>,

        /// Remove the stored key.
        #[arg(long, conflicts_with = "key")]
        clear: bool,
    },

    /// Set the poll interval in seconds.
    Interval {
        /// Seconds between polls.
        seconds: u64,
    },

    /// Set the yellow, red and critical thresholds (percent remaining).
    #[command(allow_negative_numbers = true)]
    Thresholds {
        /// Yellow at or below this percent remaining.
        yellow: i64,
        /// Red at or below this percent remaining.
        red: i64,
        /// Fast flash at or below this percent remaining.
        critical: i64,
    },

    /// Set which endpoints API-key mode probes.
    Endpoint {
        /// `both`, `count_tokens` or `messages`.
        mode: EndpointMode,
    },

    /// Sign out of OAuth, keeping other settings.
    Logout,

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    let store = open_store(cli).await;
    match &args.action {
        ConfigAction::Show => show_config(&store, cli).await?,
        ConfigAction::Path => show_paths(&store, cli)?,
        ConfigAction::Mode { mode } => {
            store.set_auth_mode(*mode).await;
            save(&store, cli, &format!("Auth mode: {}", mode.display_name())).await?;
        }
        ConfigAction::ApiKey { key, clear } => {
            let key = if *clear { String::new() } else { key.clone().unwrap_or_default() };
            let message = if key.is_empty() {
                "API key cleared".to_string()
            } else {
                format!("API key stored ({})", mask_secret(&key))
            };
            store.set_api_key(key).await;
            save(&store, cli, &message).await?;
        }
        ConfigAction::Interval { seconds } => {
            if *seconds < MIN_POLL_INTERVAL_SECS {
                info!(requested = seconds, "Raising poll interval to the minimum");
            }
            store.set_poll_interval(*seconds).await;
            let stored = store.get().await.poll_interval_seconds;
            save(&store, cli, &format!("Poll interval: {stored}s")).await?;
        }
        ConfigAction::Thresholds { yellow, red, critical } => {
            store.set_thresholds(*yellow, *red, *critical).await;
            let t = store.get().await.thresholds();
            let message = format!(
                "Thresholds: yellow {}%, red {}%, critical {}%",
                t.yellow_pct, t.red_pct, t.critical_pct
            );
            save(&store, cli, &message).await?;
        }
        ConfigAction::Endpoint { mode } => {
            store.set_endpoint_mode(*mode).await;
            save(&store, cli, &format!("Endpoint mode: {mode}")).await?;
        }
        ConfigAction::Logout => {
            store.clear_oauth().await;
            save(&store, cli, "OAuth credentials removed").await?;
        }
        ConfigAction::Reset => {
            store.reset().await;
            save(&store, cli, "Configuration reset to defaults").await?;
        }
    }

    Ok(ExitCode::Success)
}

async fn save(store: &SettingsStore, cli: &Cli, message: &str) -> Result<()> {
    store.save().await?;
    if !cli.quiet {
        println!("{message}");
    }
    Ok(())
}

// ============================================================================
// Show
// ============================================================================

/// Secret-free view of the settings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigOutput {
    auth_mode: AuthMode,
    api_key: Option<String>,
    api_key_source: Option<&'static str>,
    oauth_signed_in: bool,
    oauth_has_refresh_token: bool,
    oauth_expires_at: Option<String>,
    oauth_expired: bool,
    poll_interval_seconds: u64,
    yellow_threshold_pct: u8,
    red_threshold_pct: u8,
    critical_threshold_pct: u8,
    endpoint_mode: EndpointMode,
    settings_file: String,
}

impl ConfigOutput {
    fn new(
        settings: &Settings,
        api_key_source: Option<&'static str>,
        store: &SettingsStore,
    ) -> Self {
        let thresholds = settings.thresholds();
        let tokens = settings.oauth_tokens();
        Self {
            auth_mode: settings.auth_mode,
            api_key: (!settings.api_key.is_empty()).then(|| mask_secret(&settings.api_key)),
            api_key_source,
            oauth_signed_in: tokens.is_some(),
            oauth_has_refresh_token: tokens.as_ref().is_some_and(|t| t.refresh_token().is_some()),
            oauth_expires_at: epoch_to_datetime(settings.oauth_expires_at)
                .map(|at| at.to_rfc3339()),
            oauth_expired: tokens.is_some()
                && is_token_expired(settings.oauth_expires_at, Utc::now().timestamp()),
            poll_interval_seconds: settings.poll_interval_seconds,
            yellow_threshold_pct: thresholds.yellow_pct,
            red_threshold_pct: thresholds.red_pct,
            critical_threshold_pct: thresholds.critical_pct,
            endpoint_mode: settings.endpoint_mode,
            settings_file: store.path().display().to_string(),
        }
    }
}

async fn show_config(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let settings = store.get().await;
    let source = store.api_key_source().await.map(|s| s.display_name());
    let output = ConfigOutput::new(&settings, source, store);

    match cli.format {
        OutputFormat::Text => {
            let text = TextFormatter::new(!cli.no_color);
            println!("{}", text.bold("Headroom Configuration"));
            println!("{}", "─".repeat(40));
            println!();
            println!("Auth mode:      {}", settings.auth_mode.display_name());
            println!(
                "API key:        {}",
                match (&output.api_key, output.api_key_source) {
                    (Some(masked), _) => masked.clone(),
                    (None, Some(source)) => format!("from {source}"),
                    (None, None) => text.dim("not set"),
                }
            );
            println!("OAuth token:    {}", oauth_status(&output, &text));
            println!("Poll interval:  {}s", output.poll_interval_seconds);
            println!(
                "Thresholds:     yellow {}%, red {}%, critical {}%",
                output.yellow_threshold_pct, output.red_threshold_pct, output.critical_threshold_pct
            );
            println!("Endpoint mode:  {}", output.endpoint_mode);
            println!();
            println!("{}", text.dim(&output.settings_file));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}

fn oauth_status(output: &ConfigOutput, text: &TextFormatter) -> String {
    if !output.oauth_signed_in {
        return text.dim("not signed in");
    }
    let expiry = output
        .oauth_expires_at
        .as_deref()
        .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
        .map_or_else(
            || "unknown expiry".to_string(),
            |at| format!("expires {}", at.with_timezone(&Local).format("%Y-%m-%d %H:%M")),
        );
    let status = format!(
        "signed in ({expiry}{})",
        if output.oauth_has_refresh_token { ", refreshable" } else { "" }
    );
    if output.oauth_expired {
        format!("{status} {}", text.red("expired"))
    } else {
        status
    }
}

fn show_paths(store: &SettingsStore, cli: &Cli) -> Result<()> {
    let config_dir = store
        .path()
        .parent()
        .map_or_else(default_config_dir, std::path::Path::to_path_buf);
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

/// Keeps the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}
