//! Watch command - continuous polling with a live terminal view.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use headroom_core::{AuthMode, CredentialStore};
use headroom_fetch::{HttpClient, UsagePoller, effective_interval, run_renderer};
use headroom_store::{SettingsStore, default_credentials_path};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::open_store;
use crate::output::TerminalRenderer;
use crate::{Cli, ExitCode};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Poll interval in seconds for this session (not saved).
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Do not import Claude Code credentials when no OAuth token is stored.
    #[arg(long)]
    pub no_import: bool,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<ExitCode> {
    let store = Arc::new(open_store(cli).await.with_interval_override(args.interval));
    if !args.no_import {
        auto_import(&store).await;
    }

    let interval = effective_interval(store.poll_interval_secs().await).as_secs();
    info!(interval, "Starting watch mode");

    let poller = UsagePoller::new(store, Arc::new(HttpClient::for_anthropic()));
    let (tx, rx) = mpsc::channel(8);
    let handle = poller.spawn(tx);

    let mut renderer = TerminalRenderer::new(cli.format, !cli.no_color, interval);
    let mut render = Box::pin(run_renderer(rx, &mut renderer));

    let mut enter = spawn_enter_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            () = &mut render => {
                debug!("Poller closed the view channel");
                break;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Interrupted, stopping poller");
                break;
            }
            key = enter.recv(), if stdin_open => match key {
                Some(()) => handle.refresh_now(),
                None => stdin_open = false,
            },
        }
    }

    // Release the receiver so a tick finishing during stop never blocks on send.
    drop(render);
    handle.stop().await;
    Ok(ExitCode::Success)
}

/// Signals once per line typed on stdin.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_enter_reader() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line.is_err() || tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Pulls in Claude Code's tokens when OAuth mode has nothing stored.
async fn auto_import(store: &SettingsStore) {
    let settings = store.get().await;
    if settings.auth_mode != AuthMode::OAuth || settings.has_oauth_token() {
        return;
    }

    let path = default_credentials_path();
    match store.import_claude_code(&path).await {
        Ok(_) => info!(path = %path.display(), "Imported Claude Code credentials"),
        Err(e) if e.is_not_found() => debug!("No Claude Code credentials to import"),
        Err(e) => warn!(error = %e, "Claude Code import failed"),
    }
}
