//! Usage command - poll once and print the result.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use headroom_core::{ErrorKind, PollError};
use headroom_fetch::{HttpClient, UsagePoller};
use tracing::{debug, info};

use super::open_store;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Show only the bars, without the usage summary line.
    #[arg(long)]
    pub bars_only: bool,
}

/// Runs the usage command.
pub async fn run(args: &UsageArgs, cli: &Cli) -> Result<ExitCode> {
    let store = Arc::new(open_store(cli).await);
    let poller = UsagePoller::new(store, Arc::new(HttpClient::for_anthropic()));

    info!("Polling usage");
    let fetched_at = Utc::now();
    let outcome = poller.tick_at(fetched_at).await;
    debug!(result = ?outcome.result, "Poll finished");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let text = if args.bars_only {
                formatter.format_view(&outcome.view)
            } else {
                formatter.format_outcome(&outcome.result, &outcome.view)
            };
            println!("{text}");
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!(
                "{}",
                formatter.format_report(&outcome.result, &outcome.view, fetched_at)?
            );
        }
    }

    Ok(match outcome.result.error().map(PollError::kind) {
        None => ExitCode::Success,
        Some(ErrorKind::NoCredentials) => ExitCode::NotConfigured,
        Some(_) => ExitCode::PollFailed,
    })
}
