// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Headroom CLI - Anthropic rate-limit headroom from the command line.
//!
//! # Examples
//!
//! ```bash
//! # One poll, print the bars
//! headroom
//!
//! # JSON output
//! headroom --format json --pretty
//!
//! # Keep polling and redraw on every tick
//! headroom watch
//!
//! # Sign in with a Claude subscription
//! headroom login
//!
//! # Reuse Claude Code's tokens
//! headroom login --import
//!
//! # Switch to an API key
//! headroom config mode api_key
//! headroom config api-key sk-ant-...
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, login, usage, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Headroom CLI - rate-limit headroom monitoring.
#[derive(Parser)]
#[command(name = "headroom")]
#[command(about = "Anthropic API rate-limit headroom monitor")]
#[command(long_about = r#"
Headroom probes the Anthropic API with a minimal request and shows how much
of your rate limit is left, as color-coded bars with reset countdowns.

Credentials:
  • OAuth (Claude Pro/Max subscription): 5h, 7d and Sonnet windows
  • API key (console): token and request counters

Examples:
  headroom                       # One poll
  headroom watch                 # Poll continuously
  headroom login --import        # Reuse Claude Code's tokens
  headroom config show           # Current settings
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Settings file to use instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll once and print the bars (default if no command specified).
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Poll continuously and redraw on every tick.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Sign in with OAuth or import Claude Code credentials.
    Login(login::LoginArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No credential configured for the active auth mode.
    NotConfigured = 2,
    /// The poll ran but produced an error view.
    PollFailed = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("headroom=debug,info")
    } else {
        EnvFilter::new("headroom=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Usage(args)) => usage::run(args, &cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::Login(args)) => login::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        None => usage::run(&usage::UsageArgs::default(), &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
