//! Login command - OAuth sign-in or Claude Code import.

use std::io::{Write, stdin, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use clap::Args;
use headroom_core::{Credential, OAuthTokens, epoch_to_datetime};
use headroom_fetch::{HttpClient, PkceChallenge, TokenRefresher, verify_pasted_code};
use headroom_store::default_credentials_path;
use tracing::info;

use super::open_store;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Import tokens from Claude Code instead of signing in.
    #[arg(long)]
    pub import: bool,

    /// Credentials file to import (defaults to ~/.claude/.credentials.json).
    #[arg(long, requires = "import", value_name = "PATH")]
    pub from: Option<PathBuf>,
}

/// Runs the login command.
pub async fn run(args: &LoginArgs, cli: &Cli) -> Result<ExitCode> {
    let store = open_store(cli).await;

    let tokens = if args.import {
        let path = args.from.clone().unwrap_or_else(default_credentials_path);
        store
            .import_claude_code(&path)
            .await
            .with_context(|| format!("Could not import from {}", path.display()))?
    } else {
        let tokens = sign_in().await?;
        store
            .persist_credential(Credential::OAuth(tokens.clone()))
            .await
            .context("Signed in, but saving the token failed")?;
        tokens
    };

    info!(path = %store.path().display(), "OAuth credentials stored");
    report(&tokens, cli)?;
    Ok(ExitCode::Success)
}

/// Browser PKCE flow: print the URL, read the pasted code, exchange it.
async fn sign_in() -> Result<OAuthTokens> {
    let pkce = PkceChallenge::generate()?;

    println!("Open this URL in your browser and sign in:");
    println!();
    println!("  {}", pkce.authorization_url());
    println!();
    print!("Paste the authorization code: ");
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        bail!("No authorization code entered");
    }

    let code = verify_pasted_code(input, &pkce.state)?;
    let refresher = TokenRefresher::new(Arc::new(HttpClient::for_anthropic()));
    let tokens = refresher.exchange_code(code, &pkce.verifier).await?;
    Ok(tokens)
}

fn report(tokens: &OAuthTokens, cli: &Cli) -> Result<()> {
    let expires = epoch_to_datetime(tokens.expires_at);
    match cli.format {
        OutputFormat::Text => {
            if cli.quiet {
                return Ok(());
            }
            let expiry = expires.map_or_else(
                || "unknown expiry".to_string(),
                |at| {
                    let local: DateTime<Local> = at.into();
                    format!("expires {}", local.format("%Y-%m-%d %H:%M"))
                },
            );
            let refresh = if tokens.refresh_token().is_some() {
                "with refresh token"
            } else {
                "no refresh token"
            };
            println!("Signed in ({expiry}, {refresh}).");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "authMode": "oauth",
                "expiresAt": expires.map(|at| at.to_rfc3339()),
                "hasRefreshToken": tokens.refresh_token().is_some(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}
