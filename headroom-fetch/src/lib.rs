// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Headroom Fetch
//!
//! The network side of Headroom: probing the API for rate-limit headers,
//! parsing them, refreshing OAuth credentials, and polling on a timer.
//!
//! ## Components
//!
//! - [`http`] - [`Transport`] trait and the reqwest-backed [`HttpClient`]
//! - [`probe`] - [`UsageProbe`], minimal requests and status classification
//! - [`headers`] - Standard and unified header parsing
//! - [`oauth`] - PKCE and the token endpoint ([`TokenRefresher`])
//! - [`poller`] - [`UsagePoller`], the per-tick retry state machine and timer
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use headroom_fetch::{HttpClient, UsagePoller};
//!
//! let transport = Arc::new(HttpClient::for_anthropic());
//! let poller = UsagePoller::new(store, transport);
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(8);
//! let handle = poller.spawn(tx);
//! headroom_fetch::run_renderer(rx, &mut renderer).await;
//! ```

pub mod error;
pub mod headers;
pub mod http;
pub mod oauth;
pub mod poller;
pub mod probe;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Errors
pub use error::{HttpError, OAuthError};

// Transport
pub use http::{HttpClient, JsonRequest, RawResponse, Transport};

// Probe & parsing
pub use headers::{has_usage_headers, parse_usage};
pub use probe::{ProbeEndpoint, UsageProbe, classify_status};

// OAuth
pub use oauth::{
    PkceChallenge, TokenRefresher, authorization_url, split_pasted_code, verify_pasted_code,
};

// Polling
pub use poller::{
    PollerHandle, TickOutcome, UsagePoller, WARMUP_DELAY, effective_interval, run_renderer,
};
