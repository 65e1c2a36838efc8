//! Rate-limit header parsing.
//!
//! Two header schemes exist. The unified scheme is checked first; the
//! scheme is never inferred from the auth mode.

use headroom_core::{PollError, StandardUsage, UnifiedUsage, UsageSnapshot};
use reqwest::header::HeaderMap;
use tracing::debug;

/// HTTP status for "rate limited".
pub const STATUS_RATE_LIMITED: u16 = 429;

/// Classic scheme header names.
pub mod standard {
    /// Token capacity of the window.
    pub const TOKENS_LIMIT: &str = "anthropic-ratelimit-tokens-limit";
    /// Tokens left.
    pub const TOKENS_REMAINING: &str = "anthropic-ratelimit-tokens-remaining";
    /// Request capacity of the window.
    pub const REQUESTS_LIMIT: &str = "anthropic-ratelimit-requests-limit";
    /// Requests left.
    pub const REQUESTS_REMAINING: &str = "anthropic-ratelimit-requests-remaining";
    /// Token reset instant (RFC 3339).
    pub const TOKENS_RESET: &str = "anthropic-ratelimit-tokens-reset";
}

/// Unified scheme header names.
pub mod unified {
    /// 5-hour utilization; also the scheme marker.
    pub const UTILIZATION_5H: &str = "anthropic-ratelimit-unified-5h-utilization";
    /// 7-day utilization.
    pub const UTILIZATION_7D: &str = "anthropic-ratelimit-unified-7d-utilization";
    /// 7-day Sonnet utilization.
    pub const UTILIZATION_7D_SONNET: &str = "anthropic-ratelimit-unified-7d_sonnet-utilization";
    /// 5-hour reset, epoch seconds.
    pub const RESET_5H: &str = "anthropic-ratelimit-unified-5h-reset";
    /// 7-day reset, epoch seconds.
    pub const RESET_7D: &str = "anthropic-ratelimit-unified-7d-reset";
    /// 7-day Sonnet reset, epoch seconds.
    pub const RESET_7D_SONNET: &str = "anthropic-ratelimit-unified-7d_sonnet-reset";
}

/// Whether the response carries either rate-limit scheme.
pub fn has_usage_headers(headers: &HeaderMap) -> bool {
    headers.contains_key(unified::UTILIZATION_5H) || headers.contains_key(standard::TOKENS_LIMIT)
}

/// Parses a 200/429 response's headers into a usage snapshot.
pub fn parse_usage(status: u16, headers: &HeaderMap) -> Result<UsageSnapshot, PollError> {
    let exhausted = status == STATUS_RATE_LIMITED;

    if headers.contains_key(unified::UTILIZATION_5H) {
        debug!(exhausted, "Parsing unified rate-limit headers");
        return Ok(UsageSnapshot::Unified(parse_unified(headers, exhausted)));
    }

    if headers.contains_key(standard::TOKENS_LIMIT) {
        debug!(exhausted, "Parsing standard rate-limit headers");
        return parse_standard(headers, exhausted).map(UsageSnapshot::Standard);
    }

    Err(PollError::NoUsageHeaders)
}

fn parse_standard(headers: &HeaderMap, exhausted: bool) -> Result<StandardUsage, PollError> {
    let tokens_limit = header_u64(headers, standard::TOKENS_LIMIT);
    if tokens_limit == 0 {
        return Err(PollError::NoUsageHeaders);
    }

    let (tokens_remaining, requests_remaining) = if exhausted {
        (0, 0)
    } else {
        (
            header_u64(headers, standard::TOKENS_REMAINING),
            header_u64(headers, standard::REQUESTS_REMAINING),
        )
    };

    Ok(StandardUsage {
        tokens_remaining,
        tokens_limit,
        requests_remaining,
        requests_limit: header_u64(headers, standard::REQUESTS_LIMIT),
        reset_time: header_str(headers, standard::TOKENS_RESET).unwrap_or_default(),
    })
}

fn parse_unified(headers: &HeaderMap, exhausted: bool) -> UnifiedUsage {
    let mut utilization_5h = header_f64(headers, unified::UTILIZATION_5H);
    if exhausted {
        utilization_5h = utilization_5h.max(1.0);
    }

    UnifiedUsage {
        utilization_5h,
        utilization_7d: header_f64(headers, unified::UTILIZATION_7D),
        utilization_7d_sonnet: header_f64(headers, unified::UTILIZATION_7D_SONNET),
        reset_5h: header_i64(headers, unified::RESET_5H),
        reset_7d: header_i64(headers, unified::RESET_7D),
        reset_7d_sonnet: header_i64(headers, unified::RESET_7D_SONNET),
    }
}

// ============================================================================
// Header Helpers
// ============================================================================

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    header_str(headers, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn header_i64(headers: &HeaderMap, name: &str) -> i64 {
    header_str(headers, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn header_f64(headers: &HeaderMap, name: &str) -> f64 {
    header_str(headers, name)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

// ============================================================================
// Tests
// ============================================================================
