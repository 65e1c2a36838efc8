//! Serde tests for the JSON shapes the CLI emits and the store persists.

use serde_json::json;

use crate::{
    AuthMode, BarView, ColorZone, EndpointMode, ErrorKind, FlashState, OAuthTokens,
    StandardUsage, Thresholds, UnifiedUsage, UsageSnapshot, ViewState,
};

// ============================================================================
// Enum Names
// ============================================================================

#[test]
fn test_endpoint_mode_names() {
    let cases = [
        (r#""both""#, EndpointMode::Both),
        (r#""count_tokens""#, EndpointMode::CountTokens),
        (r#""messages""#, EndpointMode::Messages),
    ];
    for (text, expected) in cases {
        let parsed: EndpointMode = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, expected, "Failed for {text}");
    }
}

#[test]
fn test_auth_mode_rejects_unknown() {
    let result: Result<AuthMode, _> = serde_json::from_str(r#""password""#);
    assert!(result.is_err());
}

#[test]
fn test_error_kind_names() {
    assert_eq!(
        serde_json::to_value(ErrorKind::AuthExpiredNoRefresh).unwrap(),
        json!("auth_expired_no_refresh")
    );
    assert_eq!(serde_json::to_value(ErrorKind::NetworkError).unwrap(), json!("network_error"));
}

// ============================================================================
// Snapshots
// ============================================================================

#[test]
fn test_standard_snapshot_is_tagged() {
    let snapshot = UsageSnapshot::Standard(StandardUsage {
        tokens_remaining: 4_000,
        tokens_limit: 100_000,
        requests_remaining: 40,
        requests_limit: 50,
        reset_time: "2025-01-01T00:00:00Z".to_string(),
    });
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["scheme"], "standard");
    assert_eq!(value["tokens_limit"], 100_000);
}

#[test]
fn test_unified_snapshot_is_tagged() {
    let snapshot = UsageSnapshot::Unified(UnifiedUsage {
        utilization_5h: 0.5,
        utilization_7d: 0.25,
        utilization_7d_sonnet: 0.0,
        reset_5h: 1_700_000_000,
        reset_7d: 0,
        reset_7d_sonnet: 0,
    });
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["scheme"], "unified");
    assert_eq!(value["reset_5h"], 1_700_000_000_i64);

    let back: UsageSnapshot = serde_json::from_value(value).unwrap();
    assert_eq!(back, snapshot);
}

// ============================================================================
// View State
// ============================================================================

#[test]
fn test_view_state_bars_shape() {
    let view = ViewState::Bars {
        bars: vec![BarView {
            label: "Tok".to_string(),
            fill_percent: 96,
            remaining_percent: 4,
            zone: ColorZone::Red,
            countdown: "30m".to_string(),
        }],
        flash: FlashState::Slow,
    };
    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["type"], "bars");
    assert_eq!(value["flash"], "slow");
    assert_eq!(value["bars"][0]["zone"], "red");
}

#[test]
fn test_view_state_message_shape() {
    let view = ViewState::Message {
        kind: ErrorKind::NoCredits,
        text: "No API credits -- check Plans & Billing".to_string(),
    };
    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["type"], "message");
    assert_eq!(value["kind"], "no_credits");
}

// ============================================================================
// Settings Types
// ============================================================================

#[test]
fn test_thresholds_serde() {
    let value = serde_json::to_value(Thresholds::default()).unwrap();
    assert_eq!(value, json!({"yellow_pct": 25, "red_pct": 5, "critical_pct": 3}));
}

#[test]
fn test_oauth_tokens_serde_keeps_values() {
    let tokens = OAuthTokens::new("at", Some("rt".to_string()), 42);
    let json = serde_json::to_string(&tokens).unwrap();
    let back: OAuthTokens = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tokens);
}
