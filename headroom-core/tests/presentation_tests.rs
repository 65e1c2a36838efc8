//! Integration tests for the presentation mapper through the public API.

use chrono::{Duration, TimeZone, Utc};
use headroom_core::{
    ColorZone, FlashState, PollResult, StandardUsage, Thresholds, UnifiedUsage, map_view_state,
};

#[test]
fn test_api_key_low_tokens_renders_red_bar_with_countdown() {
    let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
    let usage = StandardUsage {
        tokens_remaining: 4_000,
        tokens_limit: 100_000,
        requests_remaining: 40,
        requests_limit: 50,
        reset_time: (now + Duration::seconds(1_800)).to_rfc3339(),
    };

    let view = map_view_state(&PollResult::Standard(usage), &Thresholds::default(), now);

    let token_bar = &view.bars()[0];
    assert_eq!(token_bar.fill_percent, 96);
    assert_eq!(token_bar.remaining_percent, 4);
    assert_eq!(token_bar.zone, ColorZone::Red);
    assert_eq!(token_bar.countdown, "30m");
}

#[test]
fn test_thresholds_are_applied_per_call() {
    let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
    let usage = UnifiedUsage {
        utilization_5h: 0.7,
        utilization_7d: 0.0,
        utilization_7d_sonnet: 0.0,
        reset_5h: 0,
        reset_7d: 0,
        reset_7d_sonnet: 0,
    };
    let result = PollResult::Unified(usage);

    let relaxed = map_view_state(&result, &Thresholds::default(), now);
    assert_eq!(relaxed.bars()[0].zone, ColorZone::Green);
    assert_eq!(relaxed.flash(), FlashState::None);

    let strict = map_view_state(&result, &Thresholds::new(50, 30, 10), now);
    assert_eq!(strict.bars()[0].zone, ColorZone::Red);
    assert_eq!(strict.flash(), FlashState::Slow);
}

#[test]
fn test_past_reset_renders_now() {
    let now = Utc.timestamp_opt(1_750_000_000, 0).unwrap();
    let usage = UnifiedUsage {
        utilization_5h: 1.0,
        utilization_7d: 0.2,
        utilization_7d_sonnet: 0.1,
        reset_5h: now.timestamp() - 60,
        reset_7d: 0,
        reset_7d_sonnet: 0,
    };

    let view = map_view_state(&PollResult::Unified(usage), &Thresholds::default(), now);

    assert_eq!(view.bars()[0].countdown, "now");
    assert_eq!(view.bars()[0].fill_percent, 100);
    assert_eq!(view.flash(), FlashState::Fast);
}
