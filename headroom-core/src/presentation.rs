//! Mapping poll results to view state.
//!
//! [`map_view_state`] is a pure function of `(result, thresholds, now)`.
//! Renderers never look at raw usage numbers; they draw what this module
//! hands them.

use chrono::{DateTime, Utc};

use crate::models::{
    BarView, ColorZone, FlashState, PollResult, StandardUsage, Thresholds, UnifiedUsage,
    ViewState,
};

/// Label of the token bar in API-key mode.
pub const TOKENS_LABEL: &str = "Tok";
/// Label of the request bar in API-key mode.
pub const REQUESTS_LABEL: &str = "Req";

// ============================================================================
// Entry Point
// ============================================================================

/// Converts one poll outcome into what a renderer should draw.
pub fn map_view_state(
    result: &PollResult,
    thresholds: &Thresholds,
    now: DateTime<Utc>,
) -> ViewState {
    match result {
        PollResult::Standard(usage) => map_standard(usage, thresholds, now),
        PollResult::Unified(usage) => map_unified(usage, thresholds, now),
        PollResult::Error(error) => ViewState::Message {
            kind: error.kind(),
            text: error.to_string(),
        },
    }
}

fn map_standard(usage: &StandardUsage, thresholds: &Thresholds, now: DateTime<Utc>) -> ViewState {
    let countdown = countdown_until(usage.reset_at(), now);
    let tokens = build_bar(TOKENS_LABEL, usage.percent_remaining(), thresholds, countdown);
    let requests = build_bar(
        REQUESTS_LABEL,
        usage.requests_percent_remaining(),
        thresholds,
        String::new(),
    );

    // Requests are informational; only the token bar drives the flash.
    let flash = flash_for(tokens.remaining_percent, thresholds);
    ViewState::Bars {
        bars: vec![tokens, requests],
        flash,
    }
}

fn map_unified(usage: &UnifiedUsage, thresholds: &Thresholds, now: DateTime<Utc>) -> ViewState {
    let bars: Vec<BarView> = usage
        .windows()
        .iter()
        .map(|w| {
            build_bar(
                w.kind.short_label(),
                w.percent_remaining(),
                thresholds,
                countdown_until(w.reset_at(), now),
            )
        })
        .collect();

    let worst = bars.iter().map(|b| b.remaining_percent).min().unwrap_or(100);
    ViewState::Bars {
        flash: flash_for(worst, thresholds),
        bars,
    }
}

// ============================================================================
// Bars and Zones
// ============================================================================

fn build_bar(label: &str, remaining: f64, thresholds: &Thresholds, countdown: String) -> BarView {
    let remaining_percent = round_percent(remaining);
    BarView {
        label: label.to_string(),
        fill_percent: 100 - remaining_percent,
        remaining_percent,
        zone: classify_zone(remaining_percent, thresholds),
        countdown,
    }
}

/// Rounds a percentage to a whole number in `[0, 100]`.
pub fn round_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    // Lossless after the clamp.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        value.round().clamp(0.0, 100.0) as u8
    }
}

/// Zone of a single bar from its own remaining percentage.
pub fn classify_zone(remaining_percent: u8, thresholds: &Thresholds) -> ColorZone {
    if remaining_percent <= thresholds.red_pct {
        ColorZone::Red
    } else if remaining_percent <= thresholds.yellow_pct {
        ColorZone::Yellow
    } else {
        ColorZone::Green
    }
}

/// Flash cadence from the worst severity-driving bar.
pub fn flash_for(worst_remaining: u8, thresholds: &Thresholds) -> FlashState {
    if worst_remaining <= thresholds.critical_pct {
        FlashState::Fast
    } else if worst_remaining <= thresholds.red_pct {
        FlashState::Slow
    } else {
        FlashState::None
    }
}

// ============================================================================
// Countdown
// ============================================================================

fn countdown_until(reset: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    reset
        .map(|at| format_countdown((at - now).num_seconds()))
        .unwrap_or_default()
}

/// Formats seconds until reset as `now`, `Nm`, `Nh` or `Nd`.
///
/// Under an hour the value never rounds down to `0m`.
pub fn format_countdown(secs: i64) -> String {
    if secs <= 0 {
        "now".to_string()
    } else if secs < 3_600 {
        format!("{}m", (secs / 60).max(1))
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{}d", secs / 86_400)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthMode, ErrorKind, PollError};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn unified(u5: f64, u7: f64, us: f64) -> UnifiedUsage {
        let base = now().timestamp();
        UnifiedUsage {
            utilization_5h: u5,
            utilization_7d: u7,
            utilization_7d_sonnet: us,
            reset_5h: base + 2 * 3_600 + 10,
            reset_7d: base + 3 * 86_400,
            reset_7d_sonnet: 0,
        }
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(-5), "now");
        assert_eq!(format_countdown(0), "now");
        assert_eq!(format_countdown(30), "1m");
        assert_eq!(format_countdown(1_800), "30m");
        assert_eq!(format_countdown(3_599), "59m");
        assert_eq!(format_countdown(3_600), "1h");
        assert_eq!(format_countdown(86_399), "23h");
        assert_eq!(format_countdown(86_400), "1d");
        assert_eq!(format_countdown(7 * 86_400 + 5), "7d");
    }

    #[test]
    fn test_zone_boundaries() {
        let t = Thresholds::default();
        assert_eq!(classify_zone(5, &t), ColorZone::Red);
        assert_eq!(classify_zone(6, &t), ColorZone::Yellow);
        assert_eq!(classify_zone(25, &t), ColorZone::Yellow);
        assert_eq!(classify_zone(26, &t), ColorZone::Green);
        assert_eq!(classify_zone(0, &t), ColorZone::Red);
    }

    #[test]
    fn test_zone_monotonic() {
        for (yellow, red) in [(25, 5), (50, 50), (10, 30), (100, 0)] {
            let t = Thresholds::new(yellow, red, 0);
            let mut prev = ColorZone::Green;
            for remaining in (0..=100).rev() {
                let zone = classify_zone(remaining, &t);
                assert!(zone >= prev, "zone went backwards at {remaining}");
                prev = zone;
            }
        }
    }

    #[test]
    fn test_flash_levels() {
        let t = Thresholds::default();
        assert_eq!(flash_for(3, &t), FlashState::Fast);
        assert_eq!(flash_for(4, &t), FlashState::Slow);
        assert_eq!(flash_for(5, &t), FlashState::Slow);
        assert_eq!(flash_for(6, &t), FlashState::None);
    }

    #[test]
    fn test_round_percent() {
        assert_eq!(round_percent(4.4), 4);
        assert_eq!(round_percent(4.5), 5);
        assert_eq!(round_percent(-3.0), 0);
        assert_eq!(round_percent(140.0), 100);
        assert_eq!(round_percent(f64::NAN), 0);
    }

    #[test]
    fn test_standard_bars() {
        let usage = StandardUsage {
            tokens_remaining: 4_000,
            tokens_limit: 100_000,
            requests_remaining: 40,
            requests_limit: 50,
            reset_time: (now() + Duration::seconds(1_800)).to_rfc3339(),
        };
        let view = map_view_state(&PollResult::Standard(usage), &Thresholds::default(), now());

        let bars = view.bars();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, TOKENS_LABEL);
        assert_eq!(bars[0].fill_percent, 96);
        assert_eq!(bars[0].zone, ColorZone::Red);
        assert_eq!(bars[0].countdown, "30m");
        assert_eq!(bars[1].label, REQUESTS_LABEL);
        assert_eq!(bars[1].remaining_percent, 80);
        assert_eq!(bars[1].zone, ColorZone::Green);
        assert_eq!(bars[1].countdown, "");
        assert_eq!(view.flash(), FlashState::Slow);
    }

    #[test]
    fn test_requests_bar_never_drives_flash() {
        let usage = StandardUsage {
            tokens_remaining: 90,
            tokens_limit: 100,
            requests_remaining: 0,
            requests_limit: 50,
            reset_time: String::new(),
        };
        let view = map_view_state(&PollResult::Standard(usage), &Thresholds::default(), now());
        assert_eq!(view.bars()[1].zone, ColorZone::Red);
        assert_eq!(view.flash(), FlashState::None);
        assert_eq!(view.bars()[0].countdown, "");
    }

    #[test]
    fn test_unified_bars_independent() {
        let view = map_view_state(
            &PollResult::Unified(unified(0.97, 0.1, 0.8)),
            &Thresholds::default(),
            now(),
        );
        let bars = view.bars();
        let labels: Vec<_> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Sess", "Week", "Sonn"]);
        assert_eq!(bars[0].zone, ColorZone::Red);
        assert_eq!(bars[1].zone, ColorZone::Green);
        assert_eq!(bars[2].zone, ColorZone::Yellow);
        assert_eq!(bars[0].countdown, "2h");
        assert_eq!(bars[1].countdown, "3d");
        assert_eq!(bars[2].countdown, "");
        assert_eq!(view.flash(), FlashState::Fast);
    }

    #[test]
    fn test_unified_healthy_has_no_flash() {
        let view = map_view_state(
            &PollResult::Unified(unified(0.1, 0.2, 0.05)),
            &Thresholds::default(),
            now(),
        );
        assert_eq!(view.flash(), FlashState::None);
        assert_eq!(view.bars()[0].fill_percent, 10);
    }

    #[test]
    fn test_error_maps_to_message() {
        let view = map_view_state(
            &PollResult::Error(PollError::AuthInvalid(AuthMode::ApiKey)),
            &Thresholds::default(),
            now(),
        );
        assert_eq!(
            view,
            ViewState::Message {
                kind: ErrorKind::AuthInvalid,
                text: "Invalid API key".to_string(),
            }
        );
        assert!(view.bars().is_empty());
        assert_eq!(view.flash(), FlashState::None);
    }
}
