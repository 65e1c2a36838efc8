//! Usage snapshots.
//!
//! The API reports rate-limit state in one of two header schemes, and
//! each maps to its own snapshot type:
//! - [`StandardUsage`] - Classic token/request remaining counters
//! - [`UnifiedUsage`] - Subscription utilization across three windows
//!
//! [`UsageSnapshot`] is the tagged union of the two, decided once at
//! parse time.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Standard Usage
// ============================================================================

/// Token and request counters from the classic rate-limit headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardUsage {
    /// Tokens left in the current window.
    pub tokens_remaining: u64,
    /// Token capacity of the window. Never zero in a parsed snapshot.
    pub tokens_limit: u64,
    /// Requests left in the current window.
    pub requests_remaining: u64,
    /// Request capacity of the window.
    pub requests_limit: u64,
    /// ISO 8601 token reset instant; may be empty.
    pub reset_time: String,
}

impl StandardUsage {
    /// Percentage of tokens remaining, clamped to `[0, 100]`.
    ///
    /// This is the single value that drives severity in API-key mode.
    pub fn percent_remaining(&self) -> f64 {
        ratio_percent(self.tokens_remaining, self.tokens_limit)
    }

    /// Percentage of requests remaining, clamped to `[0, 100]`.
    ///
    /// Informational only; never drives color or flash.
    pub fn requests_percent_remaining(&self) -> f64 {
        ratio_percent(self.requests_remaining, self.requests_limit)
    }

    /// Parses the reset timestamp, if present and valid.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset_time.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(&self.reset_time)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// One-line summary, e.g. `4% (4,000 / 100,000 tokens)`.
    pub fn summary(&self) -> String {
        format!(
            "{:.0}% ({} / {} tokens)",
            self.percent_remaining(),
            group_thousands(self.tokens_remaining),
            group_thousands(self.tokens_limit)
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio_percent(remaining: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    (remaining as f64 / limit as f64 * 100.0).clamp(0.0, 100.0)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ============================================================================
// Unified Usage
// ============================================================================

/// The three subscription windows the unified headers describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageWindowKind {
    /// Rolling 5-hour session window.
    Session,
    /// Rolling 7-day window across all models.
    Week,
    /// Rolling 7-day window for Sonnet-class models.
    Sonnet,
}

impl UsageWindowKind {
    /// Short bar label.
    pub fn short_label(&self) -> &'static str {
        match self {
            Self::Session => "Sess",
            Self::Week => "Week",
            Self::Sonnet => "Sonn",
        }
    }

    /// Label used in detail lines.
    pub fn detail_label(&self) -> &'static str {
        match self {
            Self::Session => "5h",
            Self::Week => "7d",
            Self::Sonnet => "Sonnet",
        }
    }
}

/// Utilization of one unified window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowUsage {
    /// Which window.
    pub kind: UsageWindowKind,
    /// Fraction used, nominally `[0, 1]`.
    pub utilization: f64,
    /// Reset instant as epoch seconds; `0` means unknown.
    pub reset_epoch: i64,
}

impl WindowUsage {
    /// Percentage remaining in this window, clamped to `[0, 100]`.
    pub fn percent_remaining(&self) -> f64 {
        utilization_to_remaining(self.utilization)
    }

    /// Reset instant, when known.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        epoch_to_datetime(self.reset_epoch)
    }
}

/// Utilization from the unified subscription headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedUsage {
    /// Fraction of the 5-hour window used.
    pub utilization_5h: f64,
    /// Fraction of the 7-day window used.
    pub utilization_7d: f64,
    /// Fraction of the 7-day Sonnet window used.
    pub utilization_7d_sonnet: f64,
    /// 5-hour reset, epoch seconds (`0` = unknown).
    pub reset_5h: i64,
    /// 7-day reset, epoch seconds (`0` = unknown).
    pub reset_7d: i64,
    /// 7-day Sonnet reset, epoch seconds (`0` = unknown).
    pub reset_7d_sonnet: i64,
}

impl UnifiedUsage {
    /// The three windows in display order.
    pub fn windows(&self) -> [WindowUsage; 3] {
        [
            WindowUsage {
                kind: UsageWindowKind::Session,
                utilization: self.utilization_5h,
                reset_epoch: self.reset_5h,
            },
            WindowUsage {
                kind: UsageWindowKind::Week,
                utilization: self.utilization_7d,
                reset_epoch: self.reset_7d,
            },
            WindowUsage {
                kind: UsageWindowKind::Sonnet,
                utilization: self.utilization_7d_sonnet,
                reset_epoch: self.reset_7d_sonnet,
            },
        ]
    }

    /// Highest utilization across all windows.
    pub fn max_utilization(&self) -> f64 {
        self.utilization_5h
            .max(self.utilization_7d)
            .max(self.utilization_7d_sonnet)
    }

    /// Overall percentage remaining, driven by the most-used window.
    pub fn percent_remaining(&self) -> f64 {
        utilization_to_remaining(self.max_utilization())
    }

    /// Whether any window reported a reset instant.
    pub fn has_reset(&self) -> bool {
        self.reset_5h > 0 || self.reset_7d > 0 || self.reset_7d_sonnet > 0
    }

    /// One-line summary, e.g. `5h: 10% | 7d: 20% | Sonnet: 5%`.
    pub fn summary(&self) -> String {
        self.windows()
            .iter()
            .map(|w| format!("{}: {:.0}%", w.kind.detail_label(), w.utilization * 100.0))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

fn utilization_to_remaining(utilization: f64) -> f64 {
    if !utilization.is_finite() {
        return 0.0;
    }
    ((1.0 - utilization) * 100.0).clamp(0.0, 100.0)
}

/// Converts positive epoch seconds into a UTC instant.
pub fn epoch_to_datetime(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch <= 0 {
        return None;
    }
    Utc.timestamp_opt(epoch, 0).single()
}

// ============================================================================
// Usage Snapshot
// ============================================================================

/// A parsed usage snapshot in whichever scheme the API returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum UsageSnapshot {
    /// Classic token/request counters.
    Standard(StandardUsage),
    /// Subscription utilization windows.
    Unified(UnifiedUsage),
}

impl UsageSnapshot {
    /// Overall percentage remaining for this snapshot.
    pub fn percent_remaining(&self) -> f64 {
        match self {
            Self::Standard(u) => u.percent_remaining(),
            Self::Unified(u) => u.percent_remaining(),
        }
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        match self {
            Self::Standard(u) => u.summary(),
            Self::Unified(u) => u.summary(),
        }
    }
}

impl From<StandardUsage> for UsageSnapshot {
    fn from(usage: StandardUsage) -> Self {
        Self::Standard(usage)
    }
}

impl From<UnifiedUsage> for UsageSnapshot {
    fn from(usage: UnifiedUsage) -> Self {
        Self::Unified(usage)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(remaining: u64, limit: u64) -> StandardUsage {
        StandardUsage {
            tokens_remaining: remaining,
            tokens_limit: limit,
            requests_remaining: 40,
            requests_limit: 50,
            reset_time: String::new(),
        }
    }

    fn unified(u5: f64, u7: f64, us: f64) -> UnifiedUsage {
        UnifiedUsage {
            utilization_5h: u5,
            utilization_7d: u7,
            utilization_7d_sonnet: us,
            reset_5h: 0,
            reset_7d: 0,
            reset_7d_sonnet: 0,
        }
    }

    #[test]
    fn test_standard_percent_remaining() {
        assert!((standard(4_000, 100_000).percent_remaining() - 4.0).abs() < 1e-9);
        assert!((standard(100_000, 100_000).percent_remaining() - 100.0).abs() < 1e-9);
        assert!((standard(0, 100_000).percent_remaining()).abs() < 1e-9);
    }

    #[test]
    fn test_standard_percent_clamped_when_remaining_exceeds_limit() {
        assert!((standard(150, 100).percent_remaining() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_standard_percent_property_over_range() {
        for limit in [1_u64, 7, 100, 99_999, 4_000_000] {
            for remaining in [0_u64, 1, limit / 3, limit, limit * 2] {
                let pct = standard(remaining, limit).percent_remaining();
                assert!((0.0..=100.0).contains(&pct), "{remaining}/{limit} -> {pct}");
            }
        }
    }

    #[test]
    fn test_requests_percent() {
        assert!((standard(1, 2).requests_percent_remaining() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_standard_reset_parsing() {
        let mut usage = standard(1, 2);
        assert!(usage.reset_at().is_none());

        usage.reset_time = "2025-01-01T12:00:00Z".to_string();
        assert!(usage.reset_at().is_some());

        usage.reset_time = "soon".to_string();
        assert!(usage.reset_at().is_none());
    }

    #[test]
    fn test_standard_summary() {
        assert_eq!(standard(4_000, 100_000).summary(), "4% (4,000 / 100,000 tokens)");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000_000), "1,000,000");
    }

    #[test]
    fn test_unified_percent_uses_worst_window() {
        let usage = unified(0.1, 0.6, 0.2);
        assert!((usage.percent_remaining() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_unified_percent_clamped() {
        assert!((unified(1.4, 0.0, 0.0).percent_remaining()).abs() < 1e-9);
        assert!((unified(-0.5, 0.0, 0.0).windows()[0].percent_remaining() - 100.0).abs() < 1e-9);
        assert!((unified(f64::NAN, 0.0, 0.0).windows()[0].percent_remaining()).abs() < 1e-9);
    }

    #[test]
    fn test_unified_summary_and_windows() {
        let usage = unified(0.1, 0.2, 0.05);
        assert_eq!(usage.summary(), "5h: 10% | 7d: 20% | Sonnet: 5%");
        let kinds: Vec<_> = usage.windows().iter().map(|w| w.kind).collect();
        assert_eq!(
            kinds,
            vec![UsageWindowKind::Session, UsageWindowKind::Week, UsageWindowKind::Sonnet]
        );
        assert!(!usage.has_reset());
    }

    #[test]
    fn test_epoch_to_datetime() {
        assert!(epoch_to_datetime(0).is_none());
        assert!(epoch_to_datetime(-1).is_none());
        assert_eq!(epoch_to_datetime(1_700_000_000).unwrap().timestamp(), 1_700_000_000);
    }
}
