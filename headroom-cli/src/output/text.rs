//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Local, Utc};
use headroom_core::{BarView, ColorZone, FlashState, PollResult, ViewState};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const SLOW_BLINK: &str = "\x1b[5m";
const FAST_BLINK: &str = "\x1b[6m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 20,
        }
    }

    /// Set the progress bar width.
    #[must_use]
    #[allow(dead_code)]
    pub fn with_bar_width(mut self, width: usize) -> Self {
        self.bar_width = width;
        self
    }

    /// Formats a whole view: one line per bar, or the message line.
    pub fn format_view(&self, view: &ViewState) -> String {
        match view {
            ViewState::Bars { bars, flash } => bars
                .iter()
                .map(|bar| self.format_bar(bar, *flash))
                .collect::<Vec<_>>()
                .join("\n"),
            ViewState::Message { text, .. } => self.red(text),
        }
    }

    /// Formats the view plus the one-line usage summary, if any.
    pub fn format_outcome(&self, result: &PollResult, view: &ViewState) -> String {
        let mut out = self.format_view(view);
        let summary = match result {
            PollResult::Standard(usage) => Some(usage.summary()),
            PollResult::Unified(usage) => Some(usage.summary()),
            PollResult::Error(_) => None,
        };
        if let Some(summary) = summary {
            out.push('\n');
            out.push_str(&self.dim(&summary));
        }
        out
    }

    /// Formats one bar: `Tok   ████░░░░  4% left  30m`.
    pub fn format_bar(&self, bar: &BarView, flash: FlashState) -> String {
        let gauge = self.color_for_zone(bar.zone, &self.progress_bar(bar.fill_percent));
        let pct = self.color_for_zone(bar.zone, &format!("{:>3}% left", bar.remaining_percent));
        let label = format!("{:<5}", bar.label);
        let label = if bar.zone == ColorZone::Red {
            self.blink(flash, &label)
        } else {
            label
        };

        let mut line = format!("{label} {gauge} {pct}");
        if !bar.countdown.is_empty() {
            line.push_str("  ");
            line.push_str(&self.dim(&format!("resets in {}", bar.countdown)));
        }
        line
    }

    /// Formats a progress bar filled to `fill_percent` (capacity used).
    pub fn progress_bar(&self, fill_percent: u8) -> String {
        let ratio = f64::from(fill_percent.min(100)) / 100.0;
        // Bar widths are small, the product always fits.
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let filled = (ratio * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        )
    }

    /// Header line for watch mode.
    pub fn format_watch_header(&self, at: DateTime<Utc>, interval_secs: u64) -> String {
        let local = at.with_timezone(&Local);
        format!(
            "{} - {} (every {}s)\n{}",
            self.bold("Headroom"),
            local.format("%H:%M:%S"),
            interval_secs,
            "─".repeat(40)
        )
    }

    // ========================================================================
    // Colors
    // ========================================================================

    fn color_for_zone(&self, zone: ColorZone, text: &str) -> String {
        match zone {
            ColorZone::Green => self.paint(GREEN, text),
            ColorZone::Yellow => self.paint(YELLOW, text),
            ColorZone::Red => self.paint(RED, text),
        }
    }

    fn blink(&self, flash: FlashState, text: &str) -> String {
        match flash {
            FlashState::None => text.to_string(),
            FlashState::Slow => self.paint(SLOW_BLINK, text),
            FlashState::Fast => self.paint(FAST_BLINK, text),
        }
    }

    pub(crate) fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    pub(crate) fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    pub(crate) fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(remaining: u8, zone: ColorZone, countdown: &str) -> BarView {
        BarView {
            label: "Tok".to_string(),
            fill_percent: 100 - remaining,
            remaining_percent: remaining,
            zone,
            countdown: countdown.to_string(),
        }
    }

    #[test]
    fn test_progress_bar_empty() {
        let formatter = TextFormatter::new(false).with_bar_width(10);
        assert_eq!(formatter.progress_bar(0), "░░░░░░░░░░");
    }

    #[test]
    fn test_progress_bar_full() {
        let formatter = TextFormatter::new(false).with_bar_width(10);
        assert_eq!(formatter.progress_bar(100), "██████████");
    }

    #[test]
    fn test_progress_bar_rounds() {
        let formatter = TextFormatter::new(false).with_bar_width(10);
        assert_eq!(formatter.progress_bar(25), "███░░░░░░░");
        assert_eq!(formatter.progress_bar(96), "██████████");
    }

    #[test]
    fn test_red_bar_is_red() {
        let formatter = TextFormatter::new(true);
        let line = formatter.format_bar(&bar(4, ColorZone::Red, "30m"), FlashState::None);
        assert!(line.contains(RED));
        assert!(line.contains("resets in 30m"));
    }

    #[test]
    fn test_flash_only_on_red_bars() {
        let formatter = TextFormatter::new(true);
        let red = formatter.format_bar(&bar(4, ColorZone::Red, ""), FlashState::Slow);
        let green = formatter.format_bar(&bar(80, ColorZone::Green, ""), FlashState::Slow);
        assert!(red.contains(SLOW_BLINK));
        assert!(!green.contains(SLOW_BLINK));
    }

    #[test]
    fn test_empty_countdown_omitted() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format_bar(&bar(50, ColorZone::Green, ""), FlashState::None);
        assert!(!line.contains("resets"));
    }

    #[test]
    fn test_no_colors() {
        let formatter = TextFormatter::new(false);
        let line = formatter.format_bar(&bar(4, ColorZone::Red, "1h"), FlashState::Fast);
        assert!(!line.contains('\x1b'));
    }
}
