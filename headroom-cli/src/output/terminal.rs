//! The terminal [`Renderer`] used by watch mode.

use std::io::{Write, stdout};

use chrono::Utc;
use headroom_core::{Renderer, ViewState};
use tracing::warn;

use super::{JsonFormatter, TextFormatter};
use crate::OutputFormat;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Redraws the screen (text) or emits one JSON line per view.
pub struct TerminalRenderer {
    format: OutputFormat,
    text: TextFormatter,
    json: JsonFormatter,
    interval_secs: u64,
    clear: bool,
}

impl TerminalRenderer {
    /// Creates a renderer for the given output format.
    pub fn new(format: OutputFormat, use_colors: bool, interval_secs: u64) -> Self {
        Self {
            format,
            text: TextFormatter::new(use_colors),
            json: JsonFormatter::new(false),
            interval_secs,
            clear: use_colors,
        }
    }

    /// Renders a view to a string, exactly as it is written out.
    pub fn render(&self, view: &ViewState) -> String {
        match self.format {
            OutputFormat::Json => match self.json.format(view) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize view");
                    String::new()
                }
            },
            OutputFormat::Text => {
                let mut frame = String::new();
                if self.clear {
                    frame.push_str(CLEAR_SCREEN);
                }
                frame.push_str(&self.text.format_watch_header(Utc::now(), self.interval_secs));
                frame.push_str("\n\n");
                frame.push_str(&self.text.format_view(view));
                frame.push_str("\n\n");
                frame.push_str(&self.text.dim("Enter: refresh now  Ctrl+C: quit"));
                frame
            }
        }
    }
}

impl Renderer for TerminalRenderer {
    fn on_view_state(&mut self, view: &ViewState) {
        let frame = self.render(view);
        let mut out = stdout().lock();
        if let Err(e) = writeln!(out, "{frame}").and_then(|()| out.flush()) {
            warn!(error = %e, "Failed to write to terminal");
        }
    }
}
