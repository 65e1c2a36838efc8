//! Output formatting for CLI.

mod json;
mod terminal;
mod text;

pub use json::JsonFormatter;
pub use terminal::TerminalRenderer;
pub use text::TextFormatter;
