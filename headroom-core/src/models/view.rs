//! View state handed to renderers.

use serde::{Deserialize, Serialize};

use super::poll::ErrorKind;

/// Discretized severity of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorZone {
    /// Plenty left.
    Green,
    /// Getting low.
    Yellow,
    /// Nearly exhausted.
    Red,
}

impl ColorZone {
    /// Returns the display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// Urgency of the whole surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum FlashState {
    /// Steady.
    #[default]
    None,
    /// Slow blink.
    Slow,
    /// Fast blink.
    Fast,
}

/// One capacity bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarView {
    /// Short label such as `Tok` or `Sess`.
    pub label: String,
    /// Filled portion, `100 - remaining_percent`.
    pub fill_percent: u8,
    /// Remaining capacity in whole percent.
    pub remaining_percent: u8,
    /// Color zone of this bar.
    pub zone: ColorZone,
    /// Time until reset, or empty when unknown.
    pub countdown: String,
}

/// Everything a renderer draws for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    /// Usage bars.
    Bars {
        /// Bars in display order.
        bars: Vec<BarView>,
        /// Overall flash cadence.
        flash: FlashState,
    },
    /// A single line of text shown in place of the bars.
    Message {
        /// Error that produced the message.
        kind: ErrorKind,
        /// User-facing text.
        text: String,
    },
}

impl ViewState {
    /// Bars, or an empty slice for a message.
    pub fn bars(&self) -> &[BarView] {
        match self {
            Self::Bars { bars, .. } => bars,
            Self::Message { .. } => &[],
        }
    }

    /// Flash cadence; messages never flash.
    pub fn flash(&self) -> FlashState {
        match self {
            Self::Bars { flash, .. } => *flash,
            Self::Message { .. } => FlashState::None,
        }
    }

    /// The message text, if this is a message.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message { text, .. } => Some(text),
            Self::Bars { .. } => None,
        }
    }
}
