//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use headroom_core::{ErrorKind, PollResult, UsageSnapshot, ViewState};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one poll.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport<'a> {
    /// What a renderer would draw.
    pub view: &'a ViewState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput>,
    #[serde(serialize_with = "serialize_datetime")]
    pub fetched_at: DateTime<Utc>,
}

/// A poll error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub kind: ErrorKind,
    pub message: String,
}

impl<'a> UsageReport<'a> {
    /// Builds a report from one tick.
    pub fn new(result: &PollResult, view: &'a ViewState, fetched_at: DateTime<Utc>) -> Self {
        let usage = match result {
            PollResult::Standard(u) => Some(UsageSnapshot::Standard(u.clone())),
            PollResult::Unified(u) => Some(UsageSnapshot::Unified(u.clone())),
            PollResult::Error(_) => None,
        };
        let error = result.error().map(|e| ErrorOutput {
            kind: e.kind(),
            message: e.to_string(),
        });
        Self {
            view,
            summary: usage.as_ref().map(UsageSnapshot::summary),
            usage,
            error,
            fetched_at,
        }
    }
}

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable data.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats one poll.
    pub fn format_report(
        &self,
        result: &PollResult,
        view: &ViewState,
        fetched_at: DateTime<Utc>,
    ) -> Result<String> {
        self.format(&UsageReport::new(result, view, fetched_at))
    }
}
