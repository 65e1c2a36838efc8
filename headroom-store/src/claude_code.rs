//! Claude Code credential import.
//!
//! Claude Code caches its OAuth tokens in `~/.claude/.credentials.json`.
//! Several layouts exist in the wild:
//!
//! ```json
//! { "claudeAiOauth": { "accessToken": "...", "refreshToken": "...", "expiresAt": 1735000000000 } }
//! { "default": { "accessToken": "...", ... } }
//! { "accessToken": "...", ... }
//! { "<provider>": { "accessToken": "...", ... } }
//! ```
//!
//! `expiresAt` is usually milliseconds; anything above 10^12 is treated as
//! such and converted to seconds.

use std::path::{Path, PathBuf};

use headroom_core::OAuthTokens;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::StoreError;

/// Epoch values above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Returns `~/.claude/.credentials.json`.
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
        .join(".credentials.json")
}

/// Reads and parses a Claude Code credentials file.
///
/// # Errors
///
/// Returns [`StoreError::CredentialsNotFound`] if the file is missing and
/// [`StoreError::InvalidCredentials`] if it holds no access token.
#[instrument]
pub async fn load_claude_code_credentials(path: &Path) -> Result<OAuthTokens, StoreError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Claude Code credentials file not found");
            return Err(StoreError::CredentialsNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    parse_credentials(&content)
}

/// Parses the contents of a Claude Code credentials file.
///
/// # Errors
///
/// Returns error if the JSON is malformed or no entry carries an access token.
pub fn parse_credentials(content: &str) -> Result<OAuthTokens, StoreError> {
    let root: Value = serde_json::from_str(content)?;
    let Some(object) = root.as_object() else {
        return Err(StoreError::InvalidCredentials(
            "credentials file is not a JSON object".to_string(),
        ));
    };

    let Some(entry) = find_entry(object) else {
        warn!("No accessToken found in Claude Code credentials");
        return Err(StoreError::InvalidCredentials(
            "no accessToken found".to_string(),
        ));
    };

    let access_token = entry
        .get("accessToken")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let refresh_token = entry
        .get("refreshToken")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let expires_at = entry.get("expiresAt").map_or(0, normalize_expiry);

    debug!(expires_at, "Parsed Claude Code credentials");
    Ok(OAuthTokens::new(access_token, refresh_token, expires_at))
}

fn has_access_token(entry: &Map<String, Value>) -> bool {
    entry
        .get("accessToken")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.is_empty())
}

fn find_entry(object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    let keyed = ["claudeAiOauth", "default"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_object));
    let flat = std::iter::once(object);
    let any = object.values().filter_map(Value::as_object);

    keyed.chain(flat).chain(any).find(|entry| has_access_token(entry))
}

/// Converts an `expiresAt` value to epoch seconds.
fn normalize_expiry(value: &Value) -> i64 {
    // Fractional timestamps only ever carry sub-second noise.
    #[allow(clippy::cast_possible_truncation)]
    let raw = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .unwrap_or(0);
    if raw > MILLIS_THRESHOLD { raw / 1000 } else { raw }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_ai_oauth_layout() {
        let tokens = parse_credentials(
            r#"{"claudeAiOauth": {"accessToken": "a", "refreshToken": "r", "expiresAt": 1750000000000, "scopes": ["user:inference"]}}"#,
        )
        .unwrap();
        assert_eq!(tokens.access_token, "a");
        assert_eq!(tokens.refresh_token(), Some("r"));
        assert_eq!(tokens.expires_at, 1_750_000_000);
    }

    #[test]
    fn test_default_layout() {
        let tokens =
            parse_credentials(r#"{"default": {"accessToken": "d", "expiresAt": 1750000000}}"#)
                .unwrap();
        assert_eq!(tokens.access_token, "d");
        assert_eq!(tokens.refresh_token(), None);
        assert_eq!(tokens.expires_at, 1_750_000_000);
    }

    #[test]
    fn test_flat_layout() {
        let tokens =
            parse_credentials(r#"{"accessToken": "f", "refreshToken": "r"}"#).unwrap();
        assert_eq!(tokens.access_token, "f");
        assert_eq!(tokens.expires_at, 0);
    }

    #[test]
    fn test_first_provider_entry() {
        let tokens = parse_credentials(
            r#"{"mcpOAuth": {"server": "x"}, "someProvider": {"accessToken": "p"}}"#,
        )
        .unwrap();
        assert_eq!(tokens.access_token, "p");
    }

    #[test]
    fn test_fractional_millis() {
        let tokens =
            parse_credentials(r#"{"accessToken": "f", "expiresAt": 1750000000123.0}"#).unwrap();
        assert_eq!(tokens.expires_at, 1_750_000_000);
    }

    #[test]
    fn test_no_access_token() {
        let err = parse_credentials(r#"{"default": {"refreshToken": "r"}}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCredentials(_)));
    }

    #[test]
    fn test_not_an_object() {
        let err = parse_credentials("[1, 2]").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_claude_code_credentials(&dir.path().join(".credentials.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_default_path() {
        assert!(default_credentials_path().ends_with(".claude/.credentials.json"));
    }
}
