//! Bundle metadata and action log models.
//!
//! These are the documents stored as `meta.json` and as the lines of
//! `aal.ndjson`. Absent optional fields are omitted on write, never
//! serialized as `null`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BundleError, Result};

/// Free-form JSON object carried by action log entries.
pub type JsonObject = Map<String, Value>;

/// Identity and provenance record written as `meta.json`.
///
/// Field order here is the serialized key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub bundle_id: String,
    #[serde(rename = "version")]
    pub format_version: String,
    #[serde(rename = "timestamp")]
    pub created_at: String,
    pub system_info: SystemInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_sha256: Option<String>,
}

/// The system under audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub operator: String,
}

/// One observed action, written as a single compact line of `aal.ndjson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<JsonObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonObject>,
}

impl BundleMetadata {
    /// Parse metadata from JSON bytes.
    ///
    /// This is the strict reading; the verifier inspects raw JSON instead so
    /// that partially conformant documents can still be scored.
    pub fn from_json(json_bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(json_bytes).map_err(|e| BundleError::malformed("meta.json", e))
    }

    /// Pretty-printed JSON document as stored in the archive.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ActionLogEntry {
    /// Compact single-line JSON form.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Current UTC time, second precision, with a `Z` designator.
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Loose ISO-8601 check: a string with a `T` between date and time.
///
/// No calendar validation is attempted.
pub fn is_iso8601_like(value: &Value) -> bool {
    value.as_str().map(|s| s.contains('T')).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_meta() -> BundleMetadata {
        BundleMetadata {
            bundle_id: "b1".into(),
            format_version: "0.1".into(),
            created_at: "2025-11-19T12:00:00Z".into(),
            system_info: SystemInfo {
                name: "N".into(),
                version: "v".into(),
                operator: "Op".into(),
            },
            incident_time: None,
            incident_summary: None,
            tags: None,
            disclaimer: None,
            bundle_sha256: None,
        }
    }

    #[test]
    fn test_meta_key_order_and_omission() {
        let mut meta = sample_meta();
        meta.tags = Some(vec!["demo".into()]);
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(
            json,
            r#"{"bundle_id":"b1","version":"0.1","timestamp":"2025-11-19T12:00:00Z","system_info":{"name":"N","version":"v","operator":"Op"},"tags":["demo"]}"#
        );
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_meta_from_json_rejects_missing_system_info() {
        let raw = br#"{"bundle_id":"b1","version":"0.1","timestamp":"2025-11-19T12:00:00Z"}"#;
        let err = BundleMetadata::from_json(raw).unwrap_err();
        assert!(matches!(err, BundleError::MalformedContent { .. }));
    }

    #[test]
    fn test_entry_line_omits_absent_objects() {
        let mut input = JsonObject::new();
        input.insert("text".into(), json!("hi"));
        let entry = ActionLogEntry {
            timestamp: "2025-11-19T12:00:00Z".into(),
            actor: "user".into(),
            action: "send_message".into(),
            input: Some(input),
            output: None,
            metadata: None,
        };
        assert_eq!(
            entry.to_json_line().unwrap(),
            r#"{"timestamp":"2025-11-19T12:00:00Z","actor":"user","action":"send_message","input":{"text":"hi"}}"#
        );
    }

    #[test]
    fn test_iso_now_shape() {
        let now = iso_now();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2025-11-19T12:00:00Z".len());
        assert!(is_iso8601_like(&Value::String(now)));
    }

    #[test]
    fn test_iso8601_like_is_loose() {
        assert!(is_iso8601_like(&json!("2025-11-19T12:00:00Z")));
        assert!(is_iso8601_like(&json!("nonsenseTstuff")));
        assert!(!is_iso8601_like(&json!("2025-11-19 12:00:00")));
        assert!(!is_iso8601_like(&json!(1732017600)));
    }
}
