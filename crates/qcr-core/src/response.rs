//! Inbound response envelopes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Failure reason used when the server sends `success: false` without a
/// `message`.
pub const GENERIC_FAILURE: &str = "Command failed";

/// A response envelope: `{"command", "success", ...result fields | "message"}`.
///
/// `command` is kept as the raw wire string so frames naming commands this
/// client does not know still parse and can be reported as unmatched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Echo of the originating request's command.
    pub command: String,
    /// A missing flag counts as failure.
    #[serde(default)]
    pub success: bool,
    /// Failure reason, or an informational banner on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Command-specific result fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A frame that cannot be correlated with any call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("malformed response frame: {reason}")]
pub struct MalformedFrame {
    /// What was wrong with the payload.
    pub reason: String,
}

impl ResponseEnvelope {
    /// Parse a raw text frame.
    ///
    /// Fails when the payload is not a JSON object or has no string
    /// `command` field.
    pub fn parse(text: &str) -> Result<Self, MalformedFrame> {
        let value: Value = serde_json::from_str(text).map_err(|e| MalformedFrame {
            reason: format!("invalid JSON: {e}"),
        })?;
        match value.get("command") {
            Some(Value::String(_)) => {}
            Some(_) => {
                return Err(MalformedFrame {
                    reason: "command is not a string".into(),
                });
            }
            None if value.is_object() => {
                return Err(MalformedFrame {
                    reason: "missing command field".into(),
                });
            }
            None => {
                return Err(MalformedFrame {
                    reason: "frame is not a JSON object".into(),
                });
            }
        }
        serde_json::from_value(value).map_err(|e| MalformedFrame {
            reason: e.to_string(),
        })
    }

    /// The server's failure message, or [`GENERIC_FAILURE`].
    pub fn failure_message(&self) -> &str {
        self.message.as_deref().unwrap_or(GENERIC_FAILURE)
    }

    /// All result fields as one JSON object, `message` included.
    pub fn into_payload(self) -> Value {
        let mut fields = self.fields;
        if let Some(message) = self.message {
            let _ = fields.insert("message".into(), Value::String(message));
        }
        Value::Object(fields)
    }

    /// Decode the result fields into a typed record.
    pub fn decode<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(self.into_payload())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parse_success_frame_keeps_fields() {
        let env = ResponseEnvelope::parse(
            r#"{"command":"get_intervals","success":true,"cdf_min":[0.1],"cdf_max":[0.2]}"#,
        )
        .unwrap();
        assert_eq!(env.command, "get_intervals");
        assert!(env.success);
        assert_eq!(env.fields["cdf_min"], json!([0.1]));
        assert_eq!(env.fields.len(), 2);
    }

    #[test]
    fn missing_success_is_failure() {
        let env = ResponseEnvelope::parse(r#"{"command":"about"}"#).unwrap();
        assert!(!env.success);
        assert_eq!(env.failure_message(), GENERIC_FAILURE);
    }

    #[test]
    fn failure_message_is_verbatim() {
        let env =
            ResponseEnvelope::parse(r#"{"command":"get_pdf","success":false,"message":"fit failed"}"#)
                .unwrap();
        assert_eq!(env.failure_message(), "fit failed");
    }

    #[test]
    fn unknown_command_still_parses() {
        let env = ResponseEnvelope::parse(r#"{"command":"reticulate","success":true}"#).unwrap();
        assert_eq!(env.command, "reticulate");
    }

    #[test]
    fn rejects_non_json() {
        assert_matches!(
            ResponseEnvelope::parse("not json"),
            Err(MalformedFrame { ref reason }) if reason.starts_with("invalid JSON")
        );
    }

    #[test]
    fn rejects_missing_command() {
        let err = ResponseEnvelope::parse(r#"{"success":true}"#).unwrap_err();
        assert_eq!(err.reason, "missing command field");
    }

    #[test]
    fn rejects_non_string_command() {
        assert_matches!(
            ResponseEnvelope::parse(r#"{"command":3}"#),
            Err(MalformedFrame { ref reason }) if reason == "command is not a string"
        );
    }

    #[test]
    fn rejects_array_frame() {
        let err = ResponseEnvelope::parse("[1,2]").unwrap_err();
        assert_eq!(err.reason, "frame is not a JSON object");
    }

    #[test]
    fn payload_reinserts_message() {
        let env = ResponseEnvelope::parse(
            r#"{"command":"about","success":true,"message":"banner","version":"0.3.1"}"#,
        )
        .unwrap();
        assert_eq!(
            env.into_payload(),
            json!({"message": "banner", "version": "0.3.1"})
        );
    }
}
