//! Raw response normalization.
//!
//! Bodies are parsed as JSON when possible; anything else is wrapped as
//! `{"message": <raw text>}` so non-JSON error pages still surface their text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::transport::RawResponse;

/// User-visible description of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// HTTP status, when a response was received.
    pub http_status: Option<u16>,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(http_status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            http_status,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.http_status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A response reduced to success payload or error description.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// 2xx reply. Service-level success flags inside `payload` are not yet checked.
    Success { status: u16, payload: Value },
    /// Non-2xx reply.
    Failure(ErrorInfo),
}

/// Normalize a raw response. `fallback` is the phase-specific message used
/// when the body carries no usable text.
pub fn normalize(raw: &RawResponse, fallback: &str) -> NormalizedResult {
    let payload = parse_body(&raw.body);

    if raw.is_success() {
        return NormalizedResult::Success {
            status: raw.status,
            payload,
        };
    }

    // Raw text is only worth surfacing when it is not structured JSON.
    let structured = matches!(
        serde_json::from_str::<Value>(&raw.body),
        Ok(Value::Object(_) | Value::Array(_))
    );
    let message = text_field(&payload, "message")
        .or_else(|| text_field(&payload, "error"))
        .or_else(|| if structured { None } else { non_blank(&raw.body) })
        .unwrap_or_else(|| fallback.to_string());

    NormalizedResult::Failure(ErrorInfo::new(Some(raw.status), message))
}

/// Parse a body as JSON, wrapping non-JSON text as `{"message": text}`.
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({ "message": body }))
}

/// `message`, else `error`, else `fallback`, taken from a parsed payload.
pub fn payload_message(payload: &Value, fallback: &str) -> String {
    text_field(payload, "message")
        .or_else(|| text_field(payload, "error"))
        .unwrap_or_else(|| fallback.to_string())
}

fn text_field(payload: &Value, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).and_then(non_blank)
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
