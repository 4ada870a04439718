//! Transport result and error types.

use std::collections::BTreeMap;

use thiserror::Error;

/// An HTTP response exactly as received: the body is not pre-parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
    /// Raw body text (JSON or plain text).
    pub body: String,
}

impl RawResponse {
    /// Build a response without headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was obtained from the service.
///
/// A 4xx/5xx reply is a successful transport result, never one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Setup(String),

    /// No response before the request deadline.
    #[error("request to {url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    /// DNS failure, connection refused, TLS failure.
    #[error("could not connect to {url}: {cause}")]
    Connect { url: String, cause: String },

    /// Any other failure while sending.
    #[error("request to {url} failed: {cause}")]
    Request { url: String, cause: String },

    /// The status line arrived but the body could not be read.
    #[error("failed to read response from {url}: {cause}")]
    Body { url: String, cause: String },
}

impl TransportError {
    /// Human-readable cause without the URL.
    pub fn cause(&self) -> String {
        match self {
            TransportError::Setup(cause) => cause.clone(),
            TransportError::Timeout { secs, .. } => format!("timed out after {} seconds", secs),
            TransportError::Connect { cause, .. }
            | TransportError::Request { cause, .. }
            | TransportError::Body { cause, .. } => cause.clone(),
        }
    }
}
