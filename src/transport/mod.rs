//! Transport to the claim-issuance service.
//!
//! # Data Flow
//! ```text
//! workflow (endpoint URL + JSON payload)
//!     → Transport::send
//!     → audit log (request)
//!     → HTTP POST with deadline
//!     → audit log (status, headers, raw body | transport error)
//!     → RawResponse | TransportError
//! ```
//!
//! # Design Decisions
//! - Bodies are returned as raw text; interpretation belongs to `normalize`
//! - 4xx/5xx are successful transport results
//! - The trait seam lets the workflow run against a scripted transport

pub mod client;
pub mod types;

use std::future::Future;

use serde_json::Value;

pub use client::HttpTransport;
pub use types::{RawResponse, TransportError};

/// Sends one JSON request and returns the raw reply.
pub trait Transport: Send + Sync {
    /// POST `payload` to `endpoint` (an absolute URL).
    fn send(
        &self,
        endpoint: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}
