//! HTTP transport backed by reqwest.
//!
//! # Responsibilities
//! - POST JSON payloads to the issuance service
//! - Enforce connect timeout and request deadline
//! - Record every request and its outcome in the audit log before returning
//! - Classify network failures as transport errors; HTTP errors are results

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::{ServiceConfig, TimeoutConfig};
use crate::observability::{metrics, AuditLog};
use crate::resilience::with_deadline;
use crate::transport::types::{RawResponse, TransportError};
use crate::transport::Transport;

/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// reqwest-based [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    audit: AuditLog,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `service` with the configured timeouts,
    /// recording into `audit`.
    pub fn new(
        service: &ServiceConfig,
        timeouts: &TimeoutConfig,
        audit: AuditLog,
    ) -> Result<Self, TransportError> {
        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
        if !service.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            audit,
            connect_timeout,
            request_timeout: Duration::from_secs(timeouts.request_secs),
        })
    }

    /// Override the request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The audit log this transport records into.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    async fn execute(
        &self,
        url: &str,
        payload: &Value,
        request_id: &str,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<non-ascii>").to_string(),
                )
            })
            .collect();

        let body = response.text().await.map_err(|e| TransportError::Body {
            url: url.to_string(),
            cause: e.to_string(),
        })?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn classify(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                secs: self.connect_timeout.as_secs(),
            }
        } else if e.is_connect() {
            TransportError::Connect {
                url: url.to_string(),
                cause: e.to_string(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                cause: e.to_string(),
            }
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, endpoint: &str, payload: &Value) -> Result<RawResponse, TransportError> {
        let request_id = Uuid::new_v4().to_string();
        self.audit.record(
            "Sending request",
            json!({ "requestId": request_id, "url": endpoint, "payload": payload }),
        );
        tracing::debug!(request_id = %request_id, url = %endpoint, "Sending request");

        let started = Instant::now();
        let result = match with_deadline(
            self.request_timeout,
            self.execute(endpoint, payload, &request_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                url: endpoint.to_string(),
                secs: self.request_timeout.as_secs(),
            }),
        };
        let elapsed = started.elapsed();

        match &result {
            Ok(response) => {
                metrics::record_request(endpoint, "response", elapsed);
                tracing::debug!(
                    request_id = %request_id,
                    status = response.status,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Response received"
                );
                self.audit.record(
                    "Response received",
                    json!({
                        "requestId": request_id,
                        "url": endpoint,
                        "status": response.status,
                        "headers": response.headers,
                        "body": response.body,
                        "elapsedMs": elapsed.as_millis() as u64,
                    }),
                );
            }
            Err(e) => {
                metrics::record_request(endpoint, "transport_error", elapsed);
                tracing::warn!(request_id = %request_id, error = %e, "Request failed");
                self.audit.record(
                    "Transport error",
                    json!({
                        "requestId": request_id,
                        "url": endpoint,
                        "error": e.to_string(),
                        "elapsedMs": elapsed.as_millis() as u64,
                    }),
                );
            }
        }

        result
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
