//! Metrics collection.
//!
//! # Metrics
//! - `claim_portal_requests_total` (counter): issuance-service calls by endpoint path, outcome
//! - `claim_portal_request_duration_seconds` (histogram): call latency by endpoint path
//! - `claim_portal_phase_total` (counter): workflow phase outcomes by phase, outcome
//!
//! # Design Decisions
//! - No exporter is installed here; the embedding application owns the recorder
//! - Without a recorder every call is a no-op
//! - The endpoint label is the URL path only, so hosts and query strings never
//!   reach the label set

use std::time::Duration;

use url::Url;

/// Record one call to the issuance service.
pub fn record_request(endpoint: &str, outcome: &'static str, elapsed: Duration) {
    let label = endpoint_label(endpoint);
    metrics::counter!(
        "claim_portal_requests_total",
        "endpoint" => label.clone(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "claim_portal_request_duration_seconds",
        "endpoint" => label
    )
    .record(elapsed.as_secs_f64());
}

fn endpoint_label(endpoint: &str) -> String {
    match Url::parse(endpoint) {
        Ok(url) => url.path().to_string(),
        Err(_) => "unknown".to_string(),
    }
}

/// Record the outcome of a workflow phase.
pub fn record_phase(phase: &'static str, outcome: &'static str) {
    metrics::counter!(
        "claim_portal_phase_total",
        "phase" => phase,
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_label_is_path() {
        assert_eq!(
            endpoint_label("https://user:pw@claims.example.com:8443/api/claim/verify?token=T1"),
            "/api/claim/verify"
        );
        assert_eq!(
            endpoint_label("http://127.0.0.1:40123/api/claim/process"),
            "/api/claim/process"
        );
        assert_eq!(endpoint_label("not a url"), "unknown");
    }

    #[test]
    fn test_record_without_recorder() {
        record_request("http://localhost/api/claim/verify", "response", Duration::from_millis(5));
        record_phase("verify", "ok");
    }
}
