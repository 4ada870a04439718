//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the portal.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Service origin used when neither the config file nor the environment
/// provides one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// Root configuration for the claim portal.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PortalConfig {
    /// Claim-issuance service location and endpoints.
    pub service: ServiceConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Workflow policy switches.
    pub workflow: WorkflowConfig,

    /// Audit log settings.
    pub audit: AuditConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Claim-issuance service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the issuance service (e.g., "https://claims.example.com").
    pub base_url: String,

    /// Verify endpoint, relative to `base_url` or absolute.
    pub verify_path: String,

    /// Claim/process endpoint, relative to `base_url` or absolute.
    pub claim_path: String,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_path: "/api/claim/verify".to_string(),
            claim_path: "/api/claim/process".to_string(),
            use_system_proxy: true,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the verify endpoint.
    pub fn verify_url(&self) -> String {
        join_endpoint(&self.base_url, &self.verify_path)
    }

    /// Full URL of the claim/process endpoint.
    pub fn claim_url(&self) -> String {
        join_endpoint(&self.base_url, &self.claim_path)
    }
}

/// Resolve an endpoint against the base URL. Absolute endpoints win.
pub fn join_endpoint(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Timeout configuration for calls to the issuance service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request deadline (send + full body read) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Workflow policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Accept identities without a claim token (email-only eligibility check).
    pub allow_email_only: bool,
}

/// Audit log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Mask wallet secrets in recorded entries. Off by default: the log is
    /// the raw wire trace.
    pub redact_secrets: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("human" or "json").
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "human".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.service.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeouts.request_secs, 30);
        assert!(!config.workflow.allow_email_only);
        assert!(!config.audit.redact_secrets);
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            join_endpoint("https://api.example.com/", "/api/claim/verify"),
            "https://api.example.com/api/claim/verify"
        );
        assert_eq!(
            join_endpoint("https://api.example.com/v2", "api/claim/process"),
            "https://api.example.com/v2/api/claim/process"
        );
        assert_eq!(
            join_endpoint("https://api.example.com", "https://other.example.com/verify"),
            "https://other.example.com/verify"
        );
    }

    #[test]
    fn test_partial_toml() {
        let config: PortalConfig = toml::from_str(
            r#"
            [service]
            base_url = "https://claims.example.com"

            [workflow]
            allow_email_only = true
            "#,
        )
        .unwrap();
        assert_eq!(config.service.base_url, "https://claims.example.com");
        assert_eq!(config.service.verify_path, "/api/claim/verify");
        assert!(config.workflow.allow_email_only);
        assert_eq!(config.observability.log_format, "human");
    }
}
