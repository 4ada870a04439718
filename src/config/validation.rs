//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the service URL and endpoint paths
//! - Validate value ranges (timeouts > 0)
//! - Reject unknown log levels and formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PortalConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::PortalConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["human", "json"];

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("service.base_url '{0}' is not a valid http(s) URL")]
    InvalidBaseUrl(String),

    #[error("service.{field} '{value}' must start with '/' or be an absolute URL")]
    InvalidEndpoint { field: &'static str, value: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.log_format '{0}' is not one of human, json")]
    UnknownLogFormat(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &PortalConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_http_url(&config.service.base_url) {
        errors.push(ValidationError::InvalidBaseUrl(
            config.service.base_url.clone(),
        ));
    }

    for (field, value) in [
        ("verify_path", &config.service.verify_path),
        ("claim_path", &config.service.claim_path),
    ] {
        if !value.starts_with('/') && !is_http_url(value) {
            errors.push(ValidationError::InvalidEndpoint {
                field,
                value: value.clone(),
            });
        }
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    let format = config.observability.log_format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ValidationError::UnknownLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host().is_some(),
        Err(_) => false,
    }
}
