//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::PortalConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `service.base_url`.
pub const BASE_URL_ENV_VAR: &str = "CLAIM_PORTAL_API_URL";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
///
/// A missing `path` means "defaults only".
pub fn load_config(path: Option<&Path>) -> Result<PortalConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path).map_err(ConfigError::Io)?)?,
        None => PortalConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        base_url = %config.service.base_url,
        allow_email_only = config.workflow.allow_email_only,
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<PortalConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Apply environment overrides using the given lookup.
///
/// Blank values are ignored so an exported-but-empty variable does not wipe
/// the configured origin.
pub fn apply_env_overrides<F>(config: &mut PortalConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(BASE_URL_ENV_VAR) {
        let url = url.trim();
        if !url.is_empty() {
            config.service.base_url = url.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override() {
        let mut config = PortalConfig::default();
        apply_env_overrides(&mut config, |key| {
            (key == BASE_URL_ENV_VAR).then(|| "https://claims.example.com".to_string())
        });
        assert_eq!(config.service.base_url, "https://claims.example.com");
    }

    #[test]
    fn test_blank_env_ignored() {
        let mut config = PortalConfig::default();
        apply_env_overrides(&mut config, |_| Some("   ".to_string()));
        assert_eq!(config.service.base_url, crate::config::schema::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("claim-portal-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "[timeouts]\nrequest_secs = 12\n\n[workflow]\nallow_email_only = true\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.timeouts.request_secs, 12);
        assert!(config.workflow.allow_email_only);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_invalid_file_rejected() {
        let path = std::env::temp_dir().join(format!("claim-portal-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[timeouts]\nrequest_secs = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("request_secs"));

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_config("[service\nbase_url = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
