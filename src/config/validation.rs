//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, limits consistent)
//! - Check addresses parse before anything binds them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConsoleConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ConsoleConfig;

/// One semantic problem, tagged with the offending key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &ConsoleConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let paths: [(&'static str, &Path); 5] = [
        ("nginx.sites_available", &config.nginx.sites_available),
        ("nginx.sites_enabled", &config.nginx.sites_enabled),
        ("nginx.conf_d", &config.nginx.conf_d),
        ("nginx.ssl_dir", &config.nginx.ssl_dir),
        ("logs.access_log", &config.logs.access_log),
    ];
    for (field, path) in paths {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(field, "path must not be empty"));
        }
    }

    let names = [
        ("nginx.extension", &config.nginx.extension),
        ("nginx.binary", &config.nginx.binary),
        ("certificates.certbot_binary", &config.certificates.certbot_binary),
        ("metrics.status_url", &config.metrics.status_url),
        ("metrics.process_name", &config.metrics.process_name),
        ("metrics.interface", &config.metrics.interface),
    ];
    for (field, value) in names {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }
    if config.nginx.extension.starts_with('.') {
        errors.push(ValidationError::new("nginx.extension", "give the extension without a leading dot"));
    }

    if config.logs.read_limit == 0 {
        errors.push(ValidationError::new("logs.read_limit", "must be greater than zero"));
    }
    if config.logs.stats_limit < config.logs.read_limit {
        errors.push(ValidationError::new(
            "logs.stats_limit",
            format!(
                "must be at least logs.read_limit ({} < {})",
                config.logs.stats_limit, config.logs.read_limit
            ),
        ));
    }
    if config.logs.default_window_minutes == 0 {
        errors.push(ValidationError::new("logs.default_window_minutes", "must be greater than zero"));
    }

    if config.metrics.interval_ms == 0 {
        errors.push(ValidationError::new("metrics.interval_ms", "must be greater than zero"));
    }
    if config.metrics.subscriber_buffer == 0 {
        errors.push(ValidationError::new("metrics.subscriber_buffer", "must be greater than zero"));
    }
    if config.metrics.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("metrics.probe_timeout_ms", "must be greater than zero"));
    }

    if config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("invalid socket address {:?}", config.admin.bind_address),
        ));
    }
    if config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty"));
    }
    if config.admin.request_timeout_secs == 0 {
        errors.push(ValidationError::new("admin.request_timeout_secs", "must be greater than zero"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("expected \"pretty\" or \"json\", got {:?}", config.observability.log_format),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&ConsoleConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ConsoleConfig::default();
        config.nginx.conf_d = PathBuf::new();
        config.logs.read_limit = 500;
        config.logs.stats_limit = 100;
        config.metrics.interval_ms = 0;
        config.admin.bind_address = "localhost".to_string();
        config.admin.api_key = " ".to_string();
        config.observability.log_format = "xml".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "nginx.conf_d",
                "logs.stats_limit",
                "metrics.interval_ms",
                "admin.bind_address",
                "admin.api_key",
                "observability.log_format",
            ]
        );
    }

    #[test]
    fn test_metrics_address_ignored_when_disabled() {
        let mut config = ConsoleConfig::default();
        config.observability.metrics_enabled = false;
        config.observability.metrics_address = "nope".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
