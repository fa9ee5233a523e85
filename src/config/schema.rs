//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the console.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the console.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Locations of the site trees and the server binary.
    pub nginx: NginxConfig,

    /// Certificate issuance settings.
    pub certificates: CertificatesConfig,

    /// Access log location and read limits.
    pub logs: LogsConfig,

    /// Live metrics sampling.
    pub metrics: MetricsConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Site tree layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NginxConfig {
    /// Staging directory for site files.
    pub sites_available: PathBuf,

    /// Directory holding activation links.
    pub sites_enabled: PathBuf,

    /// Always-active site directory.
    pub conf_d: PathBuf,

    /// Certificate directory.
    pub ssl_dir: PathBuf,

    /// Site file extension, without the dot.
    pub extension: String,

    /// Server binary used for `-s reload` and `-t`.
    pub binary: String,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            sites_available: PathBuf::from("/etc/nginx/sites-available"),
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            conf_d: PathBuf::from("/etc/nginx/conf.d"),
            ssl_dir: PathBuf::from("/etc/nginx/ssl"),
            extension: "conf".to_string(),
            binary: "nginx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CertificatesConfig {
    /// certbot executable.
    pub certbot_binary: String,
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            certbot_binary: "certbot".to_string(),
        }
    }
}

/// Access log settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogsConfig {
    /// Path of the combined-format access log.
    pub access_log: PathBuf,

    /// Most entries returned by a log listing.
    pub read_limit: usize,

    /// Most entries read when computing traffic stats.
    pub stats_limit: usize,

    /// Stats window used when a request does not name one.
    pub default_window_minutes: u32,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            access_log: PathBuf::from("/var/log/nginx/access.log"),
            read_limit: 1000,
            stats_limit: 10_000,
            default_window_minutes: 60,
        }
    }
}

/// Live metrics sampling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Sampling period while at least one subscriber is attached.
    pub interval_ms: u64,

    /// stub_status endpoint.
    pub status_url: String,

    /// Process name passed to `ps -C`.
    pub process_name: String,

    /// Network interface read from `/proc/net/dev`.
    pub interface: String,

    /// Per-subscriber channel capacity for WebSocket clients.
    pub subscriber_buffer: usize,

    /// Upper bound on a single probe call.
    pub probe_timeout_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            status_url: "http://127.0.0.1/nginx_status".to_string(),
            process_name: "nginx".to_string(),
            interface: "eth0".to_string(),
            subscriber_buffer: 16,
            probe_timeout_ms: 800,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin API bind address.
    pub bind_address: String,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Per-request timeout for non-streaming routes.
    pub request_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8081".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: `pretty` or `json`.
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
