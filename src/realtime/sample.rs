//! Point-in-time metrics sample.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One immutable measurement, broadcast to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSample {
    pub timestamp: DateTime<Utc>,
    pub active_connections: u64,
    pub requests_per_second: f64,
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub bandwidth_in_bytes_per_sec: u64,
    pub bandwidth_out_bytes_per_sec: u64,
}

impl MetricsSample {
    /// A sample where every probe failed.
    pub fn zero(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            active_connections: 0,
            requests_per_second: 0.0,
            cpu_usage_percent: 0.0,
            memory_usage_percent: 0.0,
            bandwidth_in_bytes_per_sec: 0,
            bandwidth_out_bytes_per_sec: 0,
        }
    }
}
