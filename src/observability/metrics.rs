//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define console metrics (reloads, site operations, log parsing, sampling)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `console_reloads_total` (counter): server reloads by outcome
//! - `console_site_operations_total` (counter): store operations by operation, outcome
//! - `console_log_lines_total` (counter): access log lines by result (parsed/skipped)
//! - `console_probe_failures_total` (counter): degraded probe readings by probe
//! - `console_hub_subscribers` (gauge): live metrics subscribers
//! - `console_samples_total` (counter): samples taken
//! - `console_sample_duration_seconds` (histogram): time to take one sample
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs a recorder, so tests
//!   and the CLI pay nothing
//! - Label values are static strings; no per-site labels

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

pub fn record_reload(ok: bool) {
    counter!("console_reloads_total", "outcome" => outcome(ok)).increment(1);
}

pub fn record_site_operation(operation: &'static str, ok: bool) {
    counter!(
        "console_site_operations_total",
        "operation" => operation,
        "outcome" => outcome(ok)
    )
    .increment(1);
}

pub fn record_log_lines(parsed: u64, skipped: u64) {
    counter!("console_log_lines_total", "result" => "parsed").increment(parsed);
    counter!("console_log_lines_total", "result" => "skipped").increment(skipped);
}

pub fn record_probe_failure(probe: &'static str) {
    counter!("console_probe_failures_total", "probe" => probe).increment(1);
}

pub fn record_hub_subscribers(count: usize) {
    gauge!("console_hub_subscribers").set(count as f64);
}

pub fn record_sample(started: Instant) {
    counter!("console_samples_total").increment(1);
    histogram!("console_sample_duration_seconds").record(started.elapsed().as_secs_f64());
}
