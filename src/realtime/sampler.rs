//! Draws one metrics sample from the system probes.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::MetricsConfig;
use crate::observability::metrics;
use crate::realtime::probes::{
    CpuProbe, MemoryProbe, NetworkProbe, ProbeError, ProcNetDevProbe, PsProcessProbe, StatusProbe,
    StubStatusProbe,
};
use crate::realtime::sample::MetricsSample;

/// Default upper bound for a single probe call.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(800);

/// Produces [`MetricsSample`]s; a failed or slow probe contributes zero.
#[derive(Clone)]
pub struct MetricsSampler {
    status: Arc<dyn StatusProbe>,
    cpu: Arc<dyn CpuProbe>,
    memory: Arc<dyn MemoryProbe>,
    network: Arc<dyn NetworkProbe>,
    probe_timeout: Duration,
}

impl MetricsSampler {
    pub fn new(
        status: Arc<dyn StatusProbe>,
        cpu: Arc<dyn CpuProbe>,
        memory: Arc<dyn MemoryProbe>,
        network: Arc<dyn NetworkProbe>,
    ) -> Self {
        Self {
            status,
            cpu,
            memory,
            network,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Build a sampler backed by the status page, `ps` and `/proc/net/dev`.
    pub fn from_config(config: &MetricsConfig) -> Self {
        let process = Arc::new(PsProcessProbe::new(config.process_name.clone()));
        Self::new(
            Arc::new(StubStatusProbe::new(config.status_url.clone())),
            process.clone(),
            process,
            Arc::new(ProcNetDevProbe::new(config.interface.clone())),
        )
        .with_probe_timeout(Duration::from_millis(config.probe_timeout_ms))
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Run all probes concurrently and assemble one sample.
    pub async fn sample(&self) -> MetricsSample {
        let started = Instant::now();
        let timestamp = Utc::now();

        let (status, cpu, memory, bandwidth) = tokio::join!(
            bounded("status", self.probe_timeout, self.status.server_status()),
            bounded("cpu", self.probe_timeout, self.cpu.cpu_percent()),
            bounded("memory", self.probe_timeout, self.memory.memory_percent()),
            bounded("network", self.probe_timeout, self.network.bandwidth()),
        );

        metrics::record_sample(started);

        MetricsSample {
            timestamp,
            active_connections: status.active_connections,
            requests_per_second: status.requests_per_second,
            cpu_usage_percent: cpu,
            memory_usage_percent: memory,
            bandwidth_in_bytes_per_sec: bandwidth.in_bytes_per_sec,
            bandwidth_out_bytes_per_sec: bandwidth.out_bytes_per_sec,
        }
    }
}

async fn bounded<T, F>(probe: &'static str, limit: Duration, call: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, ProbeError>>,
{
    let result = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout),
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(probe, error = %e, "Probe failed, reporting zero");
        metrics::record_probe_failure(probe);
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::probes::{Bandwidth, ServerStatus};
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl StatusProbe for Fixed {
        async fn server_status(&self) -> Result<ServerStatus, ProbeError> {
            Ok(ServerStatus {
                active_connections: 7,
                requests_per_second: 12.5,
            })
        }
    }

    #[async_trait]
    impl CpuProbe for Fixed {
        async fn cpu_percent(&self) -> Result<f64, ProbeError> {
            Ok(3.0)
        }
    }

    #[async_trait]
    impl MemoryProbe for Fixed {
        async fn memory_percent(&self) -> Result<f64, ProbeError> {
            Ok(4.0)
        }
    }

    #[async_trait]
    impl NetworkProbe for Fixed {
        async fn bandwidth(&self) -> Result<Bandwidth, ProbeError> {
            Ok(Bandwidth {
                in_bytes_per_sec: 100,
                out_bytes_per_sec: 200,
            })
        }
    }

    struct Broken;

    #[async_trait]
    impl CpuProbe for Broken {
        async fn cpu_percent(&self) -> Result<f64, ProbeError> {
            Err(ProbeError::Parse("boom".into()))
        }
    }

    #[async_trait]
    impl NetworkProbe for Broken {
        async fn bandwidth(&self) -> Result<Bandwidth, ProbeError> {
            Err(ProbeError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)))
        }
    }

    struct Hanging;

    #[async_trait]
    impl StatusProbe for Hanging {
        async fn server_status(&self) -> Result<ServerStatus, ProbeError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_sample_collects_all_probes() {
        let fixed = Arc::new(Fixed);
        let sampler = MetricsSampler::new(fixed.clone(), fixed.clone(), fixed.clone(), fixed);
        let sample = sampler.sample().await;

        assert_eq!(sample.active_connections, 7);
        assert_eq!(sample.requests_per_second, 12.5);
        assert_eq!(sample.cpu_usage_percent, 3.0);
        assert_eq!(sample.memory_usage_percent, 4.0);
        assert_eq!(sample.bandwidth_in_bytes_per_sec, 100);
        assert_eq!(sample.bandwidth_out_bytes_per_sec, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probes_degrade_to_zero() {
        let fixed = Arc::new(Fixed);
        let sampler = MetricsSampler::new(Arc::new(Hanging), Arc::new(Broken), fixed, Arc::new(Broken))
            .with_probe_timeout(Duration::from_millis(50));
        let sample = sampler.sample().await;

        assert_eq!(sample.active_connections, 0);
        assert_eq!(sample.requests_per_second, 0.0);
        assert_eq!(sample.cpu_usage_percent, 0.0);
        assert_eq!(sample.memory_usage_percent, 4.0);
        assert_eq!(sample.bandwidth_in_bytes_per_sec, 0);
        assert_eq!(sample.bandwidth_out_bytes_per_sec, 0);
    }
}
