//! System probes feeding the sampler.
//!
//! # Responsibilities
//! - Read connection count and request counter from the server status page
//! - Read CPU% / memory% of the server processes from the process table
//! - Read interface byte counters from `/proc/net/dev`
//! - Turn monotonically increasing counters into per-second rates
//!
//! # Design Decisions
//! - Each probe fails independently; the sampler maps failures to zero
//! - The first reading of any counter yields a rate of 0
//! - A counter that goes backwards (server restart) yields 0 and re-bases

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;

/// Error raised by a single probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("status request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("`{program}` exited with {status}")]
    Command { program: String, status: String },

    #[error("unexpected probe output: {0}")]
    Parse(String),

    #[error("probe timed out")]
    Timeout,
}

/// Connection figures reported by the server status interface.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServerStatus {
    pub active_connections: u64,
    pub requests_per_second: f64,
}

/// Interface throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bandwidth {
    pub in_bytes_per_sec: u64,
    pub out_bytes_per_sec: u64,
}

#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn server_status(&self) -> Result<ServerStatus, ProbeError>;
}

#[async_trait]
pub trait CpuProbe: Send + Sync {
    async fn cpu_percent(&self) -> Result<f64, ProbeError>;
}

#[async_trait]
pub trait MemoryProbe: Send + Sync {
    async fn memory_percent(&self) -> Result<f64, ProbeError>;
}

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn bandwidth(&self) -> Result<Bandwidth, ProbeError>;
}

/// Converts successive counter readings into a per-second rate.
#[derive(Debug, Default)]
pub struct CounterRate {
    last: Mutex<Option<(u64, Instant)>>,
}

impl CounterRate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` observed at `now` and return the rate since the previous reading.
    pub fn observe(&self, value: u64, now: Instant) -> f64 {
        let mut last = self.last.lock();
        let rate = match *last {
            Some((previous, at)) if value >= previous => {
                let elapsed = now.saturating_duration_since(at).as_secs_f64();
                if elapsed > 0.0 {
                    (value - previous) as f64 / elapsed
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };
        *last = Some((value, now));
        rate
    }
}

/// Reads the server's `stub_status` page.
pub struct StubStatusProbe {
    client: reqwest::Client,
    url: String,
    requests: CounterRate,
}

impl StubStatusProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            requests: CounterRate::new(),
        }
    }
}

#[async_trait]
impl StatusProbe for StubStatusProbe {
    async fn server_status(&self) -> Result<ServerStatus, ProbeError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let (active_connections, total_requests) = parse_stub_status(&body)?;

        Ok(ServerStatus {
            active_connections,
            requests_per_second: self.requests.observe(total_requests, Instant::now()),
        })
    }
}

/// Parse a `stub_status` page into (active connections, total requests).
///
/// ```text
/// Active connections: 291
/// server accepts handled requests
///  16630948 16630948 31070465
/// Reading: 6 Writing: 179 Waiting: 106
/// ```
pub fn parse_stub_status(body: &str) -> Result<(u64, u64), ProbeError> {
    let mut active = None;
    let mut requests = None;

    for line in body.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Active connections:") {
            active = value.trim().parse().ok();
            continue;
        }
        let counters: Vec<u64> = line
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .unwrap_or_default();
        if counters.len() == 3 {
            requests = Some(counters[2]);
        }
    }

    match (active, requests) {
        (Some(active), Some(requests)) => Ok((active, requests)),
        _ => Err(ProbeError::Parse("missing stub_status fields".to_string())),
    }
}

/// How long one process-table reading serves both CPU and memory queries.
const SNAPSHOT_MAX_AGE: Duration = Duration::from_millis(500);

/// CPU and memory share of the server processes, via `ps`.
///
/// CPU and memory come from one `ps` run. The reading is cached briefly so
/// both queries of one sample see the same snapshot; a query arriving while
/// a run is in flight waits for it instead of starting another.
pub struct PsProcessProbe {
    program: String,
    process_name: String,
    max_age: Duration,
    snapshot: AsyncMutex<Option<(Instant, (f64, f64))>>,
}

impl PsProcessProbe {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            program: "ps".to_string(),
            process_name: process_name.into(),
            max_age: SNAPSHOT_MAX_AGE,
            snapshot: AsyncMutex::new(None),
        }
    }

    /// Run `program` instead of `ps`; it receives the same arguments.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Summed `(cpu, mem)` for the process name, shared within `max_age`.
    pub async fn read(&self) -> Result<(f64, f64), ProbeError> {
        let mut snapshot = self.snapshot.lock().await;
        if let Some((taken, reading)) = *snapshot {
            if taken.elapsed() < self.max_age {
                return Ok(reading);
            }
        }

        let reading = self.run().await?;
        *snapshot = Some((Instant::now(), reading));
        Ok(reading)
    }

    async fn run(&self) -> Result<(f64, f64), ProbeError> {
        let output = Command::new(&self.program)
            .args(["-C", &self.process_name, "-o", "%cpu=,%mem="])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(ProbeError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
            });
        }
        parse_ps_columns(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl CpuProbe for PsProcessProbe {
    async fn cpu_percent(&self) -> Result<f64, ProbeError> {
        Ok(self.read().await?.0)
    }
}

#[async_trait]
impl MemoryProbe for PsProcessProbe {
    async fn memory_percent(&self) -> Result<f64, ProbeError> {
        Ok(self.read().await?.1)
    }
}

/// Sum `%cpu %mem` rows across processes.
pub fn parse_ps_columns(output: &str) -> Result<(f64, f64), ProbeError> {
    let mut cpu = 0.0;
    let mut mem = 0.0;
    let mut rows = 0;

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let mut columns = line.split_whitespace();
        let (Some(c), Some(m)) = (columns.next(), columns.next()) else {
            return Err(ProbeError::Parse(format!("short ps row: {line:?}")));
        };
        cpu += c.parse::<f64>().map_err(|e| ProbeError::Parse(e.to_string()))?;
        mem += m.parse::<f64>().map_err(|e| ProbeError::Parse(e.to_string()))?;
        rows += 1;
    }

    if rows == 0 {
        return Err(ProbeError::Parse("no matching processes".to_string()));
    }
    Ok((cpu, mem))
}

/// Interface throughput from `/proc/net/dev`.
pub struct ProcNetDevProbe {
    path: PathBuf,
    interface: String,
    received: CounterRate,
    transmitted: CounterRate,
}

impl ProcNetDevProbe {
    pub fn new(interface: impl Into<String>) -> Self {
        Self::with_path("/proc/net/dev", interface)
    }

    pub fn with_path(path: impl Into<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            interface: interface.into(),
            received: CounterRate::new(),
            transmitted: CounterRate::new(),
        }
    }
}

#[async_trait]
impl NetworkProbe for ProcNetDevProbe {
    async fn bandwidth(&self) -> Result<Bandwidth, ProbeError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let (rx, tx) = parse_net_dev(&content, &self.interface)
            .ok_or_else(|| ProbeError::Parse(format!("interface {} not listed", self.interface)))?;
        let now = Instant::now();

        Ok(Bandwidth {
            in_bytes_per_sec: self.received.observe(rx, now) as u64,
            out_bytes_per_sec: self.transmitted.observe(tx, now) as u64,
        })
    }
}

/// Extract (received bytes, transmitted bytes) for `interface`.
pub fn parse_net_dev(content: &str, interface: &str) -> Option<(u64, u64)> {
    content.lines().find_map(|line| {
        let (name, counters) = line.split_once(':')?;
        if name.trim() != interface {
            return None;
        }
        let fields: Vec<u64> = counters
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<_, _>>()
            .ok()?;
        Some((*fields.first()?, *fields.get(8)?))
    })
}
