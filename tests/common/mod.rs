//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use nginx_console::realtime::probes::{
    Bandwidth, CpuProbe, MemoryProbe, NetworkProbe, ProbeError, ServerStatus, StatusProbe,
};
use nginx_console::realtime::MetricsSampler;
use nginx_console::store::{CertificateIssuer, CommandError, ConfigStore, ServerControl, SitePaths};

/// A temporary nginx configuration root with all three site directories.
pub fn site_tree() -> (TempDir, SitePaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = SitePaths::under(dir.path());
    for d in [&paths.available, &paths.enabled, &paths.immediate] {
        std::fs::create_dir_all(d).unwrap();
    }
    (dir, paths)
}

pub fn write_file(dir: &Path, file_name: &str, contents: &str) {
    std::fs::write(dir.join(file_name), contents).unwrap();
}

pub fn server_block(name: &str, listen: &str) -> String {
    format!("server {{\n    listen {listen};\n    server_name {name};\n}}\n")
}

fn failure(program: &str) -> CommandError {
    CommandError::Failed {
        program: program.to_string(),
        status: "exit status: 1".to_string(),
        stderr: "scripted failure".to_string(),
    }
}

/// Server control that counts reloads and can be told to fail.
#[derive(Default)]
pub struct RecordingControl {
    reloads: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingControl {
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ServerControl for RecordingControl {
    async fn reload(&self) -> Result<(), CommandError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(failure("nginx"));
        }
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Certificate issuer that records `(domain, email)` pairs.
#[derive(Default)]
pub struct RecordingIssuer {
    calls: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingIssuer {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CertificateIssuer for RecordingIssuer {
    async fn issue(&self, domain: &str, contact_email: &str) -> Result<(), CommandError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(failure("certbot"));
        }
        self.calls
            .lock()
            .push((domain.to_string(), contact_email.to_string()));
        Ok(())
    }
}

pub struct StoreFixture {
    pub dir: TempDir,
    pub paths: SitePaths,
    pub store: Arc<ConfigStore>,
    pub control: Arc<RecordingControl>,
    pub issuer: Arc<RecordingIssuer>,
}

pub fn store_fixture() -> StoreFixture {
    let (dir, paths) = site_tree();
    let control = Arc::new(RecordingControl::default());
    let issuer = Arc::new(RecordingIssuer::default());
    let store = Arc::new(ConfigStore::new(paths.clone(), control.clone(), issuer.clone()));
    StoreFixture {
        dir,
        paths,
        store,
        control,
        issuer,
    }
}

/// Status probe whose `active_connections` is the 1-based call number.
#[derive(Default)]
pub struct CountingStatusProbe {
    calls: AtomicU64,
}

impl CountingStatusProbe {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusProbe for CountingStatusProbe {
    async fn server_status(&self) -> Result<ServerStatus, ProbeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ServerStatus {
            active_connections: n,
            requests_per_second: 2.5,
        })
    }
}

/// Fixed CPU / memory / network readings.
pub struct FixedSystem;

#[async_trait]
impl CpuProbe for FixedSystem {
    async fn cpu_percent(&self) -> Result<f64, ProbeError> {
        Ok(12.5)
    }
}

#[async_trait]
impl MemoryProbe for FixedSystem {
    async fn memory_percent(&self) -> Result<f64, ProbeError> {
        Ok(3.0)
    }
}

#[async_trait]
impl NetworkProbe for FixedSystem {
    async fn bandwidth(&self) -> Result<Bandwidth, ProbeError> {
        Ok(Bandwidth {
            in_bytes_per_sec: 100,
            out_bytes_per_sec: 200,
        })
    }
}

/// Sampler over scripted probes, plus a handle to count samples taken.
pub fn counting_sampler() -> (MetricsSampler, Arc<CountingStatusProbe>) {
    let status = Arc::new(CountingStatusProbe::default());
    let system = Arc::new(FixedSystem);
    let sampler = MetricsSampler::new(status.clone(), system.clone(), system.clone(), system);
    (sampler, status)
}

/// Serve a fixed stub_status page on an ephemeral port.
pub async fn start_status_page(body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
