//! nginx console server.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 NGINX CONSOLE                 │
//!                        │                                               │
//!   Admin client         │  ┌─────────┐    ┌──────────┐    ┌──────────┐  │
//!   ─────────────────────┼─▶│  admin  │───▶│  store   │───▶│   site   │  │──▶ sites-available/
//!                        │  │ router  │    │          │    │  codec   │  │    sites-enabled/
//!                        │  └────┬────┘    └────┬─────┘    └──────────┘  │    conf.d/
//!                        │       │              └── nginx -s reload ─────┼──▶ nginx
//!                        │       │              └── certbot ─────────────┼──▶ certbot
//!                        │       │                                       │
//!                        │       ├──▶ analytics (reader → parser → aggregator) ◀── access.log
//!                        │       │                                       │
//!   WebSocket ◀──────────┼───────┴──── realtime hub ◀── sampler ◀── probes (stub_status, ps, /proc)
//!                        │                                               │
//!                        │  config · observability · lifecycle           │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use nginx_console::config::{load_config, ConsoleConfig};
use nginx_console::lifecycle::{self, signals, Shutdown};
use nginx_console::observability::{self, metrics};

/// Grace period for open connections after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "nginx-console", version, about = "Admin API for nginx sites, logs and live metrics")]
struct Args {
    /// TOML configuration file; built-in defaults are used when omitted.
    #[arg(short, long, env = "CONSOLE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConsoleConfig::default(),
    };

    observability::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nginx-console starting");
    if args.config.is_none() {
        tracing::warn!("No --config given, using built-in defaults");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = lifecycle::run(config, shutdown.clone());
    let drain_deadline = async {
        shutdown.wait().await;
        tokio::time::sleep(DRAIN_TIMEOUT).await;
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => tracing::warn!("Drain timeout elapsed, closing remaining connections"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
