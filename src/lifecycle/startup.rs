//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems from a validated configuration
//! - Bind the admin listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AppState};
use crate::config::ConsoleConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::realtime::{MetricsHub, MetricsSampler};
use crate::store::{CertbotIssuer, ConfigStore, NginxControl, SitePaths};

/// Long-lived services shared by the admin API.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<ConsoleConfig>,
    pub store: Arc<ConfigStore>,
    pub hub: MetricsHub,
}

impl Services {
    /// Wire the production collaborators: the nginx binary, certbot and the
    /// system probes.
    pub fn from_config(config: ConsoleConfig) -> Self {
        let store = ConfigStore::new(
            SitePaths::from_config(&config.nginx),
            Arc::new(NginxControl::new(config.nginx.binary.clone())),
            Arc::new(CertbotIssuer::new(config.certificates.certbot_binary.clone())),
        );
        let hub = MetricsHub::new(
            MetricsSampler::from_config(&config.metrics),
            Duration::from_millis(config.metrics.interval_ms),
        );

        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            hub,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            hub: self.hub.clone(),
            config: self.config.clone(),
        }
    }
}

/// Serve the admin API on `listener` until `shutdown` fires.
pub async fn serve(listener: TcpListener, state: AppState, shutdown: Shutdown) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}

/// Build services, bind the configured address and serve until `shutdown`.
pub async fn run(config: ConsoleConfig, shutdown: Shutdown) -> std::io::Result<()> {
    tracing::info!(
        sites_available = %config.nginx.sites_available.display(),
        conf_d = %config.nginx.conf_d.display(),
        access_log = %config.logs.access_log.display(),
        interval_ms = config.metrics.interval_ms,
        "Configuration loaded"
    );

    let bind_address = config.admin.bind_address.clone();
    let services = Services::from_config(config);
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, services.app_state(), shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let services = Services::from_config(ConsoleConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = Shutdown::new();

        let server = tokio::spawn(serve(listener, services.app_state(), shutdown.clone()));
        tokio::task::yield_now().await;
        shutdown.trigger();

        let result = tokio::time::timeout(Duration::from_secs(5), server).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
