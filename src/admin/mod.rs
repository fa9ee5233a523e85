//! Admin HTTP API.
//!
//! # Routes
//! ```text
//! GET  /api/status    version + live metrics state
//! GET  /api/sites     every parsed site
//! POST /api/sites     { "action": ..., "configName": ... } → ConfigStore
//! GET  /api/logs      ?limit=N, newest first
//! GET  /api/stats     ?minutes=M
//! GET  /api/realtime  WebSocket stream of metrics samples
//! ```
//!
//! All routes require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;
pub mod realtime;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ConsoleConfig;
use crate::realtime::MetricsHub;
use crate::store::ConfigStore;
use self::auth::admin_auth_middleware;
use self::handlers::*;
use self::realtime::realtime_ws;

pub use handlers::ApiError;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub hub: MetricsHub,
    pub config: Arc<ConsoleConfig>,
}

#[allow(deprecated)]
pub fn setup_admin_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.admin.request_timeout_secs);

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/sites", get(list_sites).post(post_site_action))
        .route("/api/logs", get(get_logs))
        .route("/api/stats", get(get_stats))
        .route("/api/realtime", get(realtime_ws))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
