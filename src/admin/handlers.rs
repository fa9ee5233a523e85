use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AppState;
use crate::analytics::{self, AccessLogEntry, TrafficStats};
use crate::realtime::HubState;
use crate::site::{ConfigurationUnit, StorageClass};
use crate::store::StoreError;

/// Error body returned by every admin route: `{ "error": message }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to read access log: {0}")]
    Log(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Store(StoreError::InvalidName(_) | StoreError::InvalidUnit(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) | ApiError::Log(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub realtime: HubState,
    pub subscribers: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        realtime: state.hub.state(),
        subscribers: state.hub.subscriber_count(),
    })
}

pub async fn list_sites(State(state): State<AppState>) -> Result<Json<Vec<ConfigurationUnit>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// Body of `POST /api/sites`, dispatched on `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum SiteAction {
    Enable {
        #[serde(rename = "configName")]
        name: String,
    },
    Disable {
        #[serde(rename = "configName")]
        name: String,
    },
    Create {
        config: ConfigurationUnit,
        #[serde(default)]
        source: StorageClass,
    },
    Update {
        #[serde(rename = "configName")]
        name: String,
        config: ConfigurationUnit,
        #[serde(default)]
        source: StorageClass,
    },
    Delete {
        #[serde(rename = "configName")]
        name: String,
        #[serde(default)]
        source: StorageClass,
    },
    GenerateSsl {
        #[serde(rename = "configName")]
        name: String,
        #[serde(default)]
        email: Option<String>,
    },
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
}

pub async fn post_site_action(
    State(state): State<AppState>,
    payload: Result<Json<SiteAction>, JsonRejection>,
) -> Result<Json<ActionResponse>, ApiError> {
    let Json(action) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let store = &state.store;

    match action {
        SiteAction::Enable { name } => store.enable(&name).await?,
        SiteAction::Disable { name } => store.disable(&name).await?,
        SiteAction::Create { config, source } => store.create(&config, source).await?,
        SiteAction::Update { name, config, source } => store.update(&name, &config, source).await?,
        SiteAction::Delete { name, source } => store.delete(&name, source).await?,
        SiteAction::GenerateSsl { name, email } => {
            let email = email
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| ApiError::BadRequest("email is required to generate a certificate".to_string()))?;
            store.generate_tls(&name, &email).await?
        }
    }

    Ok(Json(ActionResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<AccessLogEntry>>, ApiError> {
    let logs = &state.config.logs;
    let limit = query.limit.unwrap_or(logs.read_limit).min(logs.read_limit);
    Ok(Json(analytics::read_access_log(&logs.access_log, limit).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub minutes: Option<u32>,
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<TrafficStats>, ApiError> {
    let logs = &state.config.logs;
    let minutes = query.minutes.unwrap_or(logs.default_window_minutes);
    Ok(Json(analytics::traffic_stats(&logs.access_log, minutes, logs.stats_limit).await?))
}
