//! Route handler functions.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use gaction_bridge::{AppRequest, AppResponse};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebhookParams {
    #[serde(rename = "botToken")]
    pub bot_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connectors: usize,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub connectors: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connectors: state.registry.len().await,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// `POST /recast?botToken=...` - Actions SDK conversation webhook.
///
/// The connector is resolved before the body is decoded, so an unknown
/// token is a 404 whatever the payload.
pub async fn recast_webhook(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    body: Bytes,
) -> Result<Json<AppResponse>, ApiError> {
    let token = params.bot_token.unwrap_or_default();
    let Some(connector) = state.registry.lookup(&token).await else {
        tracing::warn!(bot_token = %token, "Connector not found. Please configure it");
        return Err(ApiError::NotFound(format!(
            "no connector configured for bot token '{}'",
            token
        )));
    };

    let request: AppRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid Actions SDK request: {}", e)))?;

    Ok(Json(connector.handle_request(request).await))
}

/// `POST /connectors/reload` - rebuild the connector cache from its store.
pub async fn reload_connectors(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let connectors = state.registry.reload().await?;
    Ok(Json(ReloadResponse { connectors }))
}
