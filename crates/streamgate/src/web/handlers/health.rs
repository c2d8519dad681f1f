//! Health check HTTP handlers

use axum::{extract::State, response::IntoResponse};

use crate::web::{
    AppState,
    responses::{ApiResponse, HealthResponse},
};

/// Health check endpoint
///
/// Reports process health only; the media service is not probed, so a
/// degraded upstream never takes the gateway out of rotation.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = chrono::Utc::now() - state.start_time;

    ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds(),
        media_service_base: state.gateway.media_service_base().to_string(),
    })
}

/// Liveness probe
pub async fn liveness_check() -> &'static str {
    "OK"
}
