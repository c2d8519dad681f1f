//! HTTP response types and utilities
//!
//! The `/stream` endpoint answers in plain text or raw manifest bytes, the way
//! the media service itself does. JSON is only used for operational endpoints.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;
use crate::gateway::{HLS_CONTENT_TYPE, ManifestResponse};

/// Body returned for transport failures; the cause stays in the logs
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// JSON envelope for the operational endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    /// Response timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Service health payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub media_service_base: String,
}

impl IntoResponse for ManifestResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, HeaderValue::from_static(HLS_CONTENT_TYPE))],
            self.body,
        )
            .into_response()
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            GatewayError::Unauthenticated => "Unauthorized".to_string(),
            GatewayError::InvalidRequest { message, .. } => message,
            GatewayError::Upstream { status_text, .. } => status_text,
            GatewayError::Transport(_) => INTERNAL_ERROR_BODY.to_string(),
        };

        (status, body).into_response()
    }
}
