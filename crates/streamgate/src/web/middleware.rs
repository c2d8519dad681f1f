//! HTTP middleware

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method, Uri},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

use super::extractors::RequestId;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request logging middleware
///
/// Logs all incoming requests with timing information. Query strings are
/// left out of the log line since they identify what a caller is watching.
/// The request id is handed to handlers through the request extensions and
/// echoed back in `x-request-id`.
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let id = RequestId::new();
    let request_id = id.0.clone();
    request.extensions_mut().insert(id);
    let path = uri.path().to_string();

    info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        "HTTP request started"
    );

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    let status = response.status().as_u16();
    let duration = start.elapsed();

    if status >= 400 {
        warn!(
            method = %method,
            path = %path,
            status = status,
            request_id = %request_id,
            duration_ms = duration.as_millis(),
            "HTTP request completed with error"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status,
            request_id = %request_id,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    response
}
