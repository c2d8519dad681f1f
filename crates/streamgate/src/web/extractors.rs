//! Request extractors

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Id minted by the logging middleware for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who is asking, for the handler's log lines
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub real_ip: Option<String>,
    /// Same id as the request log; freshly minted when the middleware is absent
    pub request_id: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let real_ip = parts
            .headers
            .get("x-real-ip")
            .or_else(|| parts.headers.get("x-forwarded-for"))
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_default()
            .0;

        Ok(Self {
            user_agent,
            real_ip,
            request_id,
        })
    }
}
