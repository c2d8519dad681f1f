//! Manifest gateway handler

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::errors::GatewayError;
use crate::gateway::StreamQuery;
use crate::web::{AppState, extractors::RequestContext};

/// `GET /stream?filmId=<id>[&season=<n>][&episode=<n>]`
///
/// Resolves the caller's auth context, then hands everything to the gateway.
pub async fn stream_manifest(
    State(state): State<AppState>,
    context: RequestContext,
    headers: HeaderMap,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> Response {
    debug!(
        request_id = %context.request_id,
        real_ip = context.real_ip.as_deref().unwrap_or("unknown"),
        user_agent = context.user_agent.as_deref().unwrap_or("unknown"),
        "Manifest request"
    );

    let auth = state.auth_provider.resolve(&headers).await;

    // An undecodable query string still has to lose to a missing credential
    let query = match query {
        Ok(Query(query)) => query,
        Err(_) if auth.bearer().is_none() => {
            return GatewayError::Unauthenticated.into_response();
        }
        Err(rejection) => {
            return GatewayError::invalid_request("query", rejection.body_text()).into_response();
        }
    };

    match state.gateway.handle_manifest_request(&auth, &query).await {
        Ok(manifest) => manifest.into_response(),
        Err(error) => error.into_response(),
    }
}
