//! Stream Gateway Service
//!
//! Business logic for the `/stream` endpoint.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::AuthContext;
use crate::errors::{GatewayError, GatewayResult};

use super::request::{PlaybackRequest, StreamQuery};
use super::upstream::{ManifestFetcher, UpstreamManifestRequest};

/// A manifest ready to be returned to the caller unmodified
#[derive(Debug, Clone)]
pub struct ManifestResponse {
    pub body: Bytes,
}

#[derive(Clone)]
pub struct StreamGateway {
    media_service_base: Url,
    fetcher: Arc<dyn ManifestFetcher>,
}

impl StreamGateway {
    pub fn new(media_service_base: Url, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self {
            media_service_base,
            fetcher,
        }
    }

    pub fn media_service_base(&self) -> &Url {
        &self.media_service_base
    }

    /// Authorize, validate and forward one manifest request.
    ///
    /// The auth check always runs first, so an anonymous caller gets
    /// `Unauthenticated` even when the query is also invalid, and the
    /// upstream is never contacted for either failure.
    pub async fn handle_manifest_request(
        &self,
        auth: &AuthContext,
        query: &StreamQuery,
    ) -> GatewayResult<ManifestResponse> {
        let Some(token) = auth.bearer() else {
            debug!("Rejecting manifest request without bearer credential");
            return Err(GatewayError::Unauthenticated);
        };

        let request = PlaybackRequest::from_query(query)?;

        let upstream = UpstreamManifestRequest::compose(&self.media_service_base, &request)
            .map_err(|e| {
                error!(film_id = %request.film_id(), "Failed to compose upstream URL: {}", e);
                GatewayError::Transport(e)
            })?;

        let response = self.fetcher.fetch(&upstream, token).await.map_err(|e| {
            error!(upstream = %upstream.as_str(), "Upstream manifest fetch failed: {}", e);
            GatewayError::Transport(e)
        })?;

        if !response.status.is_success() {
            warn!(
                upstream = %upstream.as_str(),
                status = response.status.as_u16(),
                "Media service returned error status"
            );
            return Err(GatewayError::Upstream {
                status: response.status,
                status_text: response.status_text,
            });
        }

        info!(
            film_id = %request.film_id(),
            season = ?request.season(),
            episode = ?request.episode(),
            bytes = response.body.len(),
            "Serving manifest"
        );
        Ok(ManifestResponse {
            body: response.body,
        })
    }
}
