//! Upstream media service plumbing: URL composition and the single GET the
//! gateway issues per request.

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use reqwest::{Client, header};
use tracing::debug;
use url::Url;

use crate::config::UpstreamConfig;
use crate::errors::{AppResult, TransportError};

use super::request::PlaybackRequest;

/// Content type of a successful manifest response
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Path appended to the media service base for manifest lookups
const STREAMING_PATH: &str = "streaming";

/// The upstream manifest URL derived from a [`PlaybackRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamManifestRequest {
    url: Url,
}

impl UpstreamManifestRequest {
    /// Build `{base}/streaming?filmId=..[&season=..][&episode=..]`.
    ///
    /// Parameters are appended in that order and only when present.
    pub fn compose(base: &Url, request: &PlaybackRequest) -> Result<Self, TransportError> {
        let endpoint = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            STREAMING_PATH
        );
        let mut url = Url::parse(&endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("filmId", request.film_id());
            if let Some(season) = request.season() {
                query.append_pair("season", &season.to_string());
            }
            if let Some(episode) = request.episode() {
                query.append_pair("episode", &episode.to_string());
            }
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

/// What the media service answered
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub status_text: String,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.into(),
        }
    }

    /// Use the reason phrase the upstream actually sent
    pub fn with_status_text<S: Into<String>>(mut self, status_text: S) -> Self {
        self.status_text = status_text.into();
        self
    }
}

/// Issues the upstream manifest fetch
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &UpstreamManifestRequest,
        bearer_token: &str,
    ) -> Result<UpstreamResponse, TransportError>;
}

/// reqwest-backed fetcher with explicit connect and total timeouts
#[derive(Debug, Clone)]
pub struct HttpManifestFetcher {
    client: Client,
}

impl HttpManifestFetcher {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(
        &self,
        request: &UpstreamManifestRequest,
        bearer_token: &str,
    ) -> Result<UpstreamResponse, TransportError> {
        let url = request.as_str();
        debug!(upstream = %url, "Fetching manifest from media service");

        let response = self
            .client
            .get(request.url().clone())
            .header(header::AUTHORIZATION, format!("Bearer {bearer_token}"))
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            // hyper only records the reason phrase when it differs from the
            // canonical one for the status
            let reason = response
                .extensions()
                .get::<hyper::ext::ReasonPhrase>()
                .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned());

            // The body of an error response is never forwarded
            let upstream = UpstreamResponse::new(status, Bytes::new());
            return Ok(match reason {
                Some(reason) => upstream.with_status_text(reason),
                None => upstream,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        debug!(upstream = %url, bytes = body.len(), "Manifest fetched");
        Ok(UpstreamResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    fn base(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn n(value: u32) -> NonZeroU32 {
        NonZeroU32::new(value).unwrap()
    }

    #[test]
    fn test_compose_film_only() {
        let request = PlaybackRequest::new("42").unwrap();
        let upstream =
            UpstreamManifestRequest::compose(&base("http://media.local:8081"), &request).unwrap();
        assert_eq!(upstream.as_str(), "http://media.local:8081/streaming?filmId=42");
    }

    #[test]
    fn test_compose_with_season_and_episode() {
        let request = PlaybackRequest::new("42")
            .unwrap()
            .with_season(n(1))
            .with_episode(n(3));
        let upstream =
            UpstreamManifestRequest::compose(&base("http://media.local:8081"), &request).unwrap();
        assert_eq!(
            upstream.as_str(),
            "http://media.local:8081/streaming?filmId=42&season=1&episode=3"
        );
    }

    #[test]
    fn test_compose_episode_without_season() {
        let request = PlaybackRequest::new("42").unwrap().with_episode(n(7));
        let upstream =
            UpstreamManifestRequest::compose(&base("http://media.local"), &request).unwrap();
        assert_eq!(upstream.as_str(), "http://media.local/streaming?filmId=42&episode=7");
    }

    #[test]
    fn test_compose_keeps_base_path_and_trailing_slash() {
        let request = PlaybackRequest::new("42").unwrap();
        let upstream =
            UpstreamManifestRequest::compose(&base("https://cdn.example.com/api/v2/"), &request)
                .unwrap();
        assert_eq!(
            upstream.as_str(),
            "https://cdn.example.com/api/v2/streaming?filmId=42"
        );
    }

    #[test]
    fn test_compose_encodes_film_id() {
        let request = PlaybackRequest::new("a&b=c").unwrap();
        let upstream =
            UpstreamManifestRequest::compose(&base("http://media.local"), &request).unwrap();
        assert_eq!(upstream.url().query(), Some("filmId=a%26b%3Dc"));
    }

    #[test]
    fn test_upstream_response_uses_canonical_reason() {
        let response = UpstreamResponse::new(StatusCode::NOT_FOUND, Bytes::new());
        assert_eq!(response.status_text, "Not Found");
    }
}
