use serde::Deserialize;
use std::num::NonZeroU32;

use crate::errors::{GatewayError, GatewayResult};

/// Raw `/stream` query parameters, exactly as the caller sent them.
///
/// Everything is optional here so that the auth check can run before any
/// validation; see [`PlaybackRequest::from_query`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    #[serde(rename = "filmId")]
    pub film_id: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

/// A validated request for a film (or one episode of it)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    film_id: String,
    season: Option<NonZeroU32>,
    episode: Option<NonZeroU32>,
}

impl PlaybackRequest {
    pub fn new<S: Into<String>>(film_id: S) -> GatewayResult<Self> {
        let film_id = film_id.into();
        if film_id.trim().is_empty() {
            return Err(GatewayError::invalid_request("filmId", "filmId is required"));
        }
        Ok(Self {
            film_id,
            season: None,
            episode: None,
        })
    }

    pub fn with_season(mut self, season: NonZeroU32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_episode(mut self, episode: NonZeroU32) -> Self {
        self.episode = Some(episode);
        self
    }

    /// Validate raw query parameters. `filmId` presence is checked before the
    /// optional numeric parameters.
    pub fn from_query(query: &StreamQuery) -> GatewayResult<Self> {
        let film_id = query
            .film_id
            .as_deref()
            .ok_or_else(|| GatewayError::invalid_request("filmId", "filmId is required"))?;

        let mut request = Self::new(film_id)?;
        if let Some(season) = parse_positive("season", query.season.as_deref())? {
            request = request.with_season(season);
        }
        if let Some(episode) = parse_positive("episode", query.episode.as_deref())? {
            request = request.with_episode(episode);
        }
        Ok(request)
    }

    pub fn film_id(&self) -> &str {
        &self.film_id
    }

    pub fn season(&self) -> Option<NonZeroU32> {
        self.season
    }

    pub fn episode(&self) -> Option<NonZeroU32> {
        self.episode
    }
}

/// Empty values are treated as absent, which is what an HTML form sends for
/// an untouched field.
fn parse_positive(field: &str, raw: Option<&str>) -> GatewayResult<Option<NonZeroU32>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<NonZeroU32>().map(Some).map_err(|_| {
            GatewayError::invalid_request(field, format!("{field} must be a positive integer"))
        }),
    }
}
