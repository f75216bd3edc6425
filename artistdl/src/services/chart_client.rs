//! Last.fm chart client.
//!
//! Fetches an artist's most popular tracks via `artist.gettoptracks`. Only
//! the ordered track names are consumed here; ranking quality is the
//! chart's responsibility.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::{ChartClient, RateLimiter};

const LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";
const USER_AGENT: &str = concat!("artistdl/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 250;

/// Chart client errors
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No chart tracks found for artist: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct TopTracksEnvelope {
    toptracks: Option<TopTracks>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    track: Option<Vec<ChartTrack>>,
}

#[derive(Debug, Deserialize)]
struct ChartTrack {
    name: String,
}

/// Last.fm API client
pub struct LastFmChart {
    http_client: reqwest::Client,
    api_key: String,
    rate_limiter: Arc<RateLimiter>,
}

impl LastFmChart {
    pub fn new(api_key: String) -> Result<Self, ChartError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChartError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
        })
    }

    /// Get the top `limit` track names for an artist, most popular first
    pub async fn get_top_tracks(
        &self,
        artist: &str,
        limit: usize,
    ) -> Result<Vec<String>, ChartError> {
        self.rate_limiter.wait().await;

        let limit_param = limit.to_string();
        let params = [
            ("method", "artist.gettoptracks"),
            ("artist", artist),
            ("api_key", self.api_key.as_str()),
            ("format", "json"),
            ("limit", limit_param.as_str()),
        ];

        tracing::debug!(artist = %artist, limit = limit, "Querying chart API");

        let response = self
            .http_client
            .get(LASTFM_BASE_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| ChartError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChartError::Api(status.as_u16(), error_text));
        }

        let envelope: TopTracksEnvelope = response
            .json()
            .await
            .map_err(|e| ChartError::Parse(e.to_string()))?;

        let names = track_names(envelope, artist)?;

        tracing::info!(
            artist = %artist,
            tracks = names.len(),
            "Chart lookup successful"
        );

        Ok(names)
    }
}

/// Extract ordered track names; a missing or empty track section means the
/// chart has nothing usable for this artist.
fn track_names(envelope: TopTracksEnvelope, artist: &str) -> Result<Vec<String>, ChartError> {
    let tracks = envelope
        .toptracks
        .and_then(|t| t.track)
        .ok_or_else(|| ChartError::NotFound(artist.to_string()))?;

    if tracks.is_empty() {
        return Err(ChartError::NotFound(artist.to_string()));
    }

    Ok(tracks.into_iter().map(|t| t.name).collect())
}

#[async_trait::async_trait]
impl ChartClient for LastFmChart {
    async fn top_tracks(&self, artist: &str, limit: usize) -> Result<Vec<String>, ChartError> {
        self.get_top_tracks(artist, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TopTracksEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn client_creation() {
        assert!(LastFmChart::new("test_key".to_string()).is_ok());
    }

    #[test]
    fn track_names_preserve_chart_order() {
        let envelope = parse(
            r#"{"toptracks": {"track": [
                {"name": "First", "playcount": "100"},
                {"name": "Second", "playcount": "90"},
                {"name": "Third", "playcount": "80"}
            ]}}"#,
        );

        let names = track_names(envelope, "Artist").unwrap();
        assert_eq!(names, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn missing_toptracks_section_is_not_found() {
        let envelope = parse(r#"{"error": 6, "message": "The artist you supplied could not be found"}"#);
        assert!(matches!(
            track_names(envelope, "Nobody"),
            Err(ChartError::NotFound(artist)) if artist == "Nobody"
        ));
    }

    #[test]
    fn missing_track_list_is_not_found() {
        let envelope = parse(r#"{"toptracks": {"@attr": {"artist": "Nobody"}}}"#);
        assert!(matches!(track_names(envelope, "Nobody"), Err(ChartError::NotFound(_))));
    }

    #[test]
    fn empty_track_list_is_not_found() {
        let envelope = parse(r#"{"toptracks": {"track": []}}"#);
        assert!(matches!(track_names(envelope, "Nobody"), Err(ChartError::NotFound(_))));
    }
}
