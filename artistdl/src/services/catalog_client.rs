//! YouTube Music catalog search client.
//!
//! Issues a songs-filtered search against the youtubei endpoint and maps
//! the top-ranked result to a [`TrackCandidate`]. The response is a deeply
//! nested renderer tree, so extraction walks a `serde_json::Value` rather
//! than mirroring the whole schema in types.

use serde_json::{json, Value};
use std::time::Duration;

use super::CatalogClient;
use crate::types::TrackCandidate;

const SEARCH_URL: &str = "https://music.youtube.com/youtubei/v1/search";
const USER_AGENT: &str = concat!("artistdl/", env!("CARGO_PKG_VERSION"));
// Pre-encoded "songs only" search filter.
const SONGS_FILTER_PARAMS: &str = "EgWKAQIIAWoKEAkQBRAKEAMQBA==";
const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20240101.01.00";

/// Catalog client errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// YouTube Music search client
pub struct YtMusicCatalog {
    http_client: reqwest::Client,
}

impl YtMusicCatalog {
    pub fn new() -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Search for a song and return the top-ranked match, if any
    pub async fn search_song(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Option<TrackCandidate>, CatalogError> {
        let query = format!("{} {}", artist, track);

        tracing::debug!(query = %query, "Searching catalog");

        let body = json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "hl": "en",
                }
            },
            "query": query,
            "params": SONGS_FILTER_PARAMS,
        });

        let response = self
            .http_client
            .post(SEARCH_URL)
            .query(&[("prettyPrint", "false")])
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api(status.as_u16(), error_text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let candidate = first_song_candidate(&payload);
        match &candidate {
            Some(c) => tracing::debug!(
                catalog_id = %c.catalog_id,
                title = %c.title,
                "Catalog match found"
            ),
            None => tracing::warn!(query = %query, "No catalog results"),
        }

        Ok(candidate)
    }
}

/// Walk the renderer tree to the first song result in any shelf.
fn first_song_candidate(payload: &Value) -> Option<TrackCandidate> {
    let sections = payload
        .pointer("/contents/tabbedSearchResultsRenderer/tabs/0/tabRenderer/content/sectionListRenderer/contents")?
        .as_array()?;

    for section in sections {
        let Some(items) = section
            .pointer("/musicShelfRenderer/contents")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for item in items {
            let Some(renderer) = item.get("musicResponsiveListItemRenderer") else {
                continue;
            };
            if let Some(candidate) = parse_item(renderer) {
                return Some(candidate);
            }
        }
    }

    None
}

/// Map one list item renderer to a candidate. Items without a video id
/// (e.g. "did you mean" rows) are skipped.
fn parse_item(renderer: &Value) -> Option<TrackCandidate> {
    let catalog_id = renderer
        .pointer("/playlistItemData/videoId")?
        .as_str()?
        .to_string();

    let title = renderer
        .pointer("/flexColumns/0/musicResponsiveListItemFlexColumnRenderer/text/runs/0/text")?
        .as_str()?
        .to_string();

    let mut artists = Vec::new();
    let mut album = None;
    let mut duration = None;

    if let Some(runs) = renderer
        .pointer("/flexColumns/1/musicResponsiveListItemFlexColumnRenderer/text/runs")
        .and_then(Value::as_array)
    {
        for run in runs {
            let Some(text) = run.get("text").and_then(Value::as_str) else {
                continue;
            };
            if text.trim() == "•" || text.trim().is_empty() {
                continue;
            }
            // Artist runs link to channel pages (UC...), album runs to
            // release pages (MPRE...); the bare duration run has no link.
            match run
                .pointer("/navigationEndpoint/browseEndpoint/browseId")
                .and_then(Value::as_str)
            {
                Some(id) if id.starts_with("UC") => artists.push(text.to_string()),
                Some(id) if id.starts_with("MPRE") => album = Some(text.to_string()),
                _ => {
                    if duration.is_none() && looks_like_duration(text) {
                        duration = Some(text.to_string());
                    }
                }
            }
        }
    }

    let thumbnail_url = renderer
        .pointer("/thumbnail/musicThumbnailRenderer/thumbnail/thumbnails")
        .and_then(Value::as_array)
        .and_then(|thumbs| thumbs.last())
        .and_then(|thumb| thumb.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(TrackCandidate {
        catalog_id,
        title,
        artists,
        album,
        duration,
        thumbnail_url,
    })
}

fn looks_like_duration(text: &str) -> bool {
    let mut parts = text.split(':');
    match (parts.next(), parts.next()) {
        (Some(minutes), Some(seconds)) => {
            !minutes.is_empty()
                && minutes.chars().all(|c| c.is_ascii_digit())
                && seconds.len() == 2
                && seconds.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

#[async_trait::async_trait]
impl CatalogClient for YtMusicCatalog {
    async fn search_track(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Option<TrackCandidate>, CatalogError> {
        self.search_song(artist, track).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song_item(video_id: &str, title: &str) -> Value {
        json!({
            "musicResponsiveListItemRenderer": {
                "playlistItemData": { "videoId": video_id },
                "thumbnail": {
                    "musicThumbnailRenderer": {
                        "thumbnail": {
                            "thumbnails": [
                                { "url": "https://img.example/small.jpg", "width": 60 },
                                { "url": "https://img.example/large.jpg", "width": 226 }
                            ]
                        }
                    }
                },
                "flexColumns": [
                    {
                        "musicResponsiveListItemFlexColumnRenderer": {
                            "text": { "runs": [ { "text": title } ] }
                        }
                    },
                    {
                        "musicResponsiveListItemFlexColumnRenderer": {
                            "text": { "runs": [
                                {
                                    "text": "Lead Artist",
                                    "navigationEndpoint": { "browseEndpoint": { "browseId": "UC123" } }
                                },
                                { "text": " • " },
                                {
                                    "text": "Second Artist",
                                    "navigationEndpoint": { "browseEndpoint": { "browseId": "UC456" } }
                                },
                                { "text": " • " },
                                {
                                    "text": "Some Album",
                                    "navigationEndpoint": { "browseEndpoint": { "browseId": "MPREb_abc" } }
                                },
                                { "text": " • " },
                                { "text": "3:45" }
                            ] }
                        }
                    }
                ]
            }
        })
    }

    fn search_payload(items: Vec<Value>) -> Value {
        json!({
            "contents": {
                "tabbedSearchResultsRenderer": {
                    "tabs": [ {
                        "tabRenderer": {
                            "content": {
                                "sectionListRenderer": {
                                    "contents": [
                                        { "musicShelfRenderer": { "contents": items } }
                                    ]
                                }
                            }
                        }
                    } ]
                }
            }
        })
    }

    #[test]
    fn parses_top_result_fields() {
        let payload = search_payload(vec![song_item("vid-1", "Song Title")]);

        let candidate = first_song_candidate(&payload).unwrap();
        assert_eq!(candidate.catalog_id, "vid-1");
        assert_eq!(candidate.title, "Song Title");
        assert_eq!(candidate.artists, vec!["Lead Artist", "Second Artist"]);
        assert_eq!(candidate.album.as_deref(), Some("Some Album"));
        assert_eq!(candidate.duration.as_deref(), Some("3:45"));
        assert_eq!(
            candidate.thumbnail_url.as_deref(),
            Some("https://img.example/large.jpg")
        );
    }

    #[test]
    fn takes_first_ranked_item_only() {
        let payload = search_payload(vec![
            song_item("vid-1", "Top"),
            song_item("vid-2", "Second"),
        ]);

        let candidate = first_song_candidate(&payload).unwrap();
        assert_eq!(candidate.catalog_id, "vid-1");
    }

    #[test]
    fn skips_items_without_video_id() {
        let mut no_id = song_item("unused", "Suggestion Row");
        no_id["musicResponsiveListItemRenderer"]
            .as_object_mut()
            .unwrap()
            .remove("playlistItemData");
        let payload = search_payload(vec![no_id, song_item("vid-2", "Real Result")]);

        let candidate = first_song_candidate(&payload).unwrap();
        assert_eq!(candidate.catalog_id, "vid-2");
    }

    #[test]
    fn empty_payload_yields_none() {
        assert!(first_song_candidate(&json!({})).is_none());
        assert!(first_song_candidate(&search_payload(vec![])).is_none());
    }

    #[test]
    fn duration_shapes() {
        assert!(looks_like_duration("3:45"));
        assert!(looks_like_duration("1:02:03"));
        assert!(!looks_like_duration("Album Name"));
        assert!(!looks_like_duration("345"));
        assert!(!looks_like_duration(":45"));
    }
}
