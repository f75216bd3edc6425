//! ID3 tag writer.
//!
//! Mutates a downloaded file's embedded metadata container in place:
//! artist, title, optional album and year, and artwork fetched by URL and
//! embedded as the front-cover picture. Artwork fetch problems degrade to
//! text-only tags; only a failure to write the container itself is an
//! error.

use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};
use std::path::PathBuf;
use std::time::Duration;

use super::TagWriter;

const USER_AGENT: &str = concat!("artistdl/", env!("CARGO_PKG_VERSION"));
const DEFAULT_ARTWORK_MIME: &str = "image/jpeg";

/// Tag writer errors
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("artwork fetch failed: {0}")]
    Artwork(String),

    #[error("tag container error: {0}")]
    Container(#[from] id3::Error),
}

/// Everything the tag writer needs for one file
#[derive(Debug, Clone)]
pub struct TagRequest {
    pub file_path: PathBuf,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub artwork_url: Option<String>,
}

/// ID3v2 tag writer with artwork embedding
pub struct Id3Tagger {
    http_client: reqwest::Client,
}

impl Id3Tagger {
    pub fn new() -> Result<Self, TagError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TagError::Http(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Apply tags to the file in place
    pub async fn apply_tags(&self, request: &TagRequest) -> Result<(), TagError> {
        let mut tag = match Tag::read_from_path(&request.file_path) {
            Ok(tag) => tag,
            Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Tag::new(),
            Err(e) => return Err(e.into()),
        };

        tag.set_artist(&request.artist);
        tag.set_title(&request.title);
        if let Some(album) = &request.album {
            tag.set_album(album);
        }
        if let Some(year) = request.year {
            tag.set_year(year);
        }

        if let Some(url) = &request.artwork_url {
            match self.fetch_artwork(url).await {
                Ok((mime_type, data)) => {
                    tag.add_frame(Picture {
                        mime_type,
                        picture_type: PictureType::CoverFront,
                        description: String::new(),
                        data,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        error = %e,
                        "Artwork fetch failed; writing text frames only"
                    );
                }
            }
        }

        tag.write_to_path(&request.file_path, Version::Id3v24)?;

        tracing::debug!(
            file = %request.file_path.display(),
            artist = %request.artist,
            title = %request.title,
            "Tags written"
        );

        Ok(())
    }

    async fn fetch_artwork(&self, url: &str) -> Result<(String, Vec<u8>), TagError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| TagError::Artwork(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TagError::Artwork(format!("HTTP {}", response.status())));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_ARTWORK_MIME)
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(|e| TagError::Artwork(e.to_string()))?
            .to_vec();

        Ok((mime_type, data))
    }
}

#[async_trait::async_trait]
impl TagWriter for Id3Tagger {
    async fn write_tags(&self, request: &TagRequest) -> Result<(), TagError> {
        self.apply_tags(request).await
    }
}
