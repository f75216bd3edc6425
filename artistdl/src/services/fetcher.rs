//! yt-dlp audio fetcher.
//!
//! Shells out to the external `yt-dlp` tool to download the best available
//! audio stream for a catalog id and extract it to the configured format.
//! The tool's JSON metadata dump is parsed for the final file path and the
//! provider-reported album / release year / artwork.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::AudioFetcher;
use crate::types::FetchResult;

const WATCH_URL_BASE: &str = "https://music.youtube.com/watch?v=";
const AUDIO_QUALITY: &str = "192K";

/// Fetch tool errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// yt-dlp binary not found in PATH
    #[error("yt-dlp binary not found in PATH")]
    ToolMissing,

    /// Failed to start or join the yt-dlp process
    #[error("failed to run yt-dlp: {0}")]
    Spawn(String),

    /// yt-dlp ran but reported failure (network error, missing stream, ...)
    #[error("yt-dlp exited with code {code:?}: {stderr}")]
    Tool { code: Option<i32>, stderr: String },

    /// yt-dlp succeeded but its metadata output was unusable
    #[error("failed to parse yt-dlp output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Subset of the yt-dlp info dump we consume
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    /// Output path before audio extraction; the extension is rewritten by
    /// the postprocessor
    #[serde(rename = "_filename")]
    filename: Option<PathBuf>,
    title: Option<String>,
    album: Option<String>,
    release_year: Option<i32>,
    thumbnail: Option<String>,
}

/// yt-dlp subprocess wrapper
pub struct YtDlpFetcher {
    binary: String,
    audio_format: String,
    cookies_file: Option<PathBuf>,
}

impl YtDlpFetcher {
    pub fn new(audio_format: String, cookies_file: Option<PathBuf>) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            audio_format,
            cookies_file,
        }
    }

    fn build_args(&self, url: &str, dest_dir: &Path) -> Vec<String> {
        let template = dest_dir.join("%(title)s.%(ext)s");

        let mut args = vec![
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--print-json".to_string(),
            "--format".to_string(),
            "bestaudio/best".to_string(),
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--audio-quality".to_string(),
            AUDIO_QUALITY.to_string(),
            "--output".to_string(),
            template.to_string_lossy().into_owned(),
        ];
        if let Some(cookies) = &self.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().into_owned());
        }
        args.push(url.to_string());
        args
    }

    /// Download one track and return its final path plus provider metadata
    pub async fn download(
        &self,
        catalog_id: &str,
        dest_dir: &Path,
    ) -> Result<FetchResult, FetchError> {
        let url = format!("{}{}", WATCH_URL_BASE, catalog_id);
        let args = self.build_args(&url, dest_dir);

        tracing::info!(
            catalog_id = %catalog_id,
            dest = %dest_dir.display(),
            "Downloading audio via yt-dlp"
        );

        let binary = self.binary.clone();
        let output = tokio::task::spawn_blocking(move || Command::new(&binary).args(&args).output())
            .await
            .map_err(|e| FetchError::Spawn(format!("task join error: {}", e)))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::ToolMissing
                } else {
                    FetchError::Spawn(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(FetchError::Tool {
                code: output.status.code(),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_info_dump(&stdout)?;
        let file_path = output_file_path(&info, &self.audio_format)?;

        tracing::info!(
            catalog_id = %catalog_id,
            title = %info.title.as_deref().unwrap_or("<unknown>"),
            file = %file_path.display(),
            "Download completed"
        );

        Ok(FetchResult {
            file_path,
            album: info.album,
            release_year: info.release_year,
            thumbnail_url: info.thumbnail,
        })
    }
}

/// The info dump is the last JSON line on stdout; progress noise may
/// precede it even in quiet mode.
fn parse_info_dump(stdout: &str) -> Result<YtDlpInfo, FetchError> {
    let line = stdout
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with('{'))
        .ok_or_else(|| FetchError::Parse("no JSON metadata on stdout".to_string()))?;

    serde_json::from_str(line).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Final path after audio extraction: the reported filename with its
/// extension replaced by the requested audio format.
fn output_file_path(info: &YtDlpInfo, audio_format: &str) -> Result<PathBuf, FetchError> {
    let reported = info
        .filename
        .as_ref()
        .ok_or_else(|| FetchError::Parse("missing _filename in yt-dlp output".to_string()))?;

    Ok(reported.with_extension(audio_format))
}

#[async_trait::async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, catalog_id: &str, dest_dir: &Path) -> Result<FetchResult, FetchError> {
        self.download(catalog_id, dest_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_request_audio_extraction_into_dest_template() {
        let fetcher = YtDlpFetcher::new("mp3".to_string(), None);
        let args = fetcher.build_args("https://music.youtube.com/watch?v=abc", Path::new("/music/Artist"));

        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"--extract-audio".to_string()));
        let format_pos = args.iter().position(|a| a == "--audio-format").unwrap();
        assert_eq!(args[format_pos + 1], "mp3");
        let output_pos = args.iter().position(|a| a == "--output").unwrap();
        assert_eq!(args[output_pos + 1], "/music/Artist/%(title)s.%(ext)s");
        assert_eq!(args.last().unwrap(), "https://music.youtube.com/watch?v=abc");
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn args_include_cookies_file_when_configured() {
        let fetcher = YtDlpFetcher::new("mp3".to_string(), Some(PathBuf::from("cookies.txt")));
        let args = fetcher.build_args("url", Path::new("/music"));

        let pos = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[pos + 1], "cookies.txt");
    }

    #[test]
    fn parses_metadata_from_last_json_line() {
        let stdout = concat!(
            "some progress noise\n",
            r#"{"_filename": "/music/Artist/Song.webm", "title": "Song", "ext": "webm", "album": "Album", "release_year": 2021, "thumbnail": "https://img.example/t.jpg"}"#,
            "\n"
        );

        let info = parse_info_dump(stdout).unwrap();
        assert_eq!(info.title.as_deref(), Some("Song"));
        assert_eq!(info.album.as_deref(), Some("Album"));
        assert_eq!(info.release_year, Some(2021));

        let path = output_file_path(&info, "mp3").unwrap();
        assert_eq!(path, PathBuf::from("/music/Artist/Song.mp3"));
    }

    #[test]
    fn missing_json_output_is_a_parse_error() {
        assert!(matches!(parse_info_dump("nothing here\n"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn missing_filename_is_a_parse_error() {
        let info = parse_info_dump(r#"{"title": "Song"}"#).unwrap();
        assert!(matches!(output_file_path(&info, "mp3"), Err(FetchError::Parse(_))));
    }
}
