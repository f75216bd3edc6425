//! Configuration resolution.
//!
//! Every setting resolves through the same ladder: command line → environment
//! variable → TOML config file → compiled default. The chart API key is the
//! only setting with no default; everything else falls back to a sensible
//! platform location.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

pub const ENV_API_KEY: &str = "ARTISTDL_LASTFM_API_KEY";
pub const ENV_DOWNLOAD_DIR: &str = "ARTISTDL_DOWNLOAD_DIR";
pub const ENV_LEDGER_PATH: &str = "ARTISTDL_LEDGER_PATH";

const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Last.fm API key not configured. Provide one via --api-key, \
         the ARTISTDL_LASTFM_API_KEY environment variable, or \
         lastfm_api_key in the config file"
    )]
    MissingApiKey,

    #[error("configuration file error: {0}")]
    File(String),
}

/// On-disk configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub lastfm_api_key: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
    pub audio_format: Option<String>,
    pub cookies_file: Option<PathBuf>,
}

impl TomlConfig {
    /// Load `~/.config/artistdl/config.toml` (platform equivalent).
    ///
    /// A missing file is normal; an unreadable or malformed one is logged
    /// and treated as empty so startup never fails on configuration state.
    pub fn load_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded config file");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::File(e.to_string()))
    }
}

/// Command-line overrides, highest priority in the ladder
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub ledger_path: Option<PathBuf>,
}

/// Fully-resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub lastfm_api_key: String,
    pub download_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub audio_format: String,
    pub cookies_file: Option<PathBuf>,
}

impl Config {
    pub fn resolve(cli: CliOverrides, toml_config: &TomlConfig) -> Result<Self, ConfigError> {
        let lastfm_api_key = resolve_api_key(
            cli.api_key,
            std::env::var(ENV_API_KEY).ok(),
            toml_config.lastfm_api_key.clone(),
        )?;

        let download_dir = resolve_path(
            cli.download_dir,
            std::env::var(ENV_DOWNLOAD_DIR).ok().map(PathBuf::from),
            toml_config.download_dir.clone(),
            default_download_dir,
        );

        let ledger_path = resolve_path(
            cli.ledger_path,
            std::env::var(ENV_LEDGER_PATH).ok().map(PathBuf::from),
            toml_config.ledger_path.clone(),
            default_ledger_path,
        );

        let audio_format = toml_config
            .audio_format
            .clone()
            .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string());

        Ok(Self {
            lastfm_api_key,
            download_dir,
            ledger_path,
            audio_format,
            cookies_file: toml_config.cookies_file.clone(),
        })
    }
}

/// API key resolution with a warning when several sources are set, since a
/// stale low-priority key is a common misconfiguration.
fn resolve_api_key(
    cli: Option<String>,
    env: Option<String>,
    toml_key: Option<String>,
) -> Result<String, ConfigError> {
    let valid = |key: &Option<String>| {
        key.as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    };

    let mut sources = Vec::new();
    if valid(&cli) {
        sources.push("command line");
    }
    if valid(&env) {
        sources.push("environment");
    }
    if valid(&toml_key) {
        sources.push("config file");
    }

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    [cli, env, toml_key]
        .into_iter()
        .flatten()
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
        .ok_or(ConfigError::MissingApiKey)
}

fn resolve_path(
    cli: Option<PathBuf>,
    env: Option<PathBuf>,
    toml_path: Option<PathBuf>,
    default: fn() -> PathBuf,
) -> PathBuf {
    cli.or(env).or(toml_path).unwrap_or_else(default)
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("artistdl").join("config.toml"))
}

fn default_download_dir() -> PathBuf {
    dirs::audio_dir()
        .map(|d| d.join("artistdl"))
        .unwrap_or_else(|| PathBuf::from("downloads"))
}

fn default_ledger_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("artistdl").join("ledger.jsonl"))
        .unwrap_or_else(|| PathBuf::from("ledger.jsonl"))
}
