//! artistdl command line entry point.
//!
//! Enqueues one download job per artist argument and waits for the worker
//! to drain the queue.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use artistdl::config::{CliOverrides, Config, TomlConfig};
use artistdl::services::{Id3Tagger, LastFmChart, YtDlpFetcher, YtMusicCatalog};
use artistdl::{FetchPipeline, PersistentLedger, QueueOrchestrator, TrackResolver};

#[derive(Parser, Debug)]
#[command(name = "artistdl", version, about = "Download an artist's most popular tracks")]
struct Cli {
    /// Artists to download, one job per name
    #[arg(required = true)]
    artists: Vec<String>,

    /// Maximum number of tracks per artist
    #[arg(short, long, default_value_t = 10)]
    limit: usize,

    /// Last.fm API key
    #[arg(long)]
    api_key: Option<String>,

    /// Root directory for downloaded audio
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// Path of the download ledger file
    #[arg(long)]
    ledger: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting artistdl");

    let toml_config = TomlConfig::load_default();
    let config = Config::resolve(
        CliOverrides {
            api_key: cli.api_key.clone(),
            download_dir: cli.download_dir.clone(),
            ledger_path: cli.ledger.clone(),
        },
        &toml_config,
    )?;

    info!(
        download_dir = %config.download_dir.display(),
        ledger = %config.ledger_path.display(),
        "Configuration resolved"
    );

    let chart = Arc::new(LastFmChart::new(config.lastfm_api_key.clone())?);
    let catalog = Arc::new(YtMusicCatalog::new()?);
    let fetcher = Arc::new(YtDlpFetcher::new(
        config.audio_format.clone(),
        config.cookies_file.clone(),
    ));
    let tagger = Arc::new(Id3Tagger::new()?);

    let resolver = TrackResolver::new(chart, catalog);
    let pipeline = FetchPipeline::new(fetcher, tagger, config.download_dir.clone());
    let ledger = PersistentLedger::load(&config.ledger_path);

    let orchestrator = QueueOrchestrator::new(resolver, pipeline, ledger);

    for artist in &cli.artists {
        let job_id = orchestrator.enqueue(artist, cli.limit).await?;
        info!(job_id = %job_id, artist = %artist, "Enqueued");
    }

    orchestrator.wait_idle().await;

    let recorded = orchestrator.ledger_snapshot().await.len();
    info!(tracks_recorded = recorded, "All jobs finished");

    Ok(())
}
