//! Video moderation CLI.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vmod_worker::{discover_videos, AppConfig, VideoPipeline};

#[derive(Parser)]
#[command(name = "vmod")]
#[command(about = "Moderate videos and publish them for human review", long_about = None)]
#[command(version)]
struct Cli {
    /// Video file, or directory searched recursively for .mp4 files.
    /// Prompts for a file when omitted.
    path: Option<PathBuf>,

    /// Settings file (defaults to appsettings.json when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vmod=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

/// Ask on stdin until an existing file is entered.
async fn prompt_for_video() -> Result<PathBuf> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout
            .write_all(b"Enter the full path of the video file: ")
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            bail!("No video path entered");
        };
        let path = PathBuf::from(line.trim().trim_matches('"'));
        if path.is_file() {
            return Ok(path);
        }
        warn!("{} is not a file", path.display());
    }
}

async fn videos_to_process(path: Option<&Path>) -> Result<Vec<PathBuf>> {
    match path {
        Some(path) => discover_videos(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => Ok(vec![prompt_for_video().await?]),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting vmod");

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let pipeline = VideoPipeline::from_config(&config).context("Failed to set up pipeline")?;

    let videos = videos_to_process(cli.path.as_deref()).await?;
    if videos.is_empty() {
        warn!("No .mp4 files found");
        return Ok(());
    }

    let total = videos.len();
    let mut failed = 0usize;
    for video in &videos {
        match pipeline.process(video).await {
            Ok(review_id) => info!(video = %video.display(), review_id = %review_id, "Review published"),
            Err(e) => {
                failed += 1;
                error!(video = %video.display(), "Video failed: {}", e);
            }
        }
    }

    info!("Processed {} videos, {} failed", total, failed);
    Ok(())
}
