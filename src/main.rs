use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use clearmark::{
    batch::BatchDriver,
    config::Config,
    media::command,
    pipeline::{CleanerPipeline, InpaintSession},
};

#[derive(Parser)]
#[command(
    name = "clearmark",
    version,
    about = "Remove burned-in watermarks from video footage",
    long_about = "Clearmark removes watermarks by masking the configured regions of every frame, \
                  restoring them with a temporal inpainting model, and re-encoding the result with \
                  the original audio track copied over untouched."
)]
struct Cli {
    /// Input video file or directory of videos
    #[arg(short, long)]
    input: PathBuf,

    /// Remove the watermark (this is the default)
    #[arg(long, overrides_with = "no_remove_watermark")]
    remove_watermark: bool,

    /// Skip watermark removal, re-encoding frames unmodified
    #[arg(long, overrides_with = "remove_watermark")]
    no_remove_watermark: bool,

    /// Configuration file (defaults to clearmark.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Removal is enabled unless explicitly switched off
    fn removal_enabled(&self) -> bool {
        !self.no_remove_watermark
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(log_level).init();

    info!("Starting clearmark v{}", env!("CARGO_PKG_VERSION"));
    info!("Input: {:?}", cli.input);
    info!("Watermark removal: {}", cli.removal_enabled());

    // Load configuration
    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path)?
        }
        None => {
            let default_path = PathBuf::from("clearmark.toml");
            if default_path.is_file() {
                info!("Loading configuration from {:?}", default_path);
                Config::from_file(&default_path)?
            } else {
                info!("Using default configuration");
                Config::default()
            }
        }
    };
    config.validate()?;

    // The container engine is an external capability; fail fast when absent
    if !command::check_available("ffmpeg") || !command::check_available("ffprobe") {
        anyhow::bail!("ffmpeg and ffprobe are required but were not found on PATH");
    }

    // One model session for the whole process; loaded lazily on first use
    let session = Arc::new(InpaintSession::from_config(
        &config.inpaint,
        config.staging.index_pad,
    ));
    let pipeline = CleanerPipeline::new(config, session);
    let driver = BatchDriver::new(cli.removal_enabled());

    if cli.input.is_dir() {
        // Directory mode records per-file outcomes and always returns normally
        let report = driver.run_directory(&pipeline, &cli.input).await?;
        info!(
            "Finished: {} processed, {} failed",
            report.successes(),
            report.failures()
        );
        Ok(())
    } else if cli.input.is_file() {
        // Single-file mode surfaces the first failure
        let run = driver.run_single(&pipeline, &cli.input).await?;
        match run.notice {
            Some(notice) => info!("Complete: {} frames ({})", run.frame_count, notice),
            None => info!("Complete: {} frames inpainted", run.frame_count),
        }
        Ok(())
    } else {
        anyhow::bail!("Invalid input path: {:?}", cli.input)
    }
}
