//! Clipdrop batch CLI
//!
//! Command-line interface sending a folder of images through the Clipdrop API.

use super::config::CliConfigBuilder;
use crate::{
    client::ClipdropClient,
    config::{ApiMode, OutputFormat},
    runner::{BatchReport, BatchRunner},
    services::create_cli_progress_reporter,
    tracing_config::init_cli_tracing,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Process a folder of images with the Clipdrop API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "clipdrop-batch")]
pub struct Cli {
    /// The API key to use for the API calls
    #[arg(long = "API_KEY", env = "CLIPDROP_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// The operation applied to every image
    #[arg(long, value_enum)]
    pub api: CliApiMode,

    /// Folder containing the images to process
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output folder
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Upscale ratio for super-resolution, 2 or 4
    #[arg(long, default_value_t = 2)]
    pub upscale: u32,

    /// Output image format
    #[arg(long = "output_format", value_enum, default_value_t = CliOutputFormat::Png)]
    pub output_format: CliOutputFormat,

    /// New background: a color name, #hex, rgb(r, g, b) or "checkerboard" (transparent when unset)
    #[arg(long = "background_color", value_name = "COLOR")]
    pub background_color: Option<String>,

    /// Append the input and the result side by side
    #[arg(long)]
    pub join: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Number of files processed at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Base URL of the API (for staging or local test servers)
    #[arg(long = "api_url", env = "CLIPDROP_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Only process file names matching this glob (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Write a JSON report of every file's outcome to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliApiMode {
    RemoveBackground,
    SuperResolution,
}

impl From<CliApiMode> for ApiMode {
    fn from(mode: CliApiMode) -> Self {
        match mode {
            CliApiMode::RemoveBackground => ApiMode::RemoveBackground,
            CliApiMode::SuperResolution => ApiMode::SuperResolution,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Jpeg,
    Webp,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Webp => OutputFormat::WebP,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    // Validate CLI arguments
    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;

    // Convert CLI arguments to the processing configuration
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Starting Clipdrop batch processing");
    info!("Input: {}, Output: {}", cli.input.display(), cli.output.display());
    info!(
        "Mode: {}, Output format: {}",
        config.mode,
        config.effective_output_format()
    );
    if let Some(background) = config.background.as_ref().filter(|_| config.background_active()) {
        info!("Background: {}", background);
    }

    let client = ClipdropClient::from_config(&config).context("Failed to create API client")?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let runner = BatchRunner::new(Arc::new(config), Arc::new(client))
        .with_reporter(create_cli_progress_reporter(cli.progress, cli.verbose > 0))
        .with_cancellation(cancel);

    let report = runner
        .run(&cli.input, &cli.output)
        .await
        .context("Batch processing failed")?;

    if report.interrupted {
        println!("Interrupted");
    } else if report.error_count() > 0 {
        warn!(
            "Some files failed to process. Processed: {}, Failed: {}",
            report.succeeded().len(),
            report.error_count()
        );
    }

    if let Some(path) = &cli.report {
        write_report(&report, path)?;
    }

    Ok(())
}

/// Exit status when a second Ctrl-C abandons the batch
const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first Ctrl-C, exit immediately on the second
fn spawn_interrupt_listener(token: CancellationToken) {
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, token).await {
            eprintln!("Interrupted again, exiting immediately");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });
}

/// Cancel `token` on the first signal from `next_signal`
///
/// Returns `true` once a second signal arrives.
async fn watch_interrupts<F, Fut>(mut next_signal: F, token: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        return false;
    }
    warn!("Interrupt received, stopping batch (press Ctrl-C again to exit immediately)");
    token.cancel();

    match next_signal().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            false
        },
    }
}

/// Write the JSON batch report
fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = report.to_json().context("Failed to render batch report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}
