//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::config::{ApiMode, Endpoints, ProcessingConfig, UpscaleFactor};
use crate::tracing_config::events;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a `ProcessingConfig`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build ProcessingConfig from CLI arguments
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessingConfig> {
        let mode = ApiMode::from(cli.api);

        let endpoints = cli
            .api_url
            .as_deref()
            .map(Endpoints::with_base_url)
            .unwrap_or_default();

        let mut builder = ProcessingConfig::builder()
            .api_key(cli.api_key.as_str())
            .mode(mode)
            .output_format(cli.output_format.into())
            .join(cli.join)
            .endpoints(endpoints)
            .request_timeout(Duration::from_secs(cli.timeout))
            .concurrency(cli.concurrency)
            .pattern(cli.pattern.clone());

        // The factor only reaches the wire in super-resolution mode
        if mode == ApiMode::SuperResolution {
            builder = builder.upscale(cli.upscale);
        }

        if let Some(color) = &cli.background_color {
            builder = builder.background_color(color.as_str());
        }

        let config = builder.build().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.api_key.trim().is_empty() {
            anyhow::bail!("--API_KEY must not be empty");
        }

        if cli.api == super::CliApiMode::SuperResolution {
            UpscaleFactor::try_from(cli.upscale).context("Invalid upscale factor")?;
        } else if cli.upscale != UpscaleFactor::default().as_u32() {
            events::warning_with_recommendation(
                "--upscale is ignored in remove-background mode",
                "use --api super-resolution to upscale",
            );
        }

        if cli.input == cli.output && cli.join {
            events::warning_with_recommendation(
                "input and output folders are the same",
                "joined outputs may be picked up as inputs on the next run",
            );
        }

        Ok(())
    }
}
