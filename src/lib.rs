#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Clipdrop Batch Processing Library
//!
//! Sends every image of a directory through the Clipdrop remove-background or
//! super-resolution API, optionally flattens the transparent result onto a
//! solid color or checkerboard, and optionally joins input and output side by
//! side for comparison.
//!
//! ## Features
//!
//! - **Two remote operations**: background removal and 2x/4x super-resolution
//! - **Compositing**: named colors, hex colors, `rgb(...)` or a synthesized checkerboard
//! - **Failure isolation**: one bad file never stops the batch; every item ends up in a [`BatchReport`]
//! - **Cancellation**: Ctrl-C stops the batch cleanly and removes scratch files
//! - **Bounded parallelism**: optional `concurrency > 1`
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clipdrop_batch::{
//!     ApiMode, BatchRunner, ClipdropClient, OutputFormat, ProcessingConfig,
//! };
//! use std::{path::Path, sync::Arc};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ProcessingConfig::builder()
//!     .api_key("YOUR_API_KEY")
//!     .mode(ApiMode::RemoveBackground)
//!     .output_format(OutputFormat::WebP)
//!     .background_color("checkerboard")
//!     .build()?;
//!
//! let client = ClipdropClient::from_config(&config)?;
//! let runner = BatchRunner::new(Arc::new(config), Arc::new(client));
//! let report = runner.run(Path::new("in"), Path::new("out")).await?;
//! println!("{} succeeded, {} failed", report.succeeded().len(), report.error_count());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars and subscriber setup
//! - `tracing-json`: JSON log output

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod compositor;
pub mod config;
pub mod error;
pub mod runner;
pub mod services;
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use client::{ClipdropClient, RemoteEditClient};
pub use compositor::{CheckerboardParams, ImageCompositor};
pub use config::{
    ApiKey, ApiMode, BackgroundSpec, Endpoints, OutputFormat, ProcessingConfig,
    ProcessingConfigBuilder, UpscaleFactor,
};
pub use error::{ClipdropError, ErrorKind, Result};
pub use runner::{BatchReport, BatchRunner, ItemOutcome, ItemState, OutcomeStatus};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter,
};
pub use types::{ImageFile, ProcessedResult, RemoteImage};
pub use utils::ColorParser;

#[cfg(feature = "cli")]
pub use tracing_config::init_cli_tracing;
pub use tracing_config::{events, spans, TracingConfig, TracingFormat};
