//! Progress reporting service
//!
//! This module separates progress reporting concerns from the batch runner,
//! allowing different frontends to implement their own progress handling.

use std::time::Duration;

/// Progress stages of a single batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Reading the input file
    Reading,
    /// Waiting for the remote service
    RemoteCall,
    /// Compositing onto the replacement background
    Compositing,
    /// Joining input and output side by side
    Joining,
    /// Writing the final output file
    Writing,
    /// Item completed
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::Reading => "Reading input file",
            ProcessingStage::RemoteCall => "Calling remote service",
            ProcessingStage::Compositing => "Compositing background",
            ProcessingStage::Joining => "Joining input and output",
            ProcessingStage::Writing => "Writing output file",
            ProcessingStage::Completed => "Completed",
        }
    }
}

/// Totals handed to [`ProgressReporter::batch_finished`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchProcessingStats {
    /// Number of files discovered
    pub items_total: usize,
    /// Items that produced an output file
    pub items_completed: usize,
    /// Items that failed
    pub items_failed: usize,
    /// Items that never ran or were dropped because of cancellation
    pub items_cancelled: usize,
    /// Wall-clock time of the whole batch
    pub elapsed: Duration,
    /// Whether the batch was interrupted
    pub interrupted: bool,
}

impl BatchProcessingStats {
    /// Average seconds per completed item
    #[must_use]
    pub fn average_secs(&self) -> f64 {
        if self.items_completed > 0 {
            self.elapsed.as_secs_f64() / self.items_completed as f64
        } else {
            0.0
        }
    }
}

/// Trait for reporting per-item progress during a batch
///
/// Only the three per-item events are required; the rest default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// Called once after the input directory has been listed
    fn batch_started(&self, total: usize) {
        let _ = total;
    }

    /// Called when an item is dispatched
    fn item_started(&self, file_name: &str);

    /// Called when an item moves to a new stage
    fn item_stage(&self, file_name: &str, stage: ProcessingStage) {
        let _ = (file_name, stage);
    }

    /// Called when an item wrote its output
    fn item_finished(&self, file_name: &str, elapsed: Duration);

    /// Called when an item failed; the batch continues
    fn item_failed(&self, file_name: &str, error: &str);

    /// Called once when the batch ends, interrupted or not
    fn batch_finished(&self, stats: &BatchProcessingStats) {
        let _ = stats;
    }
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn item_started(&self, _file_name: &str) {}

    fn item_finished(&self, _file_name: &str, _elapsed: Duration) {}

    fn item_failed(&self, _file_name: &str, _error: &str) {}
}

/// Plain reporter printing one line per event to stdout
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Also log stage transitions
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn item_started(&self, file_name: &str) {
        println!("{}", start_line(file_name));
    }

    fn item_stage(&self, file_name: &str, stage: ProcessingStage) {
        if self.verbose {
            log::debug!("{}: {}", file_name, stage.description());
        }
    }

    fn item_finished(&self, file_name: &str, elapsed: Duration) {
        println!("{}", finished_line(file_name, elapsed));
    }

    fn item_failed(&self, file_name: &str, error: &str) {
        println!("{}", error_line(file_name, error));
    }

    fn batch_finished(&self, stats: &BatchProcessingStats) {
        log_batch_summary(stats);
    }
}

/// Reporter driving an `indicatif` progress bar
///
/// Per-item lines are printed above the bar so the stdout transcript matches the
/// plain console reporter.
#[cfg(feature = "cli")]
pub struct IndicatifProgressReporter {
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl IndicatifProgressReporter {
    /// Create a reporter with a hidden-length bar; the length is set on `batch_started`
    #[must_use]
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::new(0);
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }
}

#[cfg(feature = "cli")]
impl Default for IndicatifProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ProgressReporter for IndicatifProgressReporter {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn item_started(&self, file_name: &str) {
        self.bar.println(start_line(file_name));
        self.bar.set_message(format!("Processing {}", file_name));
    }

    fn item_stage(&self, file_name: &str, stage: ProcessingStage) {
        self.bar
            .set_message(format!("{}: {}", file_name, stage.description()));
    }

    fn item_finished(&self, file_name: &str, elapsed: Duration) {
        self.bar.println(finished_line(file_name, elapsed));
        self.bar.inc(1);
    }

    fn item_failed(&self, file_name: &str, error: &str) {
        self.bar.println(error_line(file_name, error));
        self.bar.inc(1);
    }

    fn batch_finished(&self, stats: &BatchProcessingStats) {
        if stats.interrupted {
            self.bar.abandon_with_message("Interrupted");
        } else {
            self.bar.finish_with_message(format!(
                "Completed! Processed: {}, Failed: {}",
                stats.items_completed, stats.items_failed
            ));
        }
        log_batch_summary(stats);
    }
}

/// Create the reporter matching the CLI flags
///
/// # Arguments
/// * `enable_progress` - Whether the --progress flag was set
/// * `verbose` - Whether verbose logging is enabled
#[cfg(feature = "cli")]
#[must_use]
pub fn create_cli_progress_reporter(
    enable_progress: bool,
    verbose: bool,
) -> std::sync::Arc<dyn ProgressReporter> {
    if enable_progress {
        std::sync::Arc::new(IndicatifProgressReporter::new())
    } else {
        std::sync::Arc::new(ConsoleProgressReporter::new(verbose))
    }
}

/// "Start processing X"
#[must_use]
pub fn start_line(file_name: &str) -> String {
    format!("Start processing {}", file_name)
}

/// "X processed in N seconds"
#[must_use]
pub fn finished_line(file_name: &str, elapsed: Duration) -> String {
    format!("{} processed in {:.2} seconds", file_name, elapsed.as_secs_f64())
}

/// "Error with X, msg"
#[must_use]
pub fn error_line(file_name: &str, error: &str) -> String {
    format!("Error with {}, {}", file_name, error)
}

fn log_batch_summary(stats: &BatchProcessingStats) {
    log::info!("📊 Batch processing summary:");
    log::info!("  ├─ Files found: {}", stats.items_total);
    log::info!("  ├─ Files processed: {}", stats.items_completed);
    log::info!("  ├─ Files failed: {}", stats.items_failed);
    if stats.interrupted {
        log::info!("  ├─ Files cancelled: {}", stats.items_cancelled);
    }
    log::info!("  ├─ Total time: {:.2}s", stats.elapsed.as_secs_f64());
    log::info!("  └─ Average per file: {:.2}s", stats.average_secs());
}
