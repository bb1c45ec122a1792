//! Batch orchestration over an input directory
//!
//! Each file moves through `Pending -> Dispatched -> Succeeded | Failed -> Done`.
//! A failure is recorded in that item's [`ItemOutcome`] and the batch moves on;
//! only cancellation stops the batch. It is checked before an item starts, raced
//! against the remote call, and checked again before a result is moved onto its
//! output path, so a cancelled item never leaves an output behind.

use crate::{
    client::RemoteEditClient,
    compositor::ImageCompositor,
    config::{ApiMode, BackgroundSpec, OutputFormat, ProcessingConfig},
    error::{ClipdropError, ErrorKind, Result},
    services::{
        BatchProcessingStats, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
        ProcessingStage, ProgressReporter,
    },
    tracing_config::{events, spans},
    types::{file_name_of, ProcessedResult},
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use instant::Instant;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Lifecycle of a single batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Listed but not started
    Pending,
    /// Handed to the remote client
    Dispatched,
    /// Output written
    Succeeded,
    /// Failed inside the per-item boundary
    Failed,
    /// Outcome recorded
    Done,
}

impl ItemState {
    /// Next state after a successful step or a failure
    #[must_use]
    pub fn advance(self, ok: bool) -> Self {
        match (self, ok) {
            (Self::Pending, _) => Self::Dispatched,
            (Self::Dispatched, true) => Self::Succeeded,
            (Self::Dispatched, false) => Self::Failed,
            (Self::Succeeded | Self::Failed | Self::Done, _) => Self::Done,
        }
    }
}

/// Final status of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Output written
    Succeeded,
    /// Error caught at the item boundary
    Failed {
        /// Error classification
        kind: ErrorKind,
        /// Error message as printed
        message: String,
    },
    /// In flight when the batch was interrupted
    Cancelled,
    /// Never started because the batch was interrupted
    Skipped,
}

/// Result of processing one input file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    /// Input file name
    pub file_name: String,
    /// Input path
    pub input_path: PathBuf,
    /// Output path, once known
    pub output_path: Option<PathBuf>,
    /// Last lifecycle state reached
    pub state: ItemState,
    /// Final status
    #[serde(flatten)]
    pub status: OutcomeStatus,
    /// Time spent on this item
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Credits reported by the service after this item's call
    pub remaining_credits: Option<u64>,
}

impl ItemOutcome {
    fn pending(input_path: &Path) -> Self {
        Self {
            file_name: file_name_of(input_path),
            input_path: input_path.to_path_buf(),
            output_path: None,
            state: ItemState::Pending,
            status: OutcomeStatus::Skipped,
            elapsed: Duration::ZERO,
            remaining_credits: None,
        }
    }

    /// Whether the item wrote its output
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    /// Whether the item failed
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Collected outcomes of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// One outcome per listed file, in listing order
    pub outcomes: Vec<ItemOutcome>,
    /// Whether the operator interrupted the batch
    pub interrupted: bool,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// Total run time
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl BatchReport {
    /// Items that wrote their output
    #[must_use]
    pub fn succeeded(&self) -> Vec<&ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_success()).collect()
    }

    /// Items that failed
    #[must_use]
    pub fn failed(&self) -> Vec<&ItemOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }

    /// Number of failed items
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Lowest credit balance reported during the run
    #[must_use]
    pub fn remaining_credits(&self) -> Option<u64> {
        self.outcomes.iter().filter_map(|o| o.remaining_credits).min()
    }

    /// Totals for progress reporters
    #[must_use]
    pub fn stats(&self) -> BatchProcessingStats {
        BatchProcessingStats {
            items_total: self.outcomes.len(),
            items_completed: self.succeeded().len(),
            items_failed: self.error_count(),
            items_cancelled: self
                .outcomes
                .iter()
                .filter(|o| matches!(o.status, OutcomeStatus::Cancelled | OutcomeStatus::Skipped))
                .count(),
            elapsed: self.elapsed,
            interrupted: self.interrupted,
        }
    }

    /// Pretty-printed JSON rendering
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ClipdropError::processing(format!("Failed to serialize batch report: {}", e)))
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Runs a configured remote operation over every file of a directory
pub struct BatchRunner {
    config: Arc<ProcessingConfig>,
    client: Arc<dyn RemoteEditClient>,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner with a silent reporter and its own cancellation token
    #[must_use]
    pub fn new(config: Arc<ProcessingConfig>, client: Arc<dyn RemoteEditClient>) -> Self {
        Self {
            config,
            client,
            reporter: Arc::new(NoOpProgressReporter),
            cancel: CancellationToken::new(),
        }
    }

    /// Report per-item progress through `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Stop the batch when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that interrupts this runner
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every regular file in `input_dir`, writing results to `output_dir`
    ///
    /// Per-item failures end up in the report. Only failures outside any item
    /// (creating the directories, listing the input) are returned as errors.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        let started_at = Utc::now();
        let batch_start = Instant::now();

        for dir in [input_dir, output_dir] {
            if ImageIOService::ensure_dir(dir)? {
                log::info!("Created directory {}", dir.display());
            }
        }

        let files = ImageIOService::list_input_files(input_dir, self.config.pattern.as_deref())?;
        if files.is_empty() {
            log::warn!("No input files found in {}", input_dir.display());
        } else {
            log::info!("Found {} file(s) to process", files.len());
        }
        if self.config.mode == ApiMode::RemoveBackground && !self.config.background_active() {
            OutputFormatHandler::validate_for_background_removal(self.config.output_format);
        }
        self.reporter.batch_started(files.len());

        let span = spans::batch_processing(
            &self.config.mode.to_string(),
            files.len(),
            self.config.concurrency,
        );

        let mut indexed: Vec<(usize, ItemOutcome)> = futures::stream::iter(files.iter().enumerate())
            .map(|(index, path)| async move { (index, self.run_item(path, output_dir).await) })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .instrument(span)
            .await;
        indexed.sort_by_key(|(index, _)| *index);

        let report = BatchReport {
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
            interrupted: self.cancel.is_cancelled(),
            started_at,
            elapsed: batch_start.elapsed(),
        };

        if let Some(credits) = report.remaining_credits() {
            events::remaining_credits(credits);
        }
        self.reporter.batch_finished(&report.stats());

        Ok(report)
    }

    async fn run_item(&self, input_path: &Path, output_dir: &Path) -> ItemOutcome {
        let mut outcome = ItemOutcome::pending(input_path);
        if self.cancel.is_cancelled() {
            return outcome;
        }

        let file_name = outcome.file_name.clone();
        self.reporter.item_started(&file_name);
        outcome.state = outcome.state.advance(true);
        let start = Instant::now();

        let processed = self
            .process_item(input_path, output_dir)
            .instrument(spans::file_processing(&file_name))
            .await;
        outcome.elapsed = start.elapsed();

        match processed {
            Err(ClipdropError::Interrupted) => {
                log::warn!("{} cancelled", file_name);
                outcome.status = OutcomeStatus::Cancelled;
            },
            Ok(done) => {
                outcome.state = outcome.state.advance(true).advance(true);
                outcome.output_path = Some(done.output_path);
                outcome.remaining_credits = done.remaining_credits;
                outcome.status = OutcomeStatus::Succeeded;
                self.reporter.item_stage(&file_name, ProcessingStage::Completed);
                self.reporter.item_finished(&file_name, outcome.elapsed);
            },
            Err(error) => {
                outcome.state = outcome.state.advance(false).advance(false);
                events::item_failed(&file_name, &error.kind().to_string(), &error);
                let message = error.to_string();
                self.reporter.item_failed(&file_name, &message);
                outcome.status = OutcomeStatus::Failed {
                    kind: error.kind(),
                    message,
                };
            },
        }

        outcome
    }

    /// Read, dispatch and post-process one file
    ///
    /// Only the remote call is raced against cancellation. Blocking stages always
    /// run to completion into scratch files, and the result reaches `output_path`
    /// only if the batch is still live afterwards. Cancellation surfaces as
    /// [`ClipdropError::Interrupted`].
    async fn process_item(&self, input_path: &Path, output_dir: &Path) -> Result<ItemDone> {
        let config = &self.config;

        self.reporter.item_stage(&file_name_of(input_path), ProcessingStage::Reading);
        let file = ImageIOService::read_image_file(input_path)?;

        let format = config.effective_output_format();
        let output_path = OutputFormatHandler::output_path(output_dir, &file.base_name, format);

        self.reporter.item_stage(&file.file_name, ProcessingStage::RemoteCall);
        let remote = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ClipdropError::Interrupted),
            result = self.client.dispatch(&file, config) => result?,
        };
        let result = ProcessedResult {
            bytes: remote.bytes,
            output_path,
        };

        let staged = ImageIOService::scoped_temp_file(output_dir, &file.base_name)?;
        match config.background.filter(|_| config.background_active()) {
            Some(background) => {
                self.reporter.item_stage(&file.file_name, ProcessingStage::Compositing);
                let raw = ImageIOService::scoped_temp_file(output_dir, &file.base_name)?;
                ImageIOService::write_bytes(raw.path(), &result.bytes)?;
                composite_blocking(raw.path().to_path_buf(), staged.path().to_path_buf(), background)
                    .await?;
                let raw_path = raw.path().to_path_buf();
                raw.close()
                    .map_err(|e| ClipdropError::file_io_error("remove temporary file", &raw_path, &e))?;
            },
            None => {
                self.reporter.item_stage(&file.file_name, ProcessingStage::Writing);
                ImageIOService::write_bytes(staged.path(), &result.bytes)?;
            },
        }

        let staged = if config.join {
            self.reporter.item_stage(&file.file_name, ProcessingStage::Joining);
            let joined = ImageIOService::scoped_temp_file(output_dir, &file.base_name)?;
            join_blocking(
                file.path.clone(),
                staged.path().to_path_buf(),
                joined.path().to_path_buf(),
                format,
            )
            .await?;
            joined
        } else {
            staged
        };

        if self.cancel.is_cancelled() {
            return Err(ClipdropError::Interrupted);
        }
        ImageIOService::persist_temp_file(staged, &result.output_path)?;

        Ok(ItemDone {
            output_path: result.output_path,
            remaining_credits: remote.remaining_credits,
        })
    }
}

struct ItemDone {
    output_path: PathBuf,
    remaining_credits: Option<u64>,
}

async fn composite_blocking(input: PathBuf, output: PathBuf, background: BackgroundSpec) -> Result<()> {
    tokio::task::spawn_blocking(move || ImageCompositor::composite_file(&input, &output, &background))
        .await
        .map_err(|e| ClipdropError::processing(format!("Compositing task failed: {}", e)))?
}

/// Join the item's own input and result into `joined`
async fn join_blocking(input: PathBuf, result: PathBuf, joined: PathBuf, format: OutputFormat) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        ImageCompositor::join_files(&[input.as_path(), result.as_path()], &joined, format)
    })
    .await
    .map_err(|e| ClipdropError::processing(format!("Join task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_state_transitions() {
        let dispatched = ItemState::Pending.advance(true);
        assert_eq!(dispatched, ItemState::Dispatched);
        assert_eq!(dispatched.advance(true), ItemState::Succeeded);
        assert_eq!(dispatched.advance(false), ItemState::Failed);
        assert_eq!(ItemState::Failed.advance(false), ItemState::Done);
        assert_eq!(ItemState::Done.advance(true), ItemState::Done);
    }

    fn outcome(name: &str, status: OutcomeStatus, credits: Option<u64>) -> ItemOutcome {
        ItemOutcome {
            remaining_credits: credits,
            status,
            ..ItemOutcome::pending(Path::new(name))
        }
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            outcomes: vec![
                outcome("a.jpg", OutcomeStatus::Succeeded, Some(10)),
                outcome(
                    "b.jpg",
                    OutcomeStatus::Failed {
                        kind: ErrorKind::RemoteApi,
                        message: "boom".into(),
                    },
                    None,
                ),
                outcome("c.jpg", OutcomeStatus::Succeeded, Some(9)),
                outcome("d.jpg", OutcomeStatus::Skipped, None),
            ],
            interrupted: true,
            started_at: Utc::now(),
            elapsed: Duration::from_secs(3),
        };

        assert_eq!(report.succeeded().len(), 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.failed()[0].file_name, "b.jpg");
        assert_eq!(report.remaining_credits(), Some(9));

        let stats = report.stats();
        assert_eq!(stats.items_total, 4);
        assert_eq!(stats.items_cancelled, 1);
        assert!(stats.interrupted);
    }

    #[test]
    fn test_report_json_shape() {
        let report = BatchReport {
            outcomes: vec![outcome(
                "b.jpg",
                OutcomeStatus::Failed {
                    kind: ErrorKind::LocalIo,
                    message: "gone".into(),
                },
                None,
            )],
            interrupted: false,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
        };

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["elapsed_secs"], 1.5);
        assert_eq!(json["interrupted"], false);
        let item = &json["outcomes"][0];
        assert_eq!(item["file_name"], "b.jpg");
        assert_eq!(item["status"], "failed");
        assert_eq!(item["kind"], "local_io");
        assert_eq!(item["message"], "gone");
        assert_eq!(item["state"], "pending");
    }
}
