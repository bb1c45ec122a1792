//! Service layer separating I/O, format and progress concerns from the batch runner

pub mod format;
pub mod io;
pub mod progress;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
#[cfg(feature = "cli")]
pub use progress::{create_cli_progress_reporter, IndicatifProgressReporter};
pub use progress::{
    BatchProcessingStats, ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter,
};
