//! Core value types passed between the runner, the client and the compositor

use std::path::{Path, PathBuf};

/// An input image discovered in the input directory
///
/// Created once when the directory is listed and consumed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Full path to the source file
    pub path: PathBuf,
    /// File name including extension, used for the multipart part and log lines
    pub file_name: String,
    /// File name without its extension
    pub base_name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Wrap already-read bytes
    #[must_use]
    pub fn new(path: &Path, bytes: Vec<u8>) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            base_name: base_name_of(path),
            bytes,
        }
    }

    /// Size of the file contents in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file has no contents
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bytes returned by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteImage {
    /// Processed image in the requested format
    pub bytes: Vec<u8>,
    /// Value of the `x-remaining-credits` response header
    pub remaining_credits: Option<u64>,
}

/// Remote output tagged with the path it will be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedResult {
    /// Processed image bytes
    pub bytes: Vec<u8>,
    /// Final output path
    pub output_path: PathBuf,
}

/// File name component of a path, lossily decoded
#[must_use]
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name without its last extension
#[must_use]
pub fn base_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
