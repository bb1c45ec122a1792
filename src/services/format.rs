//! Output format handling service
//!
//! Keeps MIME/extension bookkeeping and content sniffing out of the runner
//! and the HTTP client.

use crate::config::OutputFormat;
use std::path::{Path, PathBuf};

/// Service for handling output format conversions
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Build the output path for an input base name
    ///
    /// # Examples
    /// ```rust
    /// use clipdrop_batch::{config::OutputFormat, services::OutputFormatHandler};
    /// use std::path::Path;
    ///
    /// let out = OutputFormatHandler::output_path(Path::new("out"), "cat", OutputFormat::WebP);
    /// assert_eq!(out, Path::new("out/cat.webp"));
    /// ```
    #[must_use]
    pub fn output_path(output_dir: &Path, base_name: &str, format: OutputFormat) -> PathBuf {
        output_dir.join(format!("{}.{}", base_name, format.extension()))
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Warn when transparent results are requested in a format that cannot hold them
    pub fn validate_for_background_removal(format: OutputFormat) {
        if !Self::supports_transparency(format) {
            log::warn!(
                "Output format {} does not support transparency. Background removal results will have a solid background.",
                format
            );
        }
    }

    /// Guess an output format from a file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<OutputFormat> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Detect an image MIME type from its magic bytes
    #[must_use]
    pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data
            .get(0..8)
            .is_some_and(|slice| slice == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
        {
            return Some("image/png");
        }

        // JPEG: FF D8 FF
        if data.get(0..3).is_some_and(|slice| slice == [0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }

        // WebP: RIFF....WEBP
        if data.get(0..4).is_some_and(|slice| slice == b"RIFF")
            && data.get(8..12).is_some_and(|slice| slice == b"WEBP")
        {
            return Some("image/webp");
        }

        // GIF8
        if data.get(0..4).is_some_and(|slice| slice == b"GIF8") {
            return Some("image/gif");
        }

        // BMP
        if data.get(0..2).is_some_and(|slice| slice == b"BM") {
            return Some("image/bmp");
        }

        None
    }
}
