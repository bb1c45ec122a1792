//! File system operations service
//!
//! The runner consumes the file system only through this service: directory
//! creation, input listing, whole-file reads and writes, and per-item scratch
//! files.

use crate::{
    config::OutputFormat,
    error::{ClipdropError, Result},
    types::ImageFile,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name prefix of scratch files created next to the outputs
pub const TEMP_FILE_PREFIX: &str = ".clipdrop-";

/// Service for handling file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Create a directory (and its parents) if missing
    ///
    /// Returns `true` when the directory was created.
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path_ref = path.as_ref();
        if path_ref.is_dir() {
            return Ok(false);
        }
        if path_ref.exists() {
            return Err(ClipdropError::file_io_error(
                "use as directory",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::AlreadyExists, "path is not a directory"),
            ));
        }

        std::fs::create_dir_all(path_ref)
            .map_err(|e| ClipdropError::file_io_error("create directory", path_ref, &e))?;
        Ok(true)
    }

    /// List the regular files directly inside `dir`
    ///
    /// Not recursive. Scratch files left by an earlier crash are skipped, and when
    /// `pattern` is given only file names matching the glob are returned. Results are
    /// sorted by file name so repeated runs visit files in the same order.
    pub fn list_input_files<P: AsRef<Path>>(dir: P, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
        let dir_ref = dir.as_ref();
        let matcher = pattern
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    ClipdropError::invalid_config(format!("Invalid file pattern '{}': {}", p, e))
                })
            })
            .transpose()?;

        let entries = std::fs::read_dir(dir_ref)
            .map_err(|e| ClipdropError::file_io_error("list directory", dir_ref, &e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ClipdropError::file_io_error("list directory", dir_ref, &e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| ClipdropError::file_io_error("inspect", entry.path(), &e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_FILE_PREFIX) {
                continue;
            }
            if let Some(matcher) = &matcher {
                if !matcher.matches(&name) {
                    continue;
                }
            }

            files.push(entry.path());
        }

        files.sort();
        Ok(files)
    }

    /// Read an input file fully into memory
    pub fn read_image_file<P: AsRef<Path>>(path: P) -> Result<ImageFile> {
        let path_ref = path.as_ref();
        let bytes = std::fs::read(path_ref)
            .map_err(|e| ClipdropError::file_io_error("read input file", path_ref, &e))?;
        Ok(ImageFile::new(path_ref, bytes))
    }

    /// Write bytes to a file, replacing any existing content
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();
        std::fs::write(path_ref, bytes)
            .map_err(|e| ClipdropError::file_io_error("write output file", path_ref, &e))
    }

    /// Create a uniquely named scratch file for one item
    ///
    /// The file lives in `dir`, carries the item's base name for debuggability and is
    /// removed when the returned handle is dropped.
    pub fn scoped_temp_file<P: AsRef<Path>>(dir: P, base_name: &str) -> Result<NamedTempFile> {
        let dir_ref = dir.as_ref();
        tempfile::Builder::new()
            .prefix(&format!("{}{}-", TEMP_FILE_PREFIX, base_name))
            .suffix(".png")
            .tempfile_in(dir_ref)
            .map_err(|e| ClipdropError::file_io_error("create temporary file in", dir_ref, &e))
    }

    /// Move a finished scratch file onto its final path, replacing any existing file
    pub fn persist_temp_file<P: AsRef<Path>>(staged: NamedTempFile, target: P) -> Result<()> {
        let target_ref = target.as_ref();
        staged
            .persist(target_ref)
            .map(|_| ())
            .map_err(|e| ClipdropError::file_io_error("move result to", target_ref, &e.error))
    }

    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first, then falls back to sniffing the
    /// content, since remote results are not guaranteed to match their file extension.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref)
                    .map_err(|io_err| ClipdropError::file_io_error("read image", path_ref, &io_err))?;

                image::load_from_memory(&data)
                    .map_err(|content_err| ClipdropError::image_error("decode image", path_ref, &content_err))
            },
        }
    }

    /// Save an image in the given format
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        // JPEG has no alpha channel
        let encodable = match format {
            OutputFormat::Jpeg if image.color().has_alpha() => {
                DynamicImage::ImageRgb8(image.to_rgb8())
            },
            _ => image.clone(),
        };

        encodable
            .save_with_format(path_ref, format.image_format())
            .map_err(|e| ClipdropError::image_error(&format!("save {}", format), path_ref, &e))
    }
}
