//! Error types for batch processing operations

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for batch processing operations
pub type Result<T> = std::result::Result<T, ClipdropError>;

/// Longest remote error body kept in an error message
const MAX_REMOTE_MESSAGE_LEN: usize = 512;

/// Comprehensive error types for batch processing operations
#[derive(Error, Debug)]
pub enum ClipdropError {
    /// Invalid configuration or flag combination
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Remote API failure (non-2xx status, transport failure or timeout)
    #[error("Remote API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteApi {
        /// HTTP status code, `None` for transport-level failures
        status: Option<u16>,
        /// Response body or transport error description
        message: String,
    },

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decode/encode errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Compositing or join failures not covered by the image crate
    #[error("Processing error: {0}")]
    Processing(String),

    /// Operator-issued cancellation (Ctrl-C)
    #[error("Interrupted by operator")]
    Interrupted,
}

/// Coarse error classification used by the batch report
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid flags or configuration
    Config,
    /// Remote service failure
    RemoteApi,
    /// Local file or image failure
    LocalIo,
    /// Operator cancellation
    Interrupted,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::RemoteApi => write!(f, "remote-api"),
            Self::LocalIo => write!(f, "local-io"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl ClipdropError {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfig(_) => ErrorKind::Config,
            Self::RemoteApi { .. } => ErrorKind::RemoteApi,
            Self::Io(_) | Self::Image(_) | Self::Processing(_) => ErrorKind::LocalIo,
            Self::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// HTTP status carried by a remote error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteApi { status, .. } => *status,
            _ => None,
        }
    }

    // Enhanced contextual error creators

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<Path>>(operation: &str, path: P, error: &std::io::Error) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create image error with path context
    pub fn image_error<P: AsRef<Path>>(operation: &str, path: P, error: &image::ImageError) -> Self {
        Self::Processing(format!(
            "Failed to {} '{}': {}",
            operation,
            path.as_ref().display(),
            error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create a remote error from a non-success HTTP response
    pub fn remote_status(status: u16, body: &str) -> Self {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            "empty response body".to_string()
        } else if trimmed.chars().count() > MAX_REMOTE_MESSAGE_LEN {
            let truncated: String = trimmed.chars().take(MAX_REMOTE_MESSAGE_LEN).collect();
            format!("{truncated}...")
        } else {
            trimmed.to_string()
        };

        Self::RemoteApi {
            status: Some(status),
            message,
        }
    }

    /// Create a remote error from a transport failure
    pub fn remote_transport<E: std::fmt::Display>(endpoint: &str, error: E) -> Self {
        Self::RemoteApi {
            status: None,
            message: format!("request to {} failed: {}", endpoint, error),
        }
    }

    /// Create a remote error for a request that exceeded its deadline
    pub fn timeout(endpoint: &str, limit: Duration) -> Self {
        Self::RemoteApi {
            status: None,
            message: format!(
                "request to {} timed out after {}s",
                endpoint,
                limit.as_secs_f64()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ClipdropError::invalid_config("x").kind(), ErrorKind::Config);
        assert_eq!(ClipdropError::remote_status(500, "boom").kind(), ErrorKind::RemoteApi);
        assert_eq!(ClipdropError::processing("x").kind(), ErrorKind::LocalIo);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(ClipdropError::from(io).kind(), ErrorKind::LocalIo);
        assert_eq!(ClipdropError::Interrupted.kind(), ErrorKind::Interrupted);
    }

    #[test]
    fn test_remote_error_display() {
        let err = ClipdropError::remote_status(402, "  Not enough credits \n");
        assert_eq!(err.status(), Some(402));
        assert_eq!(err.to_string(), "Remote API error (HTTP 402): Not enough credits");

        let err = ClipdropError::timeout("https://example.test/v1", Duration::from_secs(60));
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("timed out after 60s"));
    }

    #[test]
    fn test_remote_message_truncated() {
        let body = "e".repeat(2000);
        let err = ClipdropError::remote_status(500, &body);
        match err {
            ClipdropError::RemoteApi { message, .. } => {
                assert_eq!(message.len(), MAX_REMOTE_MESSAGE_LEN + 3);
                assert!(message.ends_with("..."));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = ClipdropError::file_io_error("write output", Path::new("/out/a.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write output"));
        assert!(error_string.contains("/out/a.png"));

        let err = ClipdropError::config_value_error("upscale factor", 3, "2 or 4", Some(2));
        let error_string = err.to_string();
        assert!(error_string.contains("upscale factor"));
        assert!(error_string.contains('3'));
        assert!(error_string.contains("Recommended: 2"));
    }
}
