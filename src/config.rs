//! Configuration types for batch processing runs

use crate::error::{ClipdropError, Result};
use crate::utils::ColorParser;
use image::{ImageFormat, Rgb};
use serde::{Serialize, Serializer};
use std::str::FromStr;
use std::time::Duration;

/// Default remote request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default production API host
pub const DEFAULT_API_BASE_URL: &str = "https://apis.clipdrop.co";

/// Remote operation applied to every image in the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiMode {
    /// Cut the subject out and drop the background
    RemoveBackground,
    /// Upscale the image by 2x or 4x
    SuperResolution,
}

impl std::fmt::Display for ApiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoveBackground => write!(f, "remove-background"),
            Self::SuperResolution => write!(f, "super-resolution"),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency)
    Jpeg,
    /// WebP with alpha channel transparency
    WebP,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl OutputFormat {
    /// MIME type sent in the `accept` header
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// File extension used for output files (without the dot)
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    /// Matching `image` crate format for local encoding
    #[must_use]
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ClipdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            other => Err(ClipdropError::config_value_error(
                "output format",
                other.to_string(),
                "png, jpeg, webp",
                Some("png".to_string()),
            )),
        }
    }
}

/// Super-resolution scale factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpscaleFactor {
    /// Double width and height
    #[serde(rename = "2")]
    X2,
    /// Quadruple width and height
    #[serde(rename = "4")]
    X4,
}

impl Default for UpscaleFactor {
    fn default() -> Self {
        Self::X2
    }
}

impl UpscaleFactor {
    /// Numeric factor as sent in the `upscale` form field
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }
}

impl TryFrom<u32> for UpscaleFactor {
    type Error = ClipdropError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            other => Err(ClipdropError::config_value_error(
                "upscale factor",
                other,
                "2 or 4",
                Some(2),
            )),
        }
    }
}

impl std::fmt::Display for UpscaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Replacement background for remove-background results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundSpec {
    /// Light/dark tiled transparency grid
    Checkerboard,
    /// Solid opaque color
    Solid(Rgb<u8>),
}

impl BackgroundSpec {
    /// Literal value selecting the checkerboard background
    pub const CHECKERBOARD: &'static str = "checkerboard";
}

impl FromStr for BackgroundSpec {
    type Err = ClipdropError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(Self::CHECKERBOARD) {
            Ok(Self::Checkerboard)
        } else {
            ColorParser::parse(s).map(Self::Solid)
        }
    }
}

impl std::fmt::Display for BackgroundSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Checkerboard => f.write_str(Self::CHECKERBOARD),
            Self::Solid(color) => f.write_str(&ColorParser::to_hex(*color)),
        }
    }
}

impl Serialize for BackgroundSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// API key wrapper that never prints its value
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self(key.into())
    }

    /// Raw key for the `x-api-key` header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key is blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Remote endpoint URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoints {
    /// Remove-background endpoint
    pub remove_background: String,
    /// Super-resolution endpoint
    pub super_resolution: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL)
    }
}

impl Endpoints {
    /// Build both endpoints under a different host (staging, local test server)
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            remove_background: format!("{base}/remove-background/v1"),
            super_resolution: format!("{base}/super-resolution/v1"),
        }
    }

    /// Endpoint serving the given mode
    #[must_use]
    pub fn for_mode(&self, mode: ApiMode) -> &str {
        match mode {
            ApiMode::RemoveBackground => &self.remove_background,
            ApiMode::SuperResolution => &self.super_resolution,
        }
    }
}

/// Immutable configuration resolved once per run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingConfig {
    /// Credential for the remote service
    #[serde(skip)]
    pub api_key: ApiKey,

    /// Remote operation
    pub mode: ApiMode,

    /// Scale factor, only used in super-resolution mode
    pub upscale: UpscaleFactor,

    /// Requested output format
    pub output_format: OutputFormat,

    /// Replacement background; `None` keeps transparency
    pub background: Option<BackgroundSpec>,

    /// Append input and output side by side after processing
    pub join: bool,

    /// Remote endpoints
    pub endpoints: Endpoints,

    /// Per-request timeout for remote calls
    pub request_timeout: Duration,

    /// Maximum number of files in flight (1 = strictly sequential)
    pub concurrency: usize,

    /// Optional glob applied to input file names
    pub pattern: Option<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            api_key: ApiKey::default(),
            mode: ApiMode::RemoveBackground,
            upscale: UpscaleFactor::default(),
            output_format: OutputFormat::default(),
            background: None,
            join: false,
            endpoints: Endpoints::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            concurrency: 1,
            pattern: None,
        }
    }
}

impl ProcessingConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use clipdrop_batch::config::{ApiMode, OutputFormat, ProcessingConfig};
    ///
    /// let config = ProcessingConfig::builder()
    ///     .api_key("secret")
    ///     .mode(ApiMode::SuperResolution)
    ///     .upscale(4)
    ///     .output_format(OutputFormat::WebP)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.upscale.as_u32(), 4);
    /// ```
    #[must_use]
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::default()
    }

    /// Whether results are composited onto a new background
    ///
    /// Background substitution only applies to remove-background results.
    #[must_use]
    pub fn background_active(&self) -> bool {
        self.mode == ApiMode::RemoveBackground && self.background.is_some()
    }

    /// Format actually written to disk
    ///
    /// Composited results are always PNG regardless of `output_format`.
    #[must_use]
    pub fn effective_output_format(&self) -> OutputFormat {
        if self.background_active() {
            OutputFormat::Png
        } else {
            self.output_format
        }
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Missing API key
    /// - Zero concurrency or zero timeout
    /// - Invalid glob pattern
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(ClipdropError::invalid_config("API key must not be empty"));
        }

        if self.concurrency == 0 {
            return Err(ClipdropError::config_value_error(
                "concurrency",
                0,
                ">= 1",
                Some(1),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ClipdropError::config_value_error(
                "request timeout (seconds)",
                0,
                "> 0",
                Some(DEFAULT_REQUEST_TIMEOUT.as_secs()),
            ));
        }

        if let Some(pattern) = &self.pattern {
            glob::Pattern::new(pattern).map_err(|e| {
                ClipdropError::invalid_config(format!("Invalid file pattern '{}': {}", pattern, e))
            })?;
        }

        if self.background.is_some() && self.mode == ApiMode::SuperResolution {
            log::warn!("Background color is ignored in super-resolution mode");
        }

        Ok(())
    }
}

/// Builder for `ProcessingConfig`
///
/// Raw values (upscale factor, background string) are checked in [`build`](Self::build)
/// so that invalid flag combinations fail before any file is touched.
#[derive(Debug, Default)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
    upscale: Option<u32>,
    background: Option<String>,
}

impl ProcessingConfigBuilder {
    /// Set the API key
    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.api_key = ApiKey::new(key);
        self
    }

    /// Set the remote operation
    #[must_use]
    pub fn mode(mut self, mode: ApiMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the raw upscale factor (validated at build time)
    #[must_use]
    pub fn upscale(mut self, factor: u32) -> Self {
        self.upscale = Some(factor);
        self
    }

    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set the raw background color (validated at build time)
    #[must_use]
    pub fn background_color<S: Into<String>>(mut self, color: S) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Set an already parsed background
    #[must_use]
    pub fn background(mut self, background: Option<BackgroundSpec>) -> Self {
        self.background = None;
        self.config.background = background;
        self
    }

    /// Enable the side-by-side join step
    #[must_use]
    pub fn join(mut self, join: bool) -> Self {
        self.config.join = join;
        self
    }

    /// Override endpoints
    #[must_use]
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    /// Set the remote request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the number of files processed concurrently
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Restrict inputs to file names matching a glob
    #[must_use]
    pub fn pattern<S: Into<String>>(mut self, pattern: Option<S>) -> Self {
        self.config.pattern = pattern.map(Into::into);
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Upscale factor other than 2 or 4
    /// - Unparseable background color
    /// - Any failure from [`ProcessingConfig::validate`]
    pub fn build(mut self) -> Result<ProcessingConfig> {
        if let Some(factor) = self.upscale {
            self.config.upscale = UpscaleFactor::try_from(factor)?;
        }

        if let Some(color) = &self.background {
            self.config.background = Some(color.parse()?);
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ProcessingConfigBuilder {
        ProcessingConfig::builder().api_key("test-key")
    }

    #[test]
    fn test_output_format_mime_types() {
        assert_eq!(OutputFormat::Png.mime_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(OutputFormat::WebP.mime_type(), "image/webp");
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert!("tiff".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_upscale_factor_validation() {
        assert_eq!(UpscaleFactor::try_from(2).unwrap(), UpscaleFactor::X2);
        assert_eq!(UpscaleFactor::try_from(4).unwrap(), UpscaleFactor::X4);
        for invalid in [0, 1, 3, 8] {
            let err = UpscaleFactor::try_from(invalid).unwrap_err();
            assert!(matches!(err, ClipdropError::InvalidConfig(_)));
        }

        let err = base().upscale(3).build().unwrap_err();
        assert!(err.to_string().contains("upscale factor"));
    }

    #[test]
    fn test_background_forces_png() {
        let config = base()
            .output_format(OutputFormat::Jpeg)
            .background_color("white")
            .build()
            .unwrap();
        assert!(config.background_active());
        assert_eq!(config.effective_output_format(), OutputFormat::Png);

        let config = base()
            .output_format(OutputFormat::WebP)
            .background_color("checkerboard")
            .build()
            .unwrap();
        assert_eq!(config.background, Some(BackgroundSpec::Checkerboard));
        assert_eq!(config.effective_output_format(), OutputFormat::Png);
    }

    #[test]
    fn test_background_accepts_css_names() {
        for name in ["dodgerblue", "lightcoral", "orchid", "slategray", "chartreuse"] {
            let spec: BackgroundSpec = name.parse().unwrap();
            assert!(matches!(spec, BackgroundSpec::Solid(_)), "{}", name);
            assert!(base().background_color(name).build().is_ok(), "{}", name);
        }
        assert_eq!(
            "DodgerBlue".parse::<BackgroundSpec>().unwrap(),
            BackgroundSpec::Solid(Rgb([30, 144, 255]))
        );
    }

    #[test]
    fn test_background_ignored_for_super_resolution() {
        let config = base()
            .mode(ApiMode::SuperResolution)
            .output_format(OutputFormat::Jpeg)
            .background_color("red")
            .build()
            .unwrap();
        assert!(!config.background_active());
        assert_eq!(config.effective_output_format(), OutputFormat::Jpeg);
    }

    #[test]
    fn test_validation_failures() {
        assert!(ProcessingConfig::builder().build().is_err());
        assert!(base().concurrency(0).build().is_err());
        assert!(base().request_timeout(Duration::ZERO).build().is_err());
        assert!(base().pattern(Some("[")).build().is_err());
        assert!(base().background_color("nope").build().is_err());
    }

    #[test]
    fn test_endpoints_base_url() {
        let endpoints = Endpoints::with_base_url("http://127.0.0.1:8080/");
        assert_eq!(
            endpoints.for_mode(ApiMode::RemoveBackground),
            "http://127.0.0.1:8080/remove-background/v1"
        );
        assert_eq!(
            endpoints.for_mode(ApiMode::SuperResolution),
            "http://127.0.0.1:8080/super-resolution/v1"
        );
        assert!(Endpoints::default()
            .remove_background
            .starts_with(DEFAULT_API_BASE_URL));
    }

    #[test]
    fn test_api_key_redacted() {
        let config = base().build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("test-key"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("test-key"));
        assert!(json.contains("\"mode\":\"remove-background\""));
    }
}
