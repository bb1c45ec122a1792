//! Remote edit service client
//!
//! [`RemoteEditClient`] is the seam between the batch runner and the network: the
//! runner only ever sees this trait, so tests substitute a scripted implementation
//! and [`ClipdropClient`] carries the real HTTP plumbing.

use crate::{
    config::{ApiKey, ApiMode, Endpoints, OutputFormat, ProcessingConfig, UpscaleFactor},
    error::{ClipdropError, Result},
    services::OutputFormatHandler,
    tracing_config::spans,
    types::{ImageFile, RemoteImage},
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, Instrument};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header the service uses to report the remaining credit balance
pub const REMAINING_CREDITS_HEADER: &str = "x-remaining-credits";

/// Multipart field holding the image
pub const IMAGE_FIELD: &str = "image_file";

/// Form field holding the scale factor
pub const UPSCALE_FIELD: &str = "upscale";

/// Trait for the two remote image operations
#[async_trait]
pub trait RemoteEditClient: Send + Sync {
    /// Remove the background of an image
    ///
    /// # Errors
    /// - `LocalIo` when the image has no bytes
    /// - `RemoteApi` on transport failure, timeout or a non-2xx response
    async fn remove_background(&self, image: &ImageFile, format: OutputFormat) -> Result<RemoteImage>;

    /// Upscale an image by `factor`
    ///
    /// # Errors
    /// - `LocalIo` when the image has no bytes
    /// - `RemoteApi` on transport failure, timeout or a non-2xx response
    async fn upscale(
        &self,
        image: &ImageFile,
        format: OutputFormat,
        factor: UpscaleFactor,
    ) -> Result<RemoteImage>;

    /// Dispatch according to the configured mode
    async fn dispatch(&self, image: &ImageFile, config: &ProcessingConfig) -> Result<RemoteImage> {
        let format = config.effective_output_format();
        match config.mode {
            ApiMode::RemoveBackground => self.remove_background(image, format).await,
            ApiMode::SuperResolution => self.upscale(image, format, config.upscale).await,
        }
    }
}

/// HTTP client for the Clipdrop API
#[derive(Debug, Clone)]
pub struct ClipdropClient {
    http: reqwest::Client,
    api_key: ApiKey,
    endpoints: Endpoints,
    timeout: Duration,
}

impl ClipdropClient {
    /// Create a client from explicit parts
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn new(api_key: ApiKey, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("clipdrop-batch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClipdropError::invalid_config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            endpoints,
            timeout,
        })
    }

    /// Create a client for a resolved processing configuration
    ///
    /// # Errors
    /// - Failed to create HTTP client
    pub fn from_config(config: &ProcessingConfig) -> Result<Self> {
        Self::new(
            config.api_key.clone(),
            config.endpoints.clone(),
            config.request_timeout,
        )
    }

    /// Endpoints this client posts to
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn image_part(image: &ImageFile, format: OutputFormat) -> Result<Part> {
        let content_type =
            OutputFormatHandler::detect_mime(&image.bytes).unwrap_or_else(|| format.mime_type());

        Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(content_type)
            .map_err(|e| ClipdropError::processing(format!("Invalid content type {}: {}", content_type, e)))
    }

    async fn post(&self, endpoint: &str, form: Form, format: OutputFormat) -> Result<RemoteImage> {
        let response = self
            .http
            .post(endpoint)
            .header(API_KEY_HEADER, self.api_key.expose())
            .header(reqwest::header::ACCEPT, format.mime_type())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(endpoint, &e))?;

        let status = response.status();
        let remaining_credits = response
            .headers()
            .get(REMAINING_CREDITS_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClipdropError::remote_status(status.as_u16(), &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(endpoint, &e))?;

        debug!(
            status = status.as_u16(),
            response_bytes = bytes.len(),
            remaining_credits = ?remaining_credits,
            "Remote call succeeded"
        );

        Ok(RemoteImage {
            bytes: bytes.to_vec(),
            remaining_credits,
        })
    }

    fn transport_error(&self, endpoint: &str, error: &reqwest::Error) -> ClipdropError {
        if error.is_timeout() {
            ClipdropError::timeout(endpoint, self.timeout)
        } else {
            ClipdropError::remote_transport(endpoint, error)
        }
    }
}

fn ensure_not_empty(image: &ImageFile) -> Result<()> {
    if image.is_empty() {
        return Err(ClipdropError::processing(format!(
            "Input file '{}' is empty",
            image.path.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl RemoteEditClient for ClipdropClient {
    async fn remove_background(&self, image: &ImageFile, format: OutputFormat) -> Result<RemoteImage> {
        ensure_not_empty(image)?;
        let endpoint = self.endpoints.for_mode(ApiMode::RemoveBackground);
        let form = Form::new().part(IMAGE_FIELD, Self::image_part(image, format)?);

        self.post(endpoint, form, format)
            .instrument(spans::remote_call(
                "remove-background",
                &image.file_name,
                format.extension(),
            ))
            .await
    }

    async fn upscale(
        &self,
        image: &ImageFile,
        format: OutputFormat,
        factor: UpscaleFactor,
    ) -> Result<RemoteImage> {
        ensure_not_empty(image)?;
        let endpoint = self.endpoints.for_mode(ApiMode::SuperResolution);
        let form = Form::new()
            .part(IMAGE_FIELD, Self::image_part(image, format)?)
            .text(UPSCALE_FIELD, factor.as_u32().to_string());

        self.post(endpoint, form, format)
            .instrument(spans::remote_call(
                "super-resolution",
                &image.file_name,
                format.extension(),
            ))
            .await
    }
}
