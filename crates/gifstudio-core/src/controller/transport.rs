//! The one network operation: multipart `POST /gif`.
//!
//! [`CurlTransport`] uses the curl crate (libcurl). The transfer is blocking,
//! so it runs on tokio's blocking pool; the controller only sees an async
//! [`ConversionTransport`].

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use crate::intake::MediaSource;
use crate::settings::EncodeSettings;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("conversion service returned HTTP {0}")]
    Status(u32),
    #[error("conversion service returned an empty body")]
    EmptyBody,
    #[error("transfer worker failed: {0}")]
    Worker(String),
}

impl From<curl::Error> for NetworkError {
    fn from(e: curl::Error) -> Self {
        NetworkError::Transport(e.to_string())
    }
}

impl From<curl::FormError> for NetworkError {
    fn from(e: curl::FormError) -> Self {
        NetworkError::Transport(format!("building form: {}", e))
    }
}

/// Everything sent to the service, snapshotted at submit time.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub video: Bytes,
    pub file_name: String,
    pub mime: String,
    pub fps: u32,
    pub scale: u32,
    pub start_time_sec: f64,
    pub duration_sec: f64,
}

impl ConversionRequest {
    pub fn new(media: &MediaSource, settings: &EncodeSettings) -> Self {
        Self {
            video: media.data(),
            file_name: media.name().to_string(),
            mime: media.mime().to_string(),
            fps: settings.fps,
            scale: settings.scale,
            start_time_sec: settings.start_time_sec,
            duration_sec: settings.duration_sec,
        }
    }

    /// Scalar form fields in wire order. Decimals print without a trailing
    /// `.0`, so a zero duration goes out as `0`.
    pub fn form_fields(&self) -> [(&'static str, String); 4] {
        [
            ("fps", self.fps.to_string()),
            ("scale", self.scale.to_string()),
            ("startTime", self.start_time_sec.to_string()),
            ("duration", self.duration_sec.to_string()),
        ]
    }
}

/// Raw response of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub data: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ConversionTransport: Send + Sync {
    async fn convert(&self, request: ConversionRequest) -> Result<ConversionOutput, NetworkError>;
}

/// libcurl-backed transport. No retries; no timeout unless one is configured.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    endpoint: String,
    timeout: Option<Duration>,
}

impl CurlTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConversionTransport for CurlTransport {
    async fn convert(&self, request: ConversionRequest) -> Result<ConversionOutput, NetworkError> {
        let endpoint = self.endpoint.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || post_form(&endpoint, timeout, &request))
            .await
            .map_err(|e| NetworkError::Worker(e.to_string()))?
    }
}

/// Performs the multipart POST and returns the response body.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn post_form(
    endpoint: &str,
    timeout: Option<Duration>,
    request: &ConversionRequest,
) -> Result<ConversionOutput, NetworkError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(endpoint)?;
    easy.follow_location(true)?;
    if let Some(t) = timeout {
        easy.timeout(t)?;
    }

    // Suppress `Expect: 100-continue`; the body goes out in one go.
    let mut headers = curl::easy::List::new();
    headers.append("Expect:")?;
    easy.http_headers(headers)?;

    let mut form = curl::easy::Form::new();
    form.part("video")
        .buffer(&request.file_name, request.video.to_vec())
        .content_type(&request.mime)
        .add()?;
    for (name, value) in request.form_fields() {
        form.part(name).contents(value.as_bytes()).add()?;
    }
    easy.httppost(form)?;

    tracing::debug!(
        endpoint,
        bytes = request.video.len(),
        fps = request.fps,
        scale = request.scale,
        start = request.start_time_sec,
        duration = request.duration_sec,
        "POST conversion request"
    );

    let mut body = Vec::new();
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(NetworkError::Status(code));
    }
    if body.is_empty() {
        return Err(NetworkError::EmptyBody);
    }
    let content_type = easy.content_type()?.map(str::to_string);

    Ok(ConversionOutput {
        data: Bytes::from(body),
        content_type,
    })
}
