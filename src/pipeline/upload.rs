//! The HTTP boundary: multipart upload and health probe.
//!
//! The controller talks to the service through [`ExtractionBackend`] so
//! tests and alternative transports can stand in for [`HttpBackend`]. The
//! backend only reports what happened on the wire; deciding whether a reply
//! counts as a usable result is left to [`crate::pipeline::normalize`].
//!
//! No request timeout is set: extraction can take minutes and the service
//! is trusted to answer or fail eventually.

use crate::config::ClientConfig;
use crate::error::FinExtractError;
use crate::output::{HealthStatus, PendingFile, UploadResponse};
use futures::future::BoxFuture;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

const MAX_DETAIL_CHARS: usize = 200;

/// Sends a pending file to the extraction service.
pub trait ExtractionBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Upload `file` and decode the reply body.
    ///
    /// `Ok` means a 2xx response with a JSON object body; its `success`
    /// flag and payload are not inspected here.
    fn upload<'a>(
        &'a self,
        file: &'a PendingFile,
    ) -> BoxFuture<'a, Result<UploadResponse, FinExtractError>>;
}

/// `reqwest`-based backend for the FastAPI extraction service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    upload_url: String,
    health_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, FinExtractError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("finextract/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FinExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, config))
    }

    /// Use a caller-built client (proxies, custom TLS roots).
    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            upload_url: config.upload_url(),
            health_url: config.health_url(),
        }
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Probe `GET /api/health`.
    pub async fn health(&self) -> Result<HealthStatus, FinExtractError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| self.transport_error(&self.health_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&self.health_url, e))?;
        if !status.is_success() {
            return Err(FinExtractError::HttpStatus {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| FinExtractError::ResponseShape {
            detail: format!("health body: {e}"),
        })
    }

    async fn post_file(&self, file: &PendingFile) -> Result<UploadResponse, FinExtractError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str("application/pdf")
            .map_err(|e| FinExtractError::Internal(format!("multipart part: {e}")))?;
        let form = Form::new().part(FILE_FIELD, part);

        info!(
            "Uploading '{}' ({} bytes) to {}",
            file.name,
            file.bytes.len(),
            self.upload_url
        );
        let start = Instant::now();

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(&self.upload_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&self.upload_url, e))?;
        debug!(
            "Upload answered HTTP {} with {} bytes after {}ms",
            status,
            body.len(),
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            warn!("Extraction service returned HTTP {}", status);
            return Err(FinExtractError::HttpStatus {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| FinExtractError::ResponseShape {
            detail: format!("body is not a JSON object: {e}"),
        })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> FinExtractError {
        FinExtractError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

impl ExtractionBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn upload<'a>(
        &'a self,
        file: &'a PendingFile,
    ) -> BoxFuture<'a, Result<UploadResponse, FinExtractError>> {
        Box::pin(self.post_file(file))
    }
}

/// Pull FastAPI's `{"detail": …}` out of an error body, else a truncated body.
fn error_detail(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty body".to_string();
    }
    if trimmed.chars().count() > MAX_DETAIL_CHARS {
        let cut: String = trimmed.chars().take(MAX_DETAIL_CHARS - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        trimmed.to_string()
    }
}
