//! Client configuration.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The backend base URL is the only value a typical
//! deployment changes; the rest are the limits and cadences the upload
//! screen has always used, kept tunable for tests and slow backends.

use crate::error::FinExtractError;
use crate::progress::{ObserverHandle, ProgressSchedule, DEFAULT_STATUS_MESSAGES};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "FINEXTRACT_API_BASE_URL";

/// Base URL used when nothing is configured (the FastAPI dev server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the extraction client.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use finextract::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://reports.example.com")
///     .max_pages(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_url(), "https://reports.example.com/api/upload");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash. Default: `http://localhost:8000`.
    pub base_url: String,

    /// Path of the multipart upload endpoint. Default: `/api/upload`.
    pub upload_path: String,

    /// Path of the health probe. Default: `/api/health`.
    pub health_path: String,

    /// Maximum accepted page count. Default: 10.
    pub max_pages: usize,

    /// Maximum accepted file size in bytes. Default: 20 MiB.
    ///
    /// Matches the backend's own upload limit so oversized files are
    /// rejected before they are sent.
    pub max_file_bytes: usize,

    /// Interval between simulated progress steps. Default: 800 ms.
    pub progress_tick: Duration,

    /// Shape of the simulated progress curve.
    pub progress: ProgressSchedule,

    /// Interval between status message rotations. Default: 3 s.
    pub status_tick: Duration,

    /// Status lines cycled while processing. Never empty.
    pub status_messages: Arc<[String]>,

    /// How long a front end keeps the finished progress display visible.
    /// Default: 1 s.
    pub completion_grace: Duration,

    /// Which parser counts PDF pages at selection time.
    pub page_counter: PageCounterKind,

    /// Lifecycle event sink.
    pub observer: Option<ObserverHandle>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_path: "/api/upload".to_string(),
            health_path: "/api/health".to_string(),
            max_pages: 10,
            max_file_bytes: 20 * 1024 * 1024,
            progress_tick: Duration::from_millis(800),
            progress: ProgressSchedule::default(),
            status_tick: Duration::from_millis(3000),
            status_messages: DEFAULT_STATUS_MESSAGES
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .into(),
            completion_grace: Duration::from_millis(1000),
            page_counter: PageCounterKind::default(),
            observer: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("upload_path", &self.upload_path)
            .field("health_path", &self.health_path)
            .field("max_pages", &self.max_pages)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("progress_tick", &self.progress_tick)
            .field("progress", &self.progress)
            .field("status_tick", &self.status_tick)
            .field("status_messages", &self.status_messages.len())
            .field("completion_grace", &self.completion_grace)
            .field("page_counter", &self.page_counter)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn LifecycleObserver>"))
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the base URL taken from `FINEXTRACT_API_BASE_URL` when set.
    pub fn from_env() -> Result<Self, FinExtractError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                builder = builder.base_url(url);
            }
        }
        builder.build()
    }

    /// Full URL of the upload endpoint.
    pub fn upload_url(&self) -> String {
        format!("{}{}", self.base_url, self.upload_path)
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url, self.health_path)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Trailing slashes are trimmed so paths join cleanly.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = normalise_path(path.into());
        self
    }

    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.config.health_path = normalise_path(path.into());
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn max_file_bytes(mut self, n: usize) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn progress_tick(mut self, every: Duration) -> Self {
        self.config.progress_tick = every;
        self
    }

    pub fn progress_schedule(mut self, schedule: ProgressSchedule) -> Self {
        self.config.progress = schedule;
        self
    }

    pub fn status_tick(mut self, every: Duration) -> Self {
        self.config.status_tick = every;
        self
    }

    pub fn status_messages<I, S>(mut self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.status_messages = messages
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>()
            .into();
        self
    }

    pub fn completion_grace(mut self, grace: Duration) -> Self {
        self.config.completion_grace = grace;
        self
    }

    pub fn page_counter(mut self, kind: PageCounterKind) -> Self {
        self.config.page_counter = kind;
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, FinExtractError> {
        let c = &self.config;
        if c.base_url.is_empty() {
            return Err(FinExtractError::InvalidConfig(
                "Base URL must not be empty".into(),
            ));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(FinExtractError::InvalidConfig(format!(
                "Base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.max_pages == 0 {
            return Err(FinExtractError::InvalidConfig(
                "Page limit must be ≥ 1".into(),
            ));
        }
        if c.max_file_bytes == 0 {
            return Err(FinExtractError::InvalidConfig(
                "File size limit must be ≥ 1 byte".into(),
            ));
        }
        if c.progress_tick.is_zero() || c.status_tick.is_zero() {
            return Err(FinExtractError::InvalidConfig(
                "Tick intervals must be non-zero".into(),
            ));
        }
        if c.progress.ceiling >= 100 {
            return Err(FinExtractError::InvalidConfig(format!(
                "Progress ceiling must be below 100, got {}",
                c.progress.ceiling
            )));
        }
        if c.status_messages.is_empty() {
            return Err(FinExtractError::InvalidConfig(
                "At least one status message is required".into(),
            ));
        }
        Ok(self.config)
    }
}

fn normalise_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Parser used to count pages during file intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageCounterKind {
    /// Pure-Rust `lopdf` parser. (default)
    #[default]
    Lopdf,
    /// pdfium via `pdfium-render`; requires the native library at runtime.
    #[cfg(feature = "pdfium")]
    Pdfium,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_screen() {
        let c = ClientConfig::default();
        assert_eq!(c.max_pages, 10);
        assert_eq!(c.progress_tick, Duration::from_millis(800));
        assert_eq!(c.status_tick, Duration::from_millis(3000));
        assert_eq!(c.status_messages.len(), 8);
        assert_eq!(c.upload_url(), "http://localhost:8000/api/upload");
        assert_eq!(c.health_url(), "http://localhost:8000/api/health");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let c = ClientConfig::builder()
            .base_url("https://api.example.com/")
            .upload_path("v2/upload")
            .build()
            .unwrap();
        assert_eq!(c.upload_url(), "https://api.example.com/v2/upload");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ClientConfig::builder()
            .base_url("VITE_API_BASE_URL")
            .build()
            .unwrap_err();
        assert!(matches!(err, FinExtractError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_ceiling_of_100() {
        let err = ClientConfig::builder()
            .progress_schedule(ProgressSchedule {
                ceiling: 100,
                ..ProgressSchedule::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("below 100"));
    }

    #[test]
    fn rejects_empty_status_messages() {
        let err = ClientConfig::builder()
            .status_messages(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("status message"));
    }

    #[test]
    fn rejects_zero_tick() {
        assert!(ClientConfig::builder()
            .progress_tick(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn debug_hides_observer() {
        let c = ClientConfig::builder()
            .observer(std::sync::Arc::new(crate::progress::NoopObserver))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<dyn LifecycleObserver>"));
    }
}
