//! # finextract
//!
//! Client for a financial-statement extraction service: pick a PDF, upload
//! it, watch progress, read back the extracted tables and save the Excel
//! workbook the service produced.
//!
//! The extraction itself happens remotely. This crate owns everything on
//! the client side of that call: local validation, the request lifecycle
//! and its progress signals, reshaping the reply into flat tables, and the
//! export.
//!
//! ## Lifecycle Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Intake     %PDF magic, size ≤ 20 MiB, page count ≤ 10 (lopdf)
//!  ├─ 2. Process    multipart POST /api/upload, simulated progress + status
//!  ├─ 3. Normalize  flat or wrapped rows → one row list per category
//!  ├─ 4. Render     header + cell strings per non-empty category
//!  └─ 5. Export     base64 → Financial_Report_<ms>.xlsx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use finextract::{ClientConfig, ExtractionController, TableView};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Base URL from FINEXTRACT_API_BASE_URL, else http://localhost:8000
//!     let controller = ExtractionController::http(ClientConfig::from_env()?)?;
//!     controller.select_path("annual_report.pdf").await?;
//!
//!     let result = controller.process().await?;
//!     for category in result.non_empty_categories() {
//!         println!("{}\n{}", category, TableView::from_rows(result.rows(category)).render_text());
//!     }
//!     if let Some(path) = controller.export(std::path::Path::new("."))? {
//!         eprintln!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `finextract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `pdfium` | off     | Page counting through pdfium instead of lopdf |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! finextract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, PageCounterKind};
pub use controller::{ExtractionController, LifecycleSnapshot, LifecycleState};
pub use error::{FinExtractError, ValidationError, GENERIC_EXTRACTION_FAILURE};
pub use output::{
    Category, ExportPayload, ExtractionResult, HealthStatus, PendingFile, RowRecord,
    UploadResponse,
};
pub use pipeline::export::export_payload;
pub use pipeline::intake::{LopdfPageCounter, PageCounter};
pub use pipeline::normalize::normalize;
pub use pipeline::upload::{ExtractionBackend, HttpBackend};
pub use progress::{LifecycleObserver, NoopObserver, ObserverHandle, ProgressSchedule};
pub use table::TableView;
