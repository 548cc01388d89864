//! Error types for the finextract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ValidationError`] — **Local**: the selected file was rejected before
//!   any network traffic (not a PDF, too large, too many pages). The pending
//!   selection is left exactly as it was.
//!
//! * [`FinExtractError`] — **Fatal** for the current operation: the file
//!   could not be read, the extraction request failed, or the export could
//!   not be written.
//!
//! Transport failures, non-2xx responses, `success: false` replies and
//! malformed bodies all carry their own detail for logs, but
//! [`FinExtractError::user_message`] collapses them into one generic text.

use std::path::PathBuf;
use thiserror::Error;

/// The message shown to the user for any failed extraction request.
pub const GENERIC_EXTRACTION_FAILURE: &str =
    "Extraction failed. Please check the backend console.";

/// Rejection reasons raised by file intake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Zero-byte selection.
    #[error("'{name}' is empty")]
    EmptyFile { name: String },

    /// First bytes are not `%PDF`.
    #[error("'{name}' is not a PDF file (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// Larger than the upload limit.
    #[error("'{name}' is {size} bytes; the upload limit is {limit} bytes")]
    TooLarge { name: String, size: usize, limit: usize },

    /// Has a PDF header but the document structure could not be read.
    #[error("Invalid PDF file '{name}': {detail}")]
    Malformed { name: String, detail: String },

    /// Page count exceeds the configured maximum.
    #[error("PDF exceeds {limit} pages ({pages} found). Please upload a file with {limit} pages or fewer.")]
    TooManyPages { pages: usize, limit: usize },
}

/// All fatal errors returned by the finextract library.
#[derive(Debug, Error)]
pub enum FinExtractError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The selection was rejected by client-side validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Lifecycle errors ──────────────────────────────────────────────────
    /// `process` was called with no accepted file.
    #[error("No PDF selected. Choose a file before starting extraction.")]
    NoPendingFile,

    /// `process` was called while a request is already in flight.
    #[error("An extraction request is already in progress")]
    AlreadyProcessing,

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The request never produced an HTTP response.
    #[error("Could not reach the extraction service at '{url}': {reason}")]
    Transport { url: String, reason: String },

    /// The service answered with a non-2xx status.
    #[error("Extraction service returned HTTP {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    /// The service answered `success: false`.
    #[error("Extraction service reported failure: {}", message.as_deref().unwrap_or("no message"))]
    Rejected { message: Option<String> },

    /// A nominally successful response had missing or unexpected fields.
    #[error("Unexpected response from extraction service: {detail}")]
    ResponseShape { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The export payload is not valid base64.
    #[error("Export payload could not be decoded: {detail}")]
    ExportDecode { detail: String },

    /// Could not create or write the exported workbook.
    #[error("Failed to write export file '{path}': {source}")]
    ExportWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FinExtractError {
    /// True for every way the remote extraction call can fail.
    pub fn is_extraction_failure(&self) -> bool {
        matches!(
            self,
            FinExtractError::Transport { .. }
                | FinExtractError::HttpStatus { .. }
                | FinExtractError::Rejected { .. }
                | FinExtractError::ResponseShape { .. }
        )
    }

    /// Text suitable for a blocking user notification.
    ///
    /// Extraction failures are deliberately indistinguishable here; the
    /// `Display` form keeps the detail for logs.
    pub fn user_message(&self) -> String {
        if self.is_extraction_failure() {
            GENERIC_EXTRACTION_FAILURE.to_string()
        } else {
            self.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_pages_display() {
        let e = ValidationError::TooManyPages {
            pages: 11,
            limit: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("10 pages"), "got: {msg}");
        assert!(msg.contains("11 found"), "got: {msg}");
    }

    #[test]
    fn validation_converts_into_fatal() {
        let e: FinExtractError = ValidationError::EmptyFile {
            name: "a.pdf".into(),
        }
        .into();
        assert!(matches!(e, FinExtractError::Validation(_)));
        assert!(e.to_string().contains("a.pdf"));
        assert!(!e.is_extraction_failure());
    }

    #[test]
    fn extraction_failures_share_one_user_message() {
        let errors = [
            FinExtractError::Transport {
                url: "http://localhost:8000/api/upload".into(),
                reason: "connection refused".into(),
            },
            FinExtractError::HttpStatus {
                status: 500,
                detail: "Internal Server Error".into(),
            },
            FinExtractError::Rejected {
                message: Some("No financial data found in PDF.".into()),
            },
            FinExtractError::ResponseShape {
                detail: "missing excelBuffer".into(),
            },
        ];
        for e in &errors {
            assert!(e.is_extraction_failure());
            assert_eq!(e.user_message(), GENERIC_EXTRACTION_FAILURE);
        }
    }

    #[test]
    fn rejected_display_without_message() {
        let e = FinExtractError::Rejected { message: None };
        assert!(e.to_string().contains("no message"));
    }

    #[test]
    fn lifecycle_errors_keep_their_text() {
        let e = FinExtractError::AlreadyProcessing;
        assert_eq!(e.user_message(), e.to_string());
    }
}
