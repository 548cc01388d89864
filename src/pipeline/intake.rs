//! File intake: validate a selected PDF before it becomes the pending file.
//!
//! Checks run cheapest first — empty file, `%PDF` magic bytes, size limit —
//! so obviously wrong selections never reach the parser. The page count is
//! then read from the document's page tree; parsing is CPU-bound and runs
//! on the blocking pool.

use crate::config::{ClientConfig, PageCounterKind};
use crate::error::{FinExtractError, ValidationError};
use crate::output::PendingFile;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Counts the pages of an in-memory PDF.
///
/// `Err` carries a parser message; intake wraps it in
/// [`ValidationError::Malformed`].
pub trait PageCounter: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn count_pages(&self, bytes: &[u8]) -> Result<usize, String>;
}

/// Page counting with `lopdf`. Works on the byte buffer directly.
pub struct LopdfPageCounter;

impl PageCounter for LopdfPageCounter {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn count_pages(&self, bytes: &[u8]) -> Result<usize, String> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
        Ok(document.get_pages().len())
    }
}

/// Page counting with pdfium. Binds to a library next to the executable's
/// working directory first, then the system library path.
#[cfg(feature = "pdfium")]
pub struct PdfiumPageCounter;

#[cfg(feature = "pdfium")]
impl PageCounter for PdfiumPageCounter {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn count_pages(&self, bytes: &[u8]) -> Result<usize, String> {
        use pdfium_render::prelude::Pdfium;

        let bindings =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| format!("pdfium library unavailable: {e:?}"))?;
        let pdfium = Pdfium::new(bindings);
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| format!("{e:?}"))?;
        Ok(document.pages().len() as usize)
    }
}

/// The counter selected by configuration.
pub fn counter_for(kind: PageCounterKind) -> Arc<dyn PageCounter> {
    match kind {
        PageCounterKind::Lopdf => Arc::new(LopdfPageCounter),
        #[cfg(feature = "pdfium")]
        PageCounterKind::Pdfium => Arc::new(PdfiumPageCounter),
    }
}

/// Validate `bytes` and build the pending file. Blocking.
pub fn validate(
    name: &str,
    bytes: Vec<u8>,
    config: &ClientConfig,
    counter: &dyn PageCounter,
) -> Result<PendingFile, ValidationError> {
    if bytes.is_empty() {
        return Err(ValidationError::EmptyFile {
            name: name.to_string(),
        });
    }

    if !bytes.starts_with(PDF_MAGIC) {
        return Err(ValidationError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }

    if bytes.len() > config.max_file_bytes {
        return Err(ValidationError::TooLarge {
            name: name.to_string(),
            size: bytes.len(),
            limit: config.max_file_bytes,
        });
    }

    let pages = counter
        .count_pages(&bytes)
        .map_err(|detail| ValidationError::Malformed {
            name: name.to_string(),
            detail,
        })?;
    debug!("{}: {} pages ({})", name, pages, counter.name());

    if pages == 0 {
        return Err(ValidationError::Malformed {
            name: name.to_string(),
            detail: "document has no pages".into(),
        });
    }

    if pages > config.max_pages {
        return Err(ValidationError::TooManyPages {
            pages,
            limit: config.max_pages,
        });
    }

    Ok(PendingFile {
        name: name.to_string(),
        bytes,
        page_count: pages,
    })
}

/// Run [`validate`] on the blocking pool.
pub async fn inspect_bytes(
    name: String,
    bytes: Vec<u8>,
    config: &ClientConfig,
    counter: Arc<dyn PageCounter>,
) -> Result<PendingFile, FinExtractError> {
    let config = config.clone();
    let file = tokio::task::spawn_blocking(move || {
        validate(&name, bytes, &config, counter.as_ref())
    })
    .await
    .map_err(|e| FinExtractError::Internal(format!("Intake task panicked: {}", e)))??;

    info!(
        "Accepted '{}': {} pages, {} bytes",
        file.name,
        file.page_count,
        file.bytes.len()
    );
    Ok(file)
}

/// Read a local file, keeping its file name for the upload.
pub async fn read_path(path: &Path) -> Result<(String, Vec<u8>), FinExtractError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FinExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => FinExtractError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FinExtractError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })?;
    Ok((display_name(path), bytes))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "document.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counter that reports a fixed page count without parsing.
    struct FixedCounter(usize);

    impl PageCounter for FixedCounter {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn count_pages(&self, _bytes: &[u8]) -> Result<usize, String> {
            Ok(self.0)
        }
    }

    fn pdf_like() -> Vec<u8> {
        b"%PDF-1.5\n%stub".to_vec()
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = validate("a.pdf", vec![], &ClientConfig::default(), &FixedCounter(1))
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyFile { .. }));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let err = validate(
            "a.png",
            b"\x89PNG\r\n".to_vec(),
            &ClientConfig::default(),
            &FixedCounter(1),
        )
        .unwrap_err();
        match err {
            ValidationError::NotAPdf { magic, .. } => assert_eq!(magic, b"\x89PNG".to_vec()),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn oversized_file_is_rejected_before_parsing() {
        let config = ClientConfig::builder().max_file_bytes(8).build().unwrap();
        let err = validate("big.pdf", pdf_like(), &config, &FixedCounter(1)).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { limit: 8, .. }));
    }

    #[test]
    fn page_limit_is_inclusive() {
        let config = ClientConfig::default();
        let ok = validate("ten.pdf", pdf_like(), &config, &FixedCounter(10)).unwrap();
        assert_eq!(ok.page_count, 10);

        let err = validate("eleven.pdf", pdf_like(), &config, &FixedCounter(11)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooManyPages {
                pages: 11,
                limit: 10
            }
        );
    }

    #[test]
    fn zero_pages_is_malformed() {
        let err = validate("blank.pdf", pdf_like(), &ClientConfig::default(), &FixedCounter(0))
            .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { .. }));
    }

    #[test]
    fn lopdf_rejects_truncated_document() {
        let err = validate(
            "broken.pdf",
            pdf_like(),
            &ClientConfig::default(),
            &LopdfPageCounter,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Malformed { .. }));
    }

    #[test]
    fn display_name_falls_back() {
        assert_eq!(display_name(Path::new("/tmp/q3 report.pdf")), "q3 report.pdf");
        assert_eq!(display_name(Path::new("/")), "document.pdf");
    }

    #[tokio::test]
    async fn read_missing_file() {
        let err = read_path(Path::new("/definitely/not/a/real/file.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, FinExtractError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn inspect_bytes_wraps_validation_error() {
        let err = inspect_bytes(
            "a.txt".into(),
            b"hello".to_vec(),
            &ClientConfig::default(),
            Arc::new(FixedCounter(1)),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            FinExtractError::Validation(ValidationError::NotAPdf { .. })
        ));
    }
}
