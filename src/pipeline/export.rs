//! Export emitter: base64 payload → `Financial_Report_<ms>.xlsx`.
//!
//! The workbook is written to a temp file in the target directory and then
//! persisted without clobbering, so a reader never sees a half-written file
//! and two exports in the same millisecond do not overwrite each other.

use crate::error::FinExtractError;
use crate::output::ExportPayload;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// MIME type of the exported workbook.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Every `.xlsx` is a ZIP container.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Name attempts before giving up on a free file name.
const NAME_ATTEMPTS: u128 = 16;

/// Decode the payload byte-for-byte.
pub fn decode(payload: &ExportPayload) -> Result<Vec<u8>, FinExtractError> {
    STANDARD
        .decode(payload.as_base64().trim())
        .map_err(|e| FinExtractError::ExportDecode {
            detail: e.to_string(),
        })
}

/// `Financial_Report_<unix_ms>.xlsx`
pub fn report_file_name(unix_ms: u128) -> String {
    format!("Financial_Report_{unix_ms}.xlsx")
}

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Write the payload into `dir`, named after the current time.
///
/// Returns `Ok(None)` without touching the file system when there is no
/// payload.
pub fn export_payload(
    payload: Option<&ExportPayload>,
    dir: &Path,
) -> Result<Option<PathBuf>, FinExtractError> {
    export_payload_at(payload, dir, unix_millis())
}

/// [`export_payload`] with an explicit timestamp.
pub fn export_payload_at(
    payload: Option<&ExportPayload>,
    dir: &Path,
    unix_ms: u128,
) -> Result<Option<PathBuf>, FinExtractError> {
    let Some(payload) = payload.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let bytes = decode(payload)?;
    if !bytes.starts_with(ZIP_MAGIC) {
        warn!(
            "Export payload does not look like an xlsx workbook (first bytes: {:?})",
            &bytes[..bytes.len().min(4)]
        );
    }

    let write_err = |path: &Path, source: std::io::Error| FinExtractError::ExportWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| write_err(dir, e))?;
    tmp.write_all(&bytes).map_err(|e| write_err(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| write_err(tmp.path(), e))?;

    let mut last_path = dir.join(report_file_name(unix_ms));
    for offset in 0..NAME_ATTEMPTS {
        let path = dir.join(report_file_name(unix_ms + offset));
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                info!("Exported {} bytes to {}", bytes.len(), path.display());
                return Ok(Some(path));
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tmp = e.file;
                last_path = path;
            }
            Err(e) => return Err(write_err(&path, e.error)),
        }
    }

    Err(write_err(
        &last_path,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free report file name",
        ),
    ))
}
