//! The stages a file passes through on its way to a result.
//!
//! Each submodule owns one step so the controller can sequence them and
//! tests can drive any of them alone.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ upload ──▶ normalize ──▶ export
//! (validate)  (HTTP)     (reshape)     (on demand)
//! ```
//!
//! 1. [`intake`]    — magic bytes, size and page-count checks; page counting
//!    runs in `spawn_blocking` because PDF parsing is CPU-bound
//! 2. [`upload`]    — multipart POST to the extraction service; the only
//!    stage with network I/O
//! 3. [`normalize`] — flatten wrapped tables and turn the reply into an
//!    [`ExtractionResult`](crate::output::ExtractionResult)
//! 4. [`export`]    — decode the base64 workbook and write it atomically

pub mod export;
pub mod intake;
pub mod normalize;
pub mod upload;
