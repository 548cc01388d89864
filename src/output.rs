//! Data model: the pending file, the backend reply and the normalised result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One table row: column name → cell value, in the order the backend sent them.
pub type RowRecord = Map<String, Value>;

/// A PDF accepted by file intake and waiting to be submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

impl fmt::Debug for PendingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// The four statement groupings returned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    ProfitAndLoss,
    BalanceSheet,
    CashFlow,
    Others,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 4] = [
        Category::ProfitAndLoss,
        Category::BalanceSheet,
        Category::CashFlow,
        Category::Others,
    ];

    /// Field name inside `financialData`.
    pub fn wire_key(self) -> &'static str {
        match self {
            Category::ProfitAndLoss => "pnl",
            Category::BalanceSheet => "balanceSheet",
            Category::CashFlow => "cashFlow",
            Category::Others => "others",
        }
    }

    /// Human-readable heading.
    pub fn label(self) -> &'static str {
        match self {
            Category::ProfitAndLoss => "Profit & Loss",
            Category::BalanceSheet => "Balance Sheet",
            Category::CashFlow => "Cash Flow",
            Category::Others => "Other Statements",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base64 text of the generated workbook, decoded only on export.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportPayload(String);

impl ExportPayload {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ExportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportPayload({} base64 chars)", self.0.len())
    }
}

/// Normalised output of one successful extraction request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub pnl: Vec<RowRecord>,
    pub balance_sheet: Vec<RowRecord>,
    pub cash_flow: Vec<RowRecord>,
    pub others: Vec<RowRecord>,
    /// Omitted from JSON output; the workbook is written by the exporter.
    #[serde(skip)]
    pub export: Option<ExportPayload>,
}

impl ExtractionResult {
    pub fn rows(&self, category: Category) -> &[RowRecord] {
        match category {
            Category::ProfitAndLoss => &self.pnl,
            Category::BalanceSheet => &self.balance_sheet,
            Category::CashFlow => &self.cash_flow,
            Category::Others => &self.others,
        }
    }

    pub fn total_rows(&self) -> usize {
        Category::ALL.iter().map(|c| self.rows(*c).len()).sum()
    }

    /// Categories that have at least one row, in display order.
    pub fn non_empty_categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(|c| !self.rows(*c).is_empty())
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

/// Body of `POST /api/upload` as sent by the backend.
///
/// Every field is optional here so a malformed reply deserialises and is
/// rejected with a precise reason instead of a serde error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub financial_data: Option<Value>,
    #[serde(default)]
    pub excel_buffer: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
