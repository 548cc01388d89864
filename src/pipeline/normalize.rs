//! Reshape category payloads into flat row sequences.
//!
//! The backend sends each category in one of two shapes:
//!
//! ```text
//! flat:     [ {year: "2023", revenue: "100"}, … ]
//! wrapped:  [ {table_number: 1, headers: […], rows: [ {…}, {…} ]}, … ]
//! ```
//!
//! The shape is tagged by the first element: if it carries a `rows` array
//! the whole sequence is treated as wrappers and flattened in order.
//! Anything that is neither shape is rejected so a garbled table is never
//! rendered.

use crate::error::FinExtractError;
use crate::output::{Category, ExportPayload, ExtractionResult, RowRecord, UploadResponse};
use serde_json::Value;
use tracing::debug;

const ROWS_FIELD: &str = "rows";

/// Flatten one category payload.
///
/// `None` and `null` mean the category is absent and yield an empty table.
pub fn normalize(raw: Option<&Value>) -> Result<Vec<RowRecord>, FinExtractError> {
    let items = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(shape_error(format!(
                "expected an array of rows, got {}",
                json_kind(other)
            )))
        }
    };

    if is_wrapped(items) {
        flatten_wrapped(items)
    } else {
        items.iter().enumerate().map(|(i, v)| as_row(v, i)).collect()
    }
}

/// Validate a decoded upload reply and normalise every category.
pub fn into_result(response: UploadResponse) -> Result<ExtractionResult, FinExtractError> {
    if response.success != Some(true) {
        return Err(FinExtractError::Rejected {
            message: response.message,
        });
    }

    let data = match response.financial_data {
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(shape_error(format!(
                "financialData must be an object, got {}",
                json_kind(&other)
            )))
        }
        None => return Err(shape_error("financialData is missing".into())),
    };

    let export = match response.excel_buffer {
        Some(Value::String(s)) if !s.trim().is_empty() => ExportPayload::new(s),
        Some(Value::String(_)) => return Err(shape_error("excelBuffer is empty".into())),
        Some(Value::Null) | None => return Err(shape_error("excelBuffer is missing".into())),
        Some(other) => {
            return Err(shape_error(format!(
                "excelBuffer must be a base64 string, got {}",
                json_kind(&other)
            )))
        }
    };

    let category = |c: Category| {
        normalize(data.get(c.wire_key())).map_err(|e| match e {
            FinExtractError::ResponseShape { detail } => {
                shape_error(format!("{}: {}", c.wire_key(), detail))
            }
            other => other,
        })
    };

    let result = ExtractionResult {
        pnl: category(Category::ProfitAndLoss)?,
        balance_sheet: category(Category::BalanceSheet)?,
        cash_flow: category(Category::CashFlow)?,
        others: category(Category::Others)?,
        export: Some(export),
    };
    debug!(
        "Normalised result: pnl={} balanceSheet={} cashFlow={} others={}",
        result.pnl.len(),
        result.balance_sheet.len(),
        result.cash_flow.len(),
        result.others.len()
    );
    Ok(result)
}

fn is_wrapped(items: &[Value]) -> bool {
    items
        .first()
        .and_then(|first| first.get(ROWS_FIELD))
        .is_some_and(Value::is_array)
}

fn flatten_wrapped(wrappers: &[Value]) -> Result<Vec<RowRecord>, FinExtractError> {
    let mut out = Vec::new();
    for (w, wrapper) in wrappers.iter().enumerate() {
        let Value::Object(obj) = wrapper else {
            return Err(shape_error(format!(
                "table {w} is {}, expected an object",
                json_kind(wrapper)
            )));
        };
        match obj.get(ROWS_FIELD) {
            Some(Value::Null) => {}
            None => return Err(shape_error(format!("table {w} has no rows field"))),
            Some(Value::Array(rows)) => {
                for (i, v) in rows.iter().enumerate() {
                    out.push(as_row(v, i).map_err(|e| match e {
                        FinExtractError::ResponseShape { detail } => {
                            shape_error(format!("table {w}: {detail}"))
                        }
                        other => other,
                    })?);
                }
            }
            Some(other) => {
                return Err(shape_error(format!(
                    "table {w} rows is {}, expected an array",
                    json_kind(other)
                )))
            }
        }
    }
    Ok(out)
}

fn as_row(value: &Value, index: usize) -> Result<RowRecord, FinExtractError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        other => Err(shape_error(format!(
            "row {index} is {}, expected an object",
            json_kind(other)
        ))),
    }
}

fn shape_error(detail: String) -> FinExtractError {
    FinExtractError::ResponseShape { detail }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
