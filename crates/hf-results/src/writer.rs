//! CSV and JSON serialization of result tables.

use std::fmt::Write as _;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{ResultsError, ResultsResult};
use crate::table::Table;

/// Supported output encodings, chosen by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Pick the output format from the output path suffix.
pub fn format_for_path(path: impl AsRef<Path>) -> ResultsResult<OutputFormat> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(OutputFormat::Csv),
        Some("json") => Ok(OutputFormat::Json),
        _ => Err(ResultsError::UnsupportedSuffix {
            path: path.display().to_string(),
        }),
    }
}

/// Render a table as CSV text.
pub fn to_csv(table: &Table) -> String {
    let labeled = table.rows.iter().any(|r| r.name.is_some());
    let mut out = String::new();

    if labeled {
        out.push_str("name,");
    }
    out.push_str(&table.columns.join(","));
    out.push('\n');

    for row in &table.rows {
        if let Some(name) = &row.name {
            let _ = write!(out, "{name},");
        } else if labeled {
            out.push(',');
        }
        for (i, value) in row.values.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{value}");
        }
        out.push('\n');
    }
    out
}

/// Render a table as JSON: an array of one object per row, keyed by the
/// column names.
pub fn to_json(table: &Table) -> ResultsResult<String> {
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            if let Some(name) = &row.name {
                object.insert("name".to_string(), json!(name));
            }
            for (column, value) in table.columns.iter().zip(&row.values) {
                object.insert(column.clone(), json!(value));
            }
            Value::Object(object)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&Value::Array(rows))?)
}
