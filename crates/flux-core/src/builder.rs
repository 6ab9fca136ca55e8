//! Table builder: turns one accumulated table into typed columns and records

use crate::error::{ConversionError, Error, Result};
use crate::table::{Column, ColumnType, Record, Table, Value};
use std::collections::HashMap;
use tracing::debug;

/// Annotation carrying per-column datatypes
pub const DATATYPE_ANNOTATION: &str = "datatype";
/// Annotation carrying per-column default values
pub const DEFAULT_ANNOTATION: &str = "default";

/// Annotation rows, header and raw rows gathered for one table
#[derive(Debug, Clone, Default)]
pub struct TableState {
    /// Annotation name (without `#`) to per-column values
    pub annotations: HashMap<String, Vec<String>>,
    /// Column names from the header row
    pub headers: Vec<String>,
    /// Raw data rows
    pub rows: Vec<Vec<String>>,
    /// Whether the header row has been seen
    pub has_header: bool,
}

impl TableState {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an annotation row; a repeated name replaces the earlier values
    pub fn set_annotation(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.annotations.insert(name.into(), values);
    }

    /// Feed a header or data row. The first one becomes the header.
    ///
    /// Returns `true` if the row was stored as data.
    pub fn push_row(&mut self, cells: Vec<String>) -> bool {
        if self.has_header {
            self.rows.push(cells);
            true
        } else {
            self.headers = cells;
            self.has_header = true;
            false
        }
    }

    fn annotation(&self, name: &str) -> &[String] {
        self.annotations
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve column metadata from the header and `#datatype` row
    pub fn columns(&self) -> Vec<Column> {
        let datatypes = self.annotation(DATATYPE_ANNOTATION);

        self.headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let (data_type, format) = match datatypes.get(i) {
                    Some(dt) => parse_datatype(dt),
                    None => (ColumnType::String, String::new()),
                };
                Column::new(name.clone(), data_type, format, i)
            })
            .collect()
    }

    /// Build the finished table, consuming the accumulator.
    ///
    /// Any cell that fails to convert aborts the whole table.
    pub fn build(self) -> Result<Table> {
        let columns = self.columns();
        let defaults = self.annotation(DEFAULT_ANNOTATION);

        let mut data = Vec::with_capacity(self.rows.len());
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row.len() > columns.len() {
                debug!(
                    row = row_idx,
                    cells = row.len(),
                    columns = columns.len(),
                    "ignoring cells beyond the header"
                );
            }

            let mut record = Record::new();
            for col in &columns {
                let mut raw = row.get(col.index).map(String::as_str).unwrap_or("");
                if raw.is_empty() {
                    if let Some(default) = defaults.get(col.index) {
                        raw = default.as_str();
                    }
                }

                let value = convert_value(raw, &col.data_type).map_err(|source| {
                    Error::Conversion {
                        column: col.name.clone(),
                        value: raw.to_string(),
                        source,
                    }
                })?;
                record.insert(col.name.clone(), value);
            }
            data.push(record);
        }

        Ok(Table { columns, data })
    }
}

/// Split a datatype annotation into a column type and format qualifier.
///
/// ```text
/// "dateTime:RFC3339"     -> (DateTime, "rfc3339")
/// "dateTime:RFC3339Nano" -> (DateTime, "rfc3339nano")
/// "dateTime:number"      -> (DateTime, "number")
/// "dateTime"             -> (DateTime, "")
/// "double"               -> (Double, "")
/// ```
pub fn parse_datatype(datatype: &str) -> (ColumnType, String) {
    let (base, suffix) = datatype.split_once(':').unwrap_or((datatype, ""));
    match base {
        "dateTime" | "time" => (ColumnType::DateTime, suffix.to_lowercase()),
        other => (ColumnType::from_name(other), String::new()),
    }
}

/// Convert a raw cell into a typed value. Empty text is always null.
pub fn convert_value(raw: &str, data_type: &ColumnType) -> std::result::Result<Value, ConversionError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }

    match data_type {
        ColumnType::Boolean => parse_bool(raw).map(Value::Boolean),
        ColumnType::Long => Ok(Value::Long(raw.trim().parse::<i64>()?)),
        ColumnType::UnsignedLong => Ok(Value::UnsignedLong(parse_unsigned(raw.trim())?)),
        ColumnType::Double => parse_double(raw.trim()).map(Value::Double),
        // datetime values are kept exactly as written
        ColumnType::String | ColumnType::DateTime | ColumnType::Other(_) => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn parse_bool(raw: &str) -> std::result::Result<bool, ConversionError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(ConversionError::UnrecognizedBoolean),
    }
}

/// Digits only: unlike `u64::from_str`, a leading `+` is rejected.
fn parse_unsigned(text: &str) -> std::result::Result<u64, ConversionError> {
    if text.starts_with('+') {
        return Err(ConversionError::UnexpectedSign);
    }
    Ok(text.parse::<u64>()?)
}

fn parse_double(text: &str) -> std::result::Result<f64, ConversionError> {
    let v = text.parse::<f64>()?;
    if v.is_infinite() && !is_infinity_literal(text) {
        return Err(ConversionError::FloatOutOfRange);
    }
    Ok(v)
}

fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}
