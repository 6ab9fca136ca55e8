//! Core table types for representing annotated CSV results

use crate::error::Result;
use serde::ser::{Error as _, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// A single data record, keyed by column name
pub type Record = BTreeMap<String, Value>;

/// A parsed table: resolved column metadata plus typed data rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    /// Column definitions, in header order
    pub columns: Vec<Column>,
    /// Typed data rows
    pub data: Vec<Record>,
}

impl Table {
    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.data.len()
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name, from the header row
    pub name: String,
    /// Resolved datatype
    #[serde(rename = "type")]
    pub data_type: ColumnType,
    /// Format qualifier, only meaningful for datetime columns
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Column index (0-based, header position)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, data_type: ColumnType, format: String, index: usize) -> Self {
        Self {
            name,
            data_type,
            format,
            index,
        }
    }
}

/// The datatype of a column, as declared by the `#datatype` annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Long,
    UnsignedLong,
    Double,
    Boolean,
    DateTime,
    /// Any other declared type (duration, tag, field, ...). Values pass
    /// through as text and the name is kept verbatim.
    Other(String),
}

impl ColumnType {
    /// Resolve a datatype base name. `dateTime`/`time` are handled by the
    /// caller since they also carry a format suffix.
    pub fn from_name(name: &str) -> Self {
        match name {
            "string" => ColumnType::String,
            "long" => ColumnType::Long,
            "unsignedLong" => ColumnType::UnsignedLong,
            "double" => ColumnType::Double,
            "boolean" => ColumnType::Boolean,
            other => ColumnType::Other(other.to_string()),
        }
    }

    /// The name written to the `type` field of the output
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Long => "long",
            ColumnType::UnsignedLong => "unsignedLong",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::DateTime => "datetime",
            ColumnType::Other(name) => name,
        }
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Empty cell
    Null,
    String(String),
    Long(i64),
    UnsignedLong(u64),
    Double(f64),
    Boolean(bool),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::Long(v) => serializer.serialize_i64(*v),
            Value::UnsignedLong(v) => serializer.serialize_u64(*v),
            // JSON has no encoding for NaN or infinities
            Value::Double(v) if !v.is_finite() => {
                Err(S::Error::custom(format!("unsupported value: {}", v)))
            }
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}

/// The output document: every table parsed from one input
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableSet {
    pub tables: Vec<Table>,
}

impl TableSet {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Write the document as 2-space indented JSON followed by a newline.
    ///
    /// The whole document is encoded before anything is written, so an
    /// encoding failure leaves the writer untouched.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut buf = serde_json::to_vec_pretty(self)?;
        buf.push(b'\n');
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }
}
