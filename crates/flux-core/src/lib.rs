//! flux-core: Core library for converting annotated CSV query results
//!
//! This library provides functionality to:
//! - Split an annotated CSV stream into its logical tables
//! - Resolve per-column metadata from `#datatype` annotations
//! - Convert raw cells into typed values, applying `#default` annotations
//! - Encode the parsed tables as JSON

pub mod builder;
pub mod error;
pub mod parser;
pub mod table;

pub use builder::{convert_value, parse_datatype, TableState};
pub use error::{ConversionError, Error, Result};
pub use parser::{parse_file, parse_reader, parse_str, split_line, ParseOptions};
pub use table::{Column, ColumnType, Record, Table, TableSet, Value};
