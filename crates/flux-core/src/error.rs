//! Error types for flux-core

use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a conversion run
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open the input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be split into fields
    #[error("parsing line {line:?}: {source}")]
    Line {
        line: String,
        #[source]
        source: csv::Error,
    },

    /// A cell could not be coerced to its column type
    #[error("column {column:?} value {value:?}: {source}")]
    Conversion {
        column: String,
        value: String,
        #[source]
        source: ConversionError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a single raw cell failed to convert
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("unrecognized boolean value")]
    UnrecognizedBoolean,

    #[error("invalid integer: {0}")]
    Integer(#[from] ParseIntError),

    #[error("invalid float: {0}")]
    Float(#[from] ParseFloatError),

    #[error("unexpected sign in unsigned value")]
    UnexpectedSign,

    /// Finite text that overflows an f64
    #[error("value out of range")]
    FloatOutOfRange,
}
