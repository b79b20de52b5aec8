//! FILENAME: core/report-engine/src/error.rs

use table_engine::{TableError, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// A relabel or order mapping has no entry for a value present in the data.
    #[error("Unknown label in '{column}': no mapping entry for {value}")]
    UnknownLabel { column: String, value: Value },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Duplicate label: {label}")]
    DuplicateLabel { label: Value },

    /// The grouping/pivot fields do not uniquely partition the data.
    #[error("Duplicate key: {0}")]
    DuplicateKey(TableError),

    #[error("Ambiguous reverse mapping: {label} is the image of both {first} and {second}")]
    AmbiguousReverseMapping {
        label: Value,
        first: Value,
        second: Value,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Table(TableError),
}

impl From<TableError> for ReportError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::DuplicateKey { .. } => ReportError::DuplicateKey(err),
            other => ReportError::Table(other),
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::InvalidOptions(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
