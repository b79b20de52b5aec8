//! FILENAME: core/table-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Duplicate pivot entry at index [{index}], column [{column}]")]
    DuplicateKey { index: String, column: String },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Index has {levels} level(s), got {found} name(s)")]
    IndexLevelMismatch { levels: usize, found: usize },

    #[error("Table has no row index")]
    NoIndex,
}

pub type Result<T> = std::result::Result<T, TableError>;
