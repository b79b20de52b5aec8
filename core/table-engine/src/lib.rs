//! FILENAME: core/table-engine/src/lib.rs
//! PURPOSE: In-memory table model used by the report engine.
//! CONTEXT: Provides exactly the primitives report building relies on:
//! grouping with pluggable aggregations, unpivot, pivot, stable sorting,
//! null filling, renaming, categorical coercion and header-category pruning.
//! Every operation returns a new Table.

pub mod error;
pub mod groupby;
pub mod reshape;
pub mod table;
pub mod value;

// Re-export commonly used types at the crate root
pub use error::{Result, TableError};
pub use groupby::{
    AggregationDefinition, AggregationSpec, AggregationType, Aggregator, GroupBy, NamedAggregation,
};
pub use table::{compare_keys, Column, ColumnKind, LevelOrder, RowIndex, Table};
pub use value::{key_to_string, Key, Value};
