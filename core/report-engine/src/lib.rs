//! FILENAME: core/report-engine/src/lib.rs
//! Report table generation.
//!
//! Turns raw observations into presentation-ready tables: a grouped
//! aggregation followed by a reshape with caller-controlled header and
//! row labels, order, null handling and percent normalization.
//!
//! Layers:
//! - `labels`: order indices and relabel maps
//! - `ordering`: deterministic row order from order lists
//! - `aggregate`: sparse/dense grouping and percent normalization
//! - `relabel`: working encoding of the pivot column
//! - `reshape`: melt + pivot into single or double headers
//! - `finalize`: header decoding, null fill, naming, pruning
//! - `recipes`: the public entry points

pub mod aggregate;
pub mod error;
pub mod finalize;
pub mod labels;
pub mod logging;
pub mod options;
pub mod ordering;
pub mod recipes;
pub mod relabel;
pub mod reshape;


pub use aggregate::{aggregate, normalize_within_groups, AggregationMode};
pub use error::{ReportError, Result};
pub use finalize::finalize;
pub use labels::{build_order_index, build_value_to_label_map, LabelMap, OrderIndex};
pub use options::{NullFill, ReportOptions};
pub use ordering::{missing_order_keys, reorder, reorder_index};
pub use recipes::{
    col_pivot_double_header_combined_results, col_pivot_double_header_results,
    col_pivot_multi_index_results, col_pivot_row_index_combined_results,
    col_pivot_row_index_results, simple_groupby,
};
pub use relabel::{apply_column_relabel_and_order, HeaderEncoding};
pub use reshape::{melt_and_pivot, HeaderShape, VALUE_COLUMN, VARIABLE_COLUMN};

pub use table_engine::{
    AggregationDefinition, AggregationSpec, AggregationType, Column, ColumnKind, Key, Table, TableError, Value,
};
