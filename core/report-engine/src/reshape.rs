//! FILENAME: core/report-engine/src/reshape.rs
//! Reshape Step - melt the aggregated table and pivot it into report layout.

use table_engine::{Table, Value};

use crate::error::Result;
use crate::log_debug;

/// Name of the unpivoted field-name column (and default value-field level name).
pub const VARIABLE_COLUMN: &str = "variable";

/// Name of the unpivoted field-value column.
pub const VALUE_COLUMN: &str = "value";

/// Column header layout of the reshaped table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    /// One header level: the pivot column's values.
    Single,
    /// Two header levels: pivot value (outer), value field (inner).
    Double,
}

/// Unpivots `value_fields` of an aggregated table and pivots the result.
///
/// The row index of `table` is reset first so the grouping keys are
/// available as id columns. `row_fields` may name grouping keys and/or
/// `VARIABLE_COLUMN`. The field-name level sorts in `value_fields` order.
/// Fails with `DuplicateKey` if the fields do not uniquely address a cell.
pub fn melt_and_pivot(
    table: &Table,
    row_fields: &[&str],
    pivot_column: &str,
    value_fields: &[&str],
    shape: HeaderShape,
) -> Result<Table> {
    let flat = table.reset_index()?;
    let id_names: Vec<String> = flat
        .columns()
        .iter()
        .map(|c| c.name())
        .filter(|name| !value_fields.contains(&name.as_str()))
        .filter(|name| table.index().map_or(true, |idx| idx.names().contains(name)))
        .collect();
    let ids: Vec<&str> = id_names.iter().map(String::as_str).collect();

    let long = flat.unpivot(&ids, value_fields, VARIABLE_COLUMN, VALUE_COLUMN)?;
    let field_domain: Vec<Value> = value_fields.iter().map(|f| Value::text(*f)).collect();
    let long = long.as_categorical(VARIABLE_COLUMN, &field_domain)?;

    let header: Vec<&str> = match shape {
        HeaderShape::Single => vec![pivot_column],
        HeaderShape::Double => vec![pivot_column, VARIABLE_COLUMN],
    };
    let wide = long.pivot(row_fields, &header, VALUE_COLUMN)?;

    log_debug!(
        "RESHAPE",
        "{} rows x {} fields -> {}x{} ({:?})",
        table.height(),
        value_fields.len(),
        wide.height(),
        wide.width(),
        shape
    );
    Ok(wide)
}
