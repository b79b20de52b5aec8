//! FILENAME: core/report-engine/src/recipes.rs
//! The six report recipes.
//!
//! Every pivoting recipe runs the same pipeline:
//! relabel/order the pivot column -> aggregate -> (percent) -> melt and
//! pivot -> relabel and order rows -> finalize headers.
//! They differ only in grouping keys, density and layout.

use rustc_hash::{FxHashMap, FxHashSet};
use table_engine::{AggregationSpec, Table, Value};

use crate::aggregate::{aggregate, normalize_within_groups, AggregationMode};
use crate::error::{ReportError, Result};
use crate::finalize::{fill_nulls, finalize, name_index, relabel_index, stats_label_map};
use crate::labels::OrderIndex;
use crate::options::ReportOptions;
use crate::ordering::reorder_index;
use crate::relabel::{apply_column_relabel_and_order, HeaderEncoding};
use crate::reshape::{melt_and_pivot, HeaderShape, VARIABLE_COLUMN};
use crate::{log_enter, log_exit};

// ============================================================================
// SHARED STEPS
// ============================================================================

/// Shape of a pivoting recipe's output.
#[derive(Debug, Clone, Copy)]
struct PivotLayout<'a> {
    pivot_col: &'a str,
    /// Second grouping key; it becomes the outer (or only) row level.
    row_col: Option<&'a str>,
    value_fields: &'a [&'a str],
    shape: HeaderShape,
    dense: bool,
}

impl<'a> PivotLayout<'a> {
    fn group_cols(&self) -> Vec<&'a str> {
        let mut cols = vec![self.pivot_col];
        cols.extend(self.row_col);
        cols
    }

    fn row_fields(&self) -> Vec<&'a str> {
        match (self.row_col, self.shape) {
            (None, _) => vec![VARIABLE_COLUMN],
            (Some(row_col), HeaderShape::Single) => vec![row_col, VARIABLE_COLUMN],
            (Some(row_col), HeaderShape::Double) => vec![row_col],
        }
    }

    /// Index levels of the aggregated table that partition percent shares.
    fn percent_partition(&self) -> Vec<usize> {
        if self.row_col.is_some() {
            vec![1]
        } else {
            Vec::new()
        }
    }
}

/// Working-column values a dense recipe must report: the caller's domain,
/// else the encoding's full domain, else every value present.
fn dense_domain(working: &Table, pivot_col: &str, encoding: &HeaderEncoding, options: &ReportOptions) -> Result<Vec<Value>> {
    if let Some(raw) = &options.column_domain {
        let mut domain = Vec::with_capacity(raw.len());
        for value in raw.iter().filter(|v| !v.is_null()) {
            domain.push(encoding.encode(value)?);
        }
        return Ok(domain);
    }
    if let Some(domain) = encoding.working_domain() {
        return Ok(domain);
    }
    let mut seen = FxHashSet::default();
    let mut present: Vec<Value> = working
        .column(pivot_col)?
        .values()
        .iter()
        .filter(|v| !v.is_null() && seen.insert(*v))
        .cloned()
        .collect();
    present.sort_by(|a, b| a.compare(b));
    Ok(present)
}

/// Relabels every row-index level, then orders rows by the order lists.
///
/// `value_level` is the level holding value-field names, which the stats
/// names rename before any index relabel map applies.
fn arrange_rows(table: Table, value_level: Option<usize>, value_fields: &[&str], options: &ReportOptions) -> Result<Table> {
    let levels = table.index().map_or(0, |index| index.levels());
    let mut result = table;
    for level in 0..levels {
        if value_level == Some(level) {
            if let Some(stats_names) = &options.stats_names {
                result = relabel_index(&result, level, &stats_label_map(value_fields, stats_names)?)?;
            }
        }
        if let Some(map) = options.index_relabel_map(level) {
            result = relabel_index(&result, level, map)?;
        }
    }

    if options.reorder_rows {
        let orders: Vec<Option<&OrderIndex>> = (0..levels).map(|level| options.index_order_list(level)).collect();
        if orders.iter().any(Option::is_some) {
            result = reorder_index(&result, &orders)?;
        }
    }
    Ok(result)
}

fn run_pivot_recipe(
    recipe: &str,
    table: &Table,
    layout: PivotLayout<'_>,
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    log_enter!(
        "RECIPE",
        recipe,
        "pivot={} row={:?} fields={:?}",
        layout.pivot_col,
        layout.row_col,
        layout.value_fields
    );

    let (working, encoding) = apply_column_relabel_and_order(
        table,
        layout.pivot_col,
        options.relabel_map.as_ref(),
        options.order_map.as_ref(),
    )?;

    let mode = if layout.dense {
        AggregationMode::Dense {
            domain: dense_domain(&working, layout.pivot_col, &encoding, options)?,
        }
    } else {
        AggregationMode::Sparse
    };
    let mut aggregated = aggregate(&working, &layout.group_cols(), agg, &mode)?;
    if options.percent_of_group {
        aggregated = normalize_within_groups(&aggregated, layout.value_fields, &layout.percent_partition())?;
    }

    let row_fields = layout.row_fields();
    let reshaped = melt_and_pivot(&aggregated, &row_fields, layout.pivot_col, layout.value_fields, layout.shape)?;
    let value_level = row_fields.iter().position(|field| *field == VARIABLE_COLUMN);
    let arranged = arrange_rows(reshaped, value_level, layout.value_fields, options)?;
    let result = finalize(&arranged, &encoding, layout.shape, layout.value_fields, options)?;

    log_exit!("RECIPE", recipe, "{}x{}", result.height(), result.width());
    Ok(result)
}

// ============================================================================
// RECIPES
// ============================================================================

/// Groups by one column. The group values form the row index; the
/// aggregation outputs are the columns, renamed by `stats_names`.
pub fn simple_groupby(table: &Table, group_col: &str, agg: &AggregationSpec, options: &ReportOptions) -> Result<Table> {
    log_enter!("RECIPE", "simple_groupby", "group={}", group_col);

    let mut result = aggregate(table, &[group_col], agg, &AggregationMode::Sparse)?;
    if options.percent_of_group {
        let outputs = agg.output_names();
        let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        result = normalize_within_groups(&result, &outputs, &[])?;
    }
    result = arrange_rows(result, None, &[], options)?;

    if let Some(stats_names) = &options.stats_names {
        if stats_names.len() != result.width() {
            return Err(ReportError::LengthMismatch {
                what: "stats names".to_string(),
                expected: result.width(),
                found: stats_names.len(),
            });
        }
        let renames: FxHashMap<String, String> = result
            .columns()
            .iter()
            .map(|c| c.name())
            .zip(stats_names.iter().cloned())
            .collect();
        result = result.rename_columns(&renames)?;
    }

    result = fill_nulls(&result, &options.null_to_zero);
    if let Some(names) = &options.index_names {
        result = name_index(&result, names)?;
    }

    log_exit!("RECIPE", "simple_groupby", "{}x{}", result.height(), result.width());
    Ok(result)
}

/// Pivot-column values become the headers; the value fields become a
/// single row index (named `variable` unless renamed).
pub fn col_pivot_row_index_results(
    table: &Table,
    pivot_col: &str,
    value_fields: &[&str],
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    let layout = PivotLayout {
        pivot_col,
        row_col: None,
        value_fields,
        shape: HeaderShape::Single,
        dense: false,
    };
    run_pivot_recipe("col_pivot_row_index_results", table, layout, agg, options)
}

/// As `col_pivot_row_index_results`, with one header per pivot-column
/// domain value even when no row carries it.
pub fn col_pivot_row_index_combined_results(
    table: &Table,
    pivot_col: &str,
    value_fields: &[&str],
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    let layout = PivotLayout {
        pivot_col,
        row_col: None,
        value_fields,
        shape: HeaderShape::Single,
        dense: true,
    };
    run_pivot_recipe("col_pivot_row_index_combined_results", table, layout, agg, options)
}

/// Two-level row index (row_col value, value field) under single headers.
pub fn col_pivot_multi_index_results(
    table: &Table,
    pivot_col: &str,
    row_col: &str,
    value_fields: &[&str],
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    let layout = PivotLayout {
        pivot_col,
        row_col: Some(row_col),
        value_fields,
        shape: HeaderShape::Single,
        dense: false,
    };
    run_pivot_recipe("col_pivot_multi_index_results", table, layout, agg, options)
}

/// Single row index (row_col value) under two-level headers
/// (pivot value, value field).
pub fn col_pivot_double_header_results(
    table: &Table,
    pivot_col: &str,
    row_col: &str,
    value_fields: &[&str],
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    let layout = PivotLayout {
        pivot_col,
        row_col: Some(row_col),
        value_fields,
        shape: HeaderShape::Double,
        dense: false,
    };
    run_pivot_recipe("col_pivot_double_header_results", table, layout, agg, options)
}

/// As `col_pivot_double_header_results`, dense over the pivot-column domain.
pub fn col_pivot_double_header_combined_results(
    table: &Table,
    pivot_col: &str,
    row_col: &str,
    value_fields: &[&str],
    agg: &AggregationSpec,
    options: &ReportOptions,
) -> Result<Table> {
    let layout = PivotLayout {
        pivot_col,
        row_col: Some(row_col),
        value_fields,
        shape: HeaderShape::Double,
        dense: true,
    };
    run_pivot_recipe("col_pivot_double_header_combined_results", table, layout, agg, options)
}
