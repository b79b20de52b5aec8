//! FILENAME: core/report-engine/src/finalize.rs
//! Finalization Step - turn a reshaped table into its presentation form.
//!
//! Order of operations in `finalize`:
//! 1. Reorder double headers while the outer level still holds order positions
//! 2. Decode outer header labels back to display labels
//! 3. Rename the inner header level with the stats names
//! 4. Fill missing results with zero
//! 5. Rename the row-index levels
//! 6. Prune header categories that no column uses

use std::cmp::Ordering;

use table_engine::{ColumnKind, LevelOrder, Table, Value};

use crate::error::{ReportError, Result};
use crate::labels::{build_value_to_label_map, LabelMap};
use crate::log_warn;
use crate::options::{NullFill, ReportOptions};
use crate::relabel::HeaderEncoding;
use crate::reshape::HeaderShape;

// ============================================================================
// ROW AXIS
// ============================================================================

/// Maps every label of one row-index level through `map`.
pub fn relabel_index(table: &Table, level: usize, map: &LabelMap) -> Result<Table> {
    let level_name = table
        .index()
        .and_then(|index| index.names().get(level))
        .cloned()
        .unwrap_or_default();
    table.try_map_index_level(level, |label| {
        map.get(label).cloned().ok_or_else(|| ReportError::UnknownLabel {
            column: level_name.clone(),
            value: label.clone(),
        })
    })
}

/// Display names for the value fields, positionally.
pub fn stats_label_map(value_fields: &[&str], stats_names: &[String]) -> Result<LabelMap> {
    if value_fields.len() != stats_names.len() {
        return Err(ReportError::LengthMismatch {
            what: "stats names".to_string(),
            expected: value_fields.len(),
            found: stats_names.len(),
        });
    }
    build_value_to_label_map(value_fields.iter().copied(), stats_names)
}

/// Sets display names on every row-index level.
pub fn name_index(table: &Table, names: &[String]) -> Result<Table> {
    let levels = table.index().map_or(0, |index| index.levels());
    if names.len() != levels {
        return Err(ReportError::LengthMismatch {
            what: "index names".to_string(),
            expected: levels,
            found: names.len(),
        });
    }
    Ok(table.set_index_names(names)?)
}

// ============================================================================
// COLUMN AXIS
// ============================================================================

/// Sorts two-level headers by (outer position, inner position).
///
/// Outer labels sort by order position when the pivot column was ordered,
/// otherwise by the declared header categories, otherwise by value. Inner
/// labels follow `inner_order`; unlisted inner labels go last.
pub fn reorder_double_header(table: &Table, encoding: &HeaderEncoding, inner_order: &[Value]) -> Result<Table> {
    let outer_order = match table.header_categories() {
        Some(categories) if !encoding.is_ordered() => LevelOrder::for_kind(&ColumnKind::Categorical {
            domain: categories.to_vec(),
        }),
        _ => LevelOrder::for_kind(&ColumnKind::Label),
    };
    let inner_rank = |label: Option<&Value>| -> usize {
        label
            .and_then(|l| inner_order.iter().position(|v| v == l))
            .unwrap_or(inner_order.len())
    };

    let keys = table.column_keys();
    let mut permutation: Vec<usize> = (0..keys.len()).collect();
    permutation.sort_by(|&a, &b| {
        let outer = match (keys[a].first(), keys[b].first()) {
            (Some(x), Some(y)) => outer_order.compare(x, y),
            _ => Ordering::Equal,
        };
        outer.then_with(|| inner_rank(keys[a].get(1)).cmp(&inner_rank(keys[b].get(1))))
    });
    Ok(table.reorder_columns(&permutation)?)
}

/// Restores display labels on the outer header level.
pub fn decode_headers(table: &Table, encoding: &HeaderEncoding) -> Table {
    if encoding.is_ordered() {
        table.relabel_header_level(0, |code| encoding.decode(code))
    } else {
        table.clone()
    }
}

/// Replaces missing results with zero in the selected columns.
pub fn fill_nulls(table: &Table, fill: &NullFill) -> Table {
    let zero = Value::Int(0);
    match fill {
        NullFill::None => table.clone(),
        NullFill::All => table.fill_null_where(|_| true, &zero),
        NullFill::Columns(labels) => {
            let keys = table.column_keys();
            for label in labels {
                if !keys.iter().any(|key| key.contains(label)) {
                    log_warn!("FINALIZE", "null fill label {} matches no column", label);
                }
            }
            table.fill_null_where(|column| column.key().iter().any(|level| labels.contains(level)), &zero)
        }
    }
}

// ============================================================================
// COMPOSITION
// ============================================================================

/// Applies the column-axis finalization and index naming to a reshaped table.
pub fn finalize(
    table: &Table,
    encoding: &HeaderEncoding,
    shape: HeaderShape,
    value_fields: &[&str],
    options: &ReportOptions,
) -> Result<Table> {
    let mut result = table.clone();
    if shape == HeaderShape::Double {
        let inner: Vec<Value> = value_fields.iter().map(|f| Value::text(*f)).collect();
        result = reorder_double_header(&result, encoding, &inner)?;
    }

    result = decode_headers(&result, encoding);

    if shape == HeaderShape::Double {
        if let Some(stats_names) = &options.stats_names {
            let names = stats_label_map(value_fields, stats_names)?;
            result = result.relabel_header_level(1, |field| names.get(field).cloned().unwrap_or_else(|| field.clone()));
        }
    }

    result = fill_nulls(&result, &options.null_to_zero);

    if let Some(names) = &options.index_names {
        result = name_index(&result, names)?;
    }

    Ok(result.prune_unused_header_categories())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::build_order_index;
    use crate::relabel::apply_column_relabel_and_order;
    use table_engine::{Column, Key};

    fn key(outer: impl Into<Value>, inner: &str) -> Key {
        Key::from_vec(vec![outer.into(), Value::text(inner)])
    }

    fn double(keys: Vec<Key>) -> Table {
        let columns = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| Column::from_key(k, ColumnKind::Numeric, vec![Value::from(i)]))
            .collect();
        Table::new(columns).unwrap()
    }

    fn ordered_encoding() -> HeaderEncoding {
        let order = build_order_index(["2021", "2019", "2020"]).unwrap();
        let table = Table::new(vec![Column::label("year", ["2019", "2020", "2021"])]).unwrap();
        apply_column_relabel_and_order(&table, "year", None, Some(&order)).unwrap().1
    }

    #[test]
    fn test_double_header_sorts_by_carried_positions() {
        let table = double(vec![key(1, "mean"), key(0, "mean"), key(1, "count"), key(0, "count")]);
        let inner = [Value::text("count"), Value::text("mean")];
        let sorted = reorder_double_header(&table, &ordered_encoding(), &inner).unwrap();
        assert_eq!(
            sorted.column_keys(),
            vec![key(0, "count"), key(0, "mean"), key(1, "count"), key(1, "mean")]
        );
        let decoded = decode_headers(&sorted, &ordered_encoding());
        assert_eq!(decoded.column_keys()[0], key("2021", "count"));
        assert_eq!(decoded.column_keys()[2], key("2019", "count"));
    }

    #[test]
    fn test_double_header_follows_declared_categories() {
        let table = double(vec![key("b", "x"), key("a", "x")]).with_header_categories(Some(vec!["b".into(), "a".into()]));
        let sorted = reorder_double_header(&table, &HeaderEncoding::raw("k"), &[]).unwrap();
        assert_eq!(sorted.column_keys(), vec![key("b", "x"), key("a", "x")]);
    }

    #[test]
    fn test_double_header_numeric_positions_beat_text_order() {
        // Text order would put 10 before 2
        let keys: Vec<Key> = (0..11i64).rev().map(|i| key(i, "n")).collect();
        let sorted = reorder_double_header(&double(keys), &ordered_encoding(), &[]).unwrap();
        let outer: Vec<Value> = sorted.column_keys().iter().map(|k| k[0].clone()).collect();
        assert_eq!(outer, (0..11i64).map(Value::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_null_fill_is_idempotent() {
        let table = Table::new(vec![
            Column::numeric("FY19", [Value::Null, Value::Int(2)]),
            Column::numeric("FY20", [Value::Null, Value::Null]),
        ])
        .unwrap();
        let fill = NullFill::Columns(vec![Value::text("FY19")]);
        let once = fill_nulls(&table, &fill);
        assert_eq!(once.get(0, "FY19"), Some(&Value::Int(0)));
        assert!(once.get(0, "FY20").unwrap().is_null());
        assert_eq!(fill_nulls(&once, &fill), once);

        let all = fill_nulls(&table, &NullFill::All);
        assert_eq!(fill_nulls(&all, &NullFill::All), all);
        assert_eq!(all.get(1, "FY20"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_null_fill_label_matches_any_header_level() {
        let table = Table::new(vec![Column::from_key(key("FY19", "mean"), ColumnKind::Numeric, vec![Value::Null])]).unwrap();
        let filled = fill_nulls(&table, &NullFill::Columns(vec![Value::text("mean")]));
        assert_eq!(filled.columns()[0].values(), &[Value::Int(0)]);
    }

    #[test]
    fn test_relabel_index_unknown_label() {
        let table = Table::new(vec![Column::label("site", ["n", "s"]), Column::numeric("v", [1, 2])])
            .unwrap()
            .set_index(&["site"])
            .unwrap();
        let map = build_value_to_label_map(["n"], ["North"]).unwrap();
        let err = relabel_index(&table, 0, &map).unwrap_err();
        assert_eq!(
            err,
            ReportError::UnknownLabel {
                column: "site".to_string(),
                value: Value::text("s"),
            }
        );
    }

    #[test]
    fn test_index_names_must_cover_every_level() {
        let table = Table::new(vec![Column::label("site", ["n"]), Column::numeric("v", [1])])
            .unwrap()
            .set_index(&["site"])
            .unwrap();
        let err = name_index(&table, &["a".to_string(), "b".to_string()]).unwrap_err();
        assert!(matches!(err, ReportError::LengthMismatch { expected: 1, found: 2, .. }));
        let named = name_index(&table, &["Site".to_string()]).unwrap();
        assert_eq!(named.index().unwrap().names(), &["Site".to_string()]);
    }

    #[test]
    fn test_stats_names_length_checked() {
        let err = stats_label_map(&["count", "mean"], &["n".to_string()]).unwrap_err();
        assert!(matches!(err, ReportError::LengthMismatch { expected: 2, found: 1, .. }));
    }
}
