//! FILENAME: core/report-engine/src/ordering.rs
//! Ordering Engine - deterministic row order from caller-supplied order lists.
//!
//! A sort key column is attached for each ordered column (its position in
//! the order list, null when the value is not listed), the table is stably
//! sorted by those keys, and the keys are projected away again. Column
//! metadata is never touched. Unlisted values sort after every listed value
//! and keep their relative order.

use rustc_hash::{FxHashMap, FxHashSet};
use table_engine::{Column, ColumnKind, Table, TableError, Value};

use crate::error::{ReportError, Result};
use crate::labels::OrderIndex;
use crate::log_warn;

const ORDER_KEY_PREFIX: &str = "__order_key_";

/// Distinct non-null values without an entry in `order`, in first-seen order.
pub fn missing_order_keys(values: &[Value], order: &OrderIndex) -> Vec<Value> {
    let mut seen = FxHashSet::default();
    values
        .iter()
        .filter(|v| !v.is_null() && !order.contains(v))
        .filter(|v| seen.insert(*v))
        .cloned()
        .collect()
}

/// Sort key values: the order position of each value, null when unlisted.
fn order_keys(what: &str, values: &[Value], order: &OrderIndex) -> Vec<Value> {
    let missing = missing_order_keys(values, order);
    if !missing.is_empty() {
        log_warn!(
            "ORDER",
            "{}: {} value(s) missing from order list sort last: {:?}",
            what,
            missing.len(),
            missing.iter().map(|v| v.to_string()).collect::<Vec<_>>()
        );
    }
    values
        .iter()
        .map(|v| order.position(v).map_or(Value::Null, Value::from))
        .collect()
}

/// Rank of each value by first appearance.
fn appearance_keys(values: &[Value]) -> Vec<Value> {
    let mut ranks: FxHashMap<&Value, usize> = FxHashMap::default();
    values
        .iter()
        .map(|v| {
            let next = ranks.len();
            Value::from(*ranks.entry(v).or_insert(next))
        })
        .collect()
}

/// Sorts rows by one column (or lexicographically by two) according to
/// the matching order lists.
pub fn reorder(table: &Table, by_columns: &[&str], order_lists: &[&OrderIndex]) -> Result<Table> {
    if by_columns.len() != order_lists.len() {
        return Err(ReportError::LengthMismatch {
            what: "ordering columns and order lists".to_string(),
            expected: by_columns.len(),
            found: order_lists.len(),
        });
    }

    let mut keyed = table.clone();
    let mut key_names = Vec::with_capacity(by_columns.len());
    for (n, (column, order)) in by_columns.iter().zip(order_lists).enumerate() {
        let values = table.column(column)?.values();
        let name = format!("{}{}", ORDER_KEY_PREFIX, n);
        keyed = keyed.with_column(Column::new(name.clone(), ColumnKind::Numeric, order_keys(column, values, order)))?;
        key_names.push(name);
    }

    let key_refs: Vec<&str> = key_names.iter().map(String::as_str).collect();
    Ok(keyed.sort_by(&key_refs)?.drop_columns(&key_refs)?)
}

/// Sorts rows by their row-index labels.
///
/// `orders[level]` orders that level; a `None` level (or one past the end of
/// `orders`) keeps its labels in first-appearance order, so existing groups
/// stay together.
pub fn reorder_index(table: &Table, orders: &[Option<&OrderIndex>]) -> Result<Table> {
    let index = table.index().ok_or(TableError::NoIndex)?;
    if orders.len() > index.levels() {
        return Err(ReportError::LengthMismatch {
            what: "row order lists".to_string(),
            expected: index.levels(),
            found: orders.len(),
        });
    }

    let mut keys = Vec::with_capacity(index.levels());
    for level in 0..index.levels() {
        let labels = index.level_values(level);
        let what = index.names()[level].as_str();
        let values = match orders.get(level).copied().flatten() {
            Some(order) => order_keys(what, &labels, order),
            None => appearance_keys(&labels),
        };
        keys.push(Column::new(format!("{}{}", ORDER_KEY_PREFIX, level), ColumnKind::Numeric, values));
    }

    let names: Vec<String> = keys.iter().map(|c| c.name()).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let rows = Table::new(keys)?.sort_permutation(&name_refs)?;
    Ok(table.take_rows(&rows))
}
