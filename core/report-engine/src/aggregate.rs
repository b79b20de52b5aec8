//! FILENAME: core/report-engine/src/aggregate.rs
//! Aggregation Step - sparse and dense grouping, plus percent-of-group
//! normalization of the aggregated values.
//!
//! Dense grouping guarantees one output group per value of a fixed domain:
//! 1. Coerce the grouping column to a categorical over the domain
//! 2. Add a helper copy of the coerced column
//! 3. Group by (column, helper, other keys) enumerating unobserved categories
//! 4. Keep only the groups where column == helper, then drop the helper level

use rustc_hash::FxHashMap;
use table_engine::{AggregationSpec, Column, Key, Table, TableError, Value};

use crate::error::{ReportError, Result};
use crate::{log_debug, log_warn};

/// Name of the helper column used by dense grouping.
const DENSE_HELPER: &str = "__dense_key";

/// How groups missing from the data are treated.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationMode {
    /// Only groups present in the data are reported.
    Sparse,
    /// Every value of `domain` is reported for the first grouping column.
    /// Groups with no rows carry the operation's result over no values.
    Dense { domain: Vec<Value> },
}

/// Groups `table` by `group_cols` and applies `spec`.
///
/// The result has one index level per grouping column (named after it) and
/// one column per output name of the spec.
pub fn aggregate(table: &Table, group_cols: &[&str], spec: &AggregationSpec, mode: &AggregationMode) -> Result<Table> {
    match mode {
        AggregationMode::Sparse => Ok(table.group_by(group_cols)?.aggregate(spec)?),
        AggregationMode::Dense { domain } => aggregate_dense(table, group_cols, spec, domain),
    }
}

fn aggregate_dense(table: &Table, group_cols: &[&str], spec: &AggregationSpec, domain: &[Value]) -> Result<Table> {
    let (&column, rest) = group_cols
        .split_first()
        .ok_or_else(|| ReportError::InvalidOptions("dense aggregation needs a grouping column".to_string()))?;

    let coerced = table.as_categorical(column, domain)?;
    let source = coerced.column(column)?;

    let dropped = table
        .column(column)?
        .values()
        .iter()
        .zip(source.values())
        .filter(|(before, after)| !before.is_null() && after.is_null())
        .count();
    if dropped > 0 {
        log_warn!("AGG", "{}: {} row(s) outside the domain were dropped", column, dropped);
    }

    let helper = Column::new(DENSE_HELPER, source.kind().clone(), source.values().to_vec());
    let coerced = coerced.with_column(helper)?;

    let mut keys = vec![column, DENSE_HELPER];
    keys.extend_from_slice(rest);
    let grouped = coerced.group_by(&keys)?.observed(false).aggregate(spec)?;

    let index = grouped.index().ok_or(TableError::NoIndex)?;
    let matching: Vec<bool> = index.labels().iter().map(|label| label[0] == label[1]).collect();
    let dense = grouped.filter(&matching)?.drop_index_level(1)?;

    log_debug!("AGG", "dense {} over {} categories -> {} rows", column, domain.len(), dense.height());
    Ok(dense)
}

/// Divides every value column by its sum within each partition of rows.
///
/// Rows are partitioned by their labels at `partition_levels` of the row
/// index; an empty slice makes the whole column one partition. Nulls stay
/// null and a partition summing to zero yields zeros.
pub fn normalize_within_groups(table: &Table, value_cols: &[&str], partition_levels: &[usize]) -> Result<Table> {
    let partitions: Vec<Key> = match table.index() {
        Some(index) => {
            if let Some(&bad) = partition_levels.iter().find(|&&level| level >= index.levels()) {
                return Err(TableError::IndexLevelMismatch {
                    levels: index.levels(),
                    found: bad + 1,
                }
                .into());
            }
            index
                .labels()
                .iter()
                .map(|label| partition_levels.iter().map(|&level| label[level].clone()).collect())
                .collect()
        }
        None if partition_levels.is_empty() => vec![Key::new(); table.height()],
        None => return Err(TableError::NoIndex.into()),
    };

    let mut result = table.clone();
    for name in value_cols {
        let column = table.column(name)?;
        let mut totals: FxHashMap<&Key, f64> = FxHashMap::default();
        for (partition, value) in partitions.iter().zip(column.values()) {
            *totals.entry(partition).or_insert(0.0) += value.as_f64().unwrap_or(0.0);
        }
        let shares = partitions
            .iter()
            .zip(column.values())
            .map(|(partition, value)| match value.as_f64() {
                Some(n) => {
                    let total = totals.get(partition).copied().unwrap_or(0.0);
                    Value::Float(if total == 0.0 { 0.0 } else { n / total })
                }
                None => value.clone(),
            })
            .collect();
        result = result.with_column(column.with_values(shares))?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_engine::AggregationType;

    fn visits() -> Table {
        Table::new(vec![
            Column::label("site", ["A", "C", "A", "C", "A", "C", "A", "A", "C", "A"]),
            Column::label("year", [2019, 2019, 2020, 2020, 2019, 2020, 2020, 2019, 2019, 2020]),
            Column::numeric("patients", [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
        ])
        .unwrap()
    }

    fn counts() -> AggregationSpec {
        AggregationSpec::new().with("patients", AggregationType::Count)
    }

    #[test]
    fn test_sparse_reports_only_present_groups() {
        let result = aggregate(&visits(), &["site"], &counts(), &AggregationMode::Sparse).unwrap();
        assert_eq!(result.height(), 2);
    }

    #[test]
    fn test_dense_reports_every_domain_value() {
        let mode = AggregationMode::Dense {
            domain: vec!["A".into(), "B".into(), "C".into()],
        };
        let result = aggregate(&visits(), &["site"], &counts(), &mode).unwrap();
        assert_eq!(result.height(), 3);
        let index = result.index().unwrap();
        assert_eq!(index.names(), &["site".to_string()]);
        assert_eq!(index.level_values(0), vec![Value::text("A"), Value::text("B"), Value::text("C")]);
        assert_eq!(
            result.column("patients").unwrap().values(),
            &[Value::Int(6), Value::Int(0), Value::Int(4)]
        );
    }

    #[test]
    fn test_dense_with_second_key() {
        let mode = AggregationMode::Dense {
            domain: vec!["A".into(), "B".into(), "C".into()],
        };
        let spec = AggregationSpec::new().with("patients", AggregationType::Sum);
        let result = aggregate(&visits(), &["site", "year"], &spec, &mode).unwrap();
        assert_eq!(result.height(), 6);
        assert_eq!(result.index().unwrap().levels(), 2);
        let b_2019 = Key::from_vec(vec![Value::text("B"), Value::Int(2019)]);
        let row = result.row_position(&b_2019).unwrap();
        assert_eq!(result.get(row, "patients"), Some(&Value::Int(0)));
    }

    #[test]
    fn test_dense_drops_out_of_domain_rows() {
        let mode = AggregationMode::Dense { domain: vec!["A".into()] };
        let result = aggregate(&visits(), &["site"], &counts(), &mode).unwrap();
        assert_eq!(result.height(), 1);
        assert_eq!(result.get(0, "patients"), Some(&Value::Int(6)));
    }

    #[test]
    fn test_dense_needs_a_grouping_column() {
        let mode = AggregationMode::Dense { domain: vec![] };
        let err = aggregate(&visits(), &[], &counts(), &mode).unwrap_err();
        assert!(matches!(err, ReportError::InvalidOptions(_)));
    }

    #[test]
    fn test_normalize_whole_columns() {
        let spec = AggregationSpec::new().with("patients", AggregationType::Sum);
        let summed = aggregate(&visits(), &["site"], &spec, &AggregationMode::Sparse).unwrap();
        let shares = normalize_within_groups(&summed, &["patients"], &[]).unwrap();
        let total: f64 = shares.column("patients").unwrap().values().iter().filter_map(Value::as_f64).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_within_partitions() {
        let spec = AggregationSpec::new().with("patients", AggregationType::Sum);
        let summed = aggregate(&visits(), &["site", "year"], &spec, &AggregationMode::Sparse).unwrap();
        let shares = normalize_within_groups(&summed, &["patients"], &[1]).unwrap();
        let index = shares.index().unwrap();
        for year in [Value::Int(2019), Value::Int(2020)] {
            let total: f64 = index
                .labels()
                .iter()
                .zip(shares.column("patients").unwrap().values())
                .filter(|(label, _)| label[1] == year)
                .filter_map(|(_, v)| v.as_f64())
                .sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalize_zero_total_and_nulls() {
        let table = Table::new(vec![
            Column::label("k", ["a", "b"]),
            Column::numeric("zero", [0, 0]),
            Column::numeric("gap", [Value::Null, Value::Int(4)]),
        ])
        .unwrap()
        .set_index(&["k"])
        .unwrap();
        let shares = normalize_within_groups(&table, &["zero", "gap"], &[]).unwrap();
        assert_eq!(shares.get(0, "zero"), Some(&Value::Float(0.0)));
        assert!(shares.get(0, "gap").unwrap().is_null());
        assert_eq!(shares.get(1, "gap"), Some(&Value::Float(1.0)));
    }
}
