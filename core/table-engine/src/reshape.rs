//! FILENAME: core/table-engine/src/reshape.rs
//! Wide <-> long reshaping: unpivot (melt) and pivot.

use rustc_hash::FxHashMap;

use crate::error::{Result, TableError};
use crate::table::{compare_keys, Column, ColumnKind, LevelOrder, RowIndex, Table};
use crate::value::{key_to_string, Key, Value};

impl Table {
    /// Converts `value_columns` into a (name, value) pair of columns.
    ///
    /// Emits one row per (value column, input row) pair, value columns in
    /// the order given, rows in input order. The id columns keep their kind.
    /// Any row index is ignored; reset it first to keep it.
    pub fn unpivot(
        &self,
        id_columns: &[&str],
        value_columns: &[&str],
        var_name: &str,
        value_name: &str,
    ) -> Result<Table> {
        let ids = id_columns.iter().map(|n| self.column(n)).collect::<Result<Vec<_>>>()?;
        let measures = value_columns.iter().map(|n| self.column(n)).collect::<Result<Vec<_>>>()?;

        let total = self.height() * measures.len();
        let mut id_values: Vec<Vec<Value>> = vec![Vec::with_capacity(total); ids.len()];
        let mut names = Vec::with_capacity(total);
        let mut values = Vec::with_capacity(total);

        for (measure, name) in measures.iter().zip(value_columns) {
            for row in 0..self.height() {
                for (slot, id) in id_values.iter_mut().zip(&ids) {
                    slot.push(id.values()[row].clone());
                }
                names.push(Value::text(*name));
                values.push(measure.values()[row].clone());
            }
        }

        let mut columns: Vec<Column> = ids
            .iter()
            .zip(id_values)
            .map(|(id, vals)| id.with_values(vals))
            .collect();
        columns.push(Column::new(var_name, ColumnKind::Label, names));
        columns.push(Column::new(value_name, ColumnKind::Numeric, values));
        Table::new(columns)
    }

    /// Spreads `values` into a grid: distinct `index` combinations become
    /// rows, distinct `columns` combinations become (possibly two-level)
    /// headers.
    ///
    /// Both axes are sorted (categorical levels by domain). Missing
    /// combinations are null. If the outer header column is categorical its
    /// domain becomes the table's declared header categories. Fails with
    /// `DuplicateKey` when an (index, column) combination occurs twice.
    pub fn pivot(&self, index: &[&str], columns: &[&str], values: &str) -> Result<Table> {
        let index_cols = index.iter().map(|n| self.column(n)).collect::<Result<Vec<_>>>()?;
        let header_cols = columns.iter().map(|n| self.column(n)).collect::<Result<Vec<_>>>()?;
        let measure = self.column(values)?;

        let mut row_keys: Vec<Key> = Vec::new();
        let mut row_pos: FxHashMap<Key, usize> = FxHashMap::default();
        let mut col_keys: Vec<Key> = Vec::new();
        let mut col_pos: FxHashMap<Key, usize> = FxHashMap::default();
        let mut cells: FxHashMap<(usize, usize), usize> = FxHashMap::default();

        for row in 0..self.height() {
            let row_key: Key = index_cols.iter().map(|c| c.values()[row].clone()).collect();
            let col_key: Key = header_cols.iter().map(|c| c.values()[row].clone()).collect();
            if row_key.iter().chain(col_key.iter()).any(Value::is_null) {
                continue;
            }
            let r = *row_pos.entry(row_key.clone()).or_insert_with(|| {
                row_keys.push(row_key.clone());
                row_keys.len() - 1
            });
            let c = *col_pos.entry(col_key.clone()).or_insert_with(|| {
                col_keys.push(col_key.clone());
                col_keys.len() - 1
            });
            if cells.insert((r, c), row).is_some() {
                return Err(TableError::DuplicateKey {
                    index: key_to_string(&row_key),
                    column: key_to_string(&col_key),
                });
            }
        }

        let row_orders: Vec<LevelOrder> = index_cols.iter().map(|c| LevelOrder::for_kind(c.kind())).collect();
        let col_orders: Vec<LevelOrder> = header_cols.iter().map(|c| LevelOrder::for_kind(c.kind())).collect();
        let mut row_sorted: Vec<usize> = (0..row_keys.len()).collect();
        row_sorted.sort_by(|&a, &b| compare_keys(&row_orders, &row_keys[a], &row_keys[b]));
        let mut col_sorted: Vec<usize> = (0..col_keys.len()).collect();
        col_sorted.sort_by(|&a, &b| compare_keys(&col_orders, &col_keys[a], &col_keys[b]));

        let grid_columns: Vec<Column> = col_sorted
            .iter()
            .map(|&c| {
                let vals = row_sorted
                    .iter()
                    .map(|&r| {
                        cells
                            .get(&(r, c))
                            .map_or(Value::Null, |&src| measure.values()[src].clone())
                    })
                    .collect();
                Column::from_key(col_keys[c].clone(), measure.kind().clone(), vals)
            })
            .collect();

        let row_index = RowIndex::new(
            index_cols.iter().map(|c| c.name()).collect(),
            index_cols.iter().map(|c| c.kind().clone()).collect(),
            row_sorted.iter().map(|&r| row_keys[r].clone()).collect(),
        )?;
        let header_categories = header_cols
            .first()
            .and_then(|c| c.kind().domain())
            .map(|d| d.to_vec());

        Ok(Table::new(grid_columns)?
            .with_index(row_index)?
            .set_header_names(header_cols.iter().map(|c| c.name()).collect())
            .with_header_categories(header_categories))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_form() -> Table {
        Table::new(vec![
            Column::label("year", [2020, 2019, 2020, 2019]),
            Column::label("site", ["north", "north", "south", "south"]),
            Column::numeric("visits", [4, 1, 7, 2]),
            Column::numeric("admits", [1, 0, 2, 1]),
        ])
        .unwrap()
    }

    #[test]
    fn test_unpivot_multiplies_rows_by_value_columns() {
        let melted = long_form().unpivot(&["year"], &["visits", "admits"], "variable", "value").unwrap();
        assert_eq!(melted.height(), 8);
        assert_eq!(melted.get(0, "variable"), Some(&Value::text("visits")));
        assert_eq!(melted.get(4, "variable"), Some(&Value::text("admits")));
        assert_eq!(melted.get(4, "value"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_pivot_sorts_both_axes() {
        let grid = long_form().pivot(&["site"], &["year"], "visits").unwrap();
        assert_eq!(grid.column_keys(), vec![Key::from_vec(vec![Value::Int(2019)]), Key::from_vec(vec![Value::Int(2020)])]);
        assert_eq!(grid.index().unwrap().level_values(0), vec![Value::text("north"), Value::text("south")]);
        assert_eq!(grid.get_by_key(1, &Key::from_vec(vec![Value::Int(2020)])), Some(&Value::Int(7)));
        assert_eq!(grid.header_names(), &["year".to_string()]);
    }

    #[test]
    fn test_pivot_two_level_header() {
        let melted = long_form().unpivot(&["year", "site"], &["visits", "admits"], "variable", "value").unwrap();
        let grid = melted.pivot(&["site"], &["year", "variable"], "value").unwrap();
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.column_keys()[0], Key::from_vec(vec![Value::Int(2019), Value::text("admits")]));
    }

    #[test]
    fn test_pivot_leaves_missing_combinations_null() {
        let sparse = long_form().filter(&[true, true, true, false]).unwrap();
        let grid = sparse.pivot(&["site"], &["year"], "visits").unwrap();
        assert!(grid.get_by_key(1, &Key::from_vec(vec![Value::Int(2019)])).unwrap().is_null());
    }

    #[test]
    fn test_pivot_rejects_duplicate_combinations() {
        let err = long_form().pivot(&["year"], &["year"], "visits").unwrap_err();
        assert!(matches!(err, TableError::DuplicateKey { .. }));
    }

    #[test]
    fn test_pivot_declares_categorical_header_domain() {
        let table = long_form()
            .as_categorical("year", &[Value::Int(2018), Value::Int(2019), Value::Int(2020)])
            .unwrap();
        let grid = table.pivot(&["site"], &["year"], "visits").unwrap();
        assert_eq!(grid.header_categories().map(|c| c.len()), Some(3));
        assert_eq!(grid.prune_unused_header_categories().header_categories().map(|c| c.len()), Some(2));
    }
}
