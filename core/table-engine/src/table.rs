//! FILENAME: core/table-engine/src/table.rs
//! PURPOSE: The Table data structure and its structural primitives.
//! CONTEXT: A Table is an ordered list of typed columns plus an optional
//! row index of one or two levels. Column headers are Keys, so a pivoted
//! table can carry a two-level (double) header. Every operation takes
//! `&self` and returns a newly built Table; callers' tables are never
//! mutated.

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use crate::error::{Result, TableError};
use crate::value::{key_to_string, Key, Value};

// ============================================================================
// COLUMN KIND
// ============================================================================

/// Declared semantic type of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Values drawn from a fixed, ordered domain. The domain order is the
    /// sort order of the column and unobserved domain values can still be
    /// enumerated by `group_by(..).observed(false)`.
    Categorical { domain: Vec<Value> },
    /// Measures and aggregate results.
    Numeric,
    /// Free-form labels.
    Label,
}

impl ColumnKind {
    pub fn domain(&self) -> Option<&[Value]> {
        match self {
            ColumnKind::Categorical { domain } => Some(domain),
            _ => None,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, ColumnKind::Categorical { .. })
    }
}

impl Default for ColumnKind {
    fn default() -> Self {
        ColumnKind::Label
    }
}

/// Sort order of the values of one column or axis level.
///
/// Categorical levels sort by domain position, then values outside the
/// domain, then nulls. Every other kind uses `Value::compare`.
#[derive(Debug, Clone)]
pub struct LevelOrder {
    positions: Option<FxHashMap<Value, usize>>,
}

impl LevelOrder {
    pub fn for_kind(kind: &ColumnKind) -> Self {
        let positions = kind.domain().map(|domain| {
            let mut positions = FxHashMap::default();
            for (pos, value) in domain.iter().enumerate() {
                positions.entry(value.clone()).or_insert(pos);
            }
            positions
        });
        LevelOrder { positions }
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let positions = match &self.positions {
            Some(positions) => positions,
            None => return a.compare(b),
        };
        let rank = |v: &Value| -> (u8, usize) {
            if v.is_null() {
                return (2, 0);
            }
            match positions.get(v) {
                Some(&pos) => (0, pos),
                None => (1, 0),
            }
        };
        let (ra, rb) = (rank(a), rank(b));
        ra.cmp(&rb).then_with(|| {
            if ra.0 == 1 {
                a.compare(b)
            } else {
                Ordering::Equal
            }
        })
    }
}

/// Lexicographic comparison of two keys, one `LevelOrder` per level.
pub fn compare_keys(orders: &[LevelOrder], a: &Key, b: &Key) -> Ordering {
    for (level, order) in orders.iter().enumerate() {
        let ord = order.compare(&a[level], &b[level]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ============================================================================
// COLUMN
// ============================================================================

/// A single column: header key, declared kind and values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    key: Key,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    /// Creates a column with a single-level text header.
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Column {
            key: smallvec![Value::Text(name.into())],
            kind,
            values,
        }
    }

    /// Creates a column with an arbitrary (possibly two-level) header.
    pub fn from_key(key: Key, kind: ColumnKind, values: Vec<Value>) -> Self {
        Column { key, kind, values }
    }

    pub fn numeric<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Column::new(name, ColumnKind::Numeric, values.into_iter().map(Into::into).collect())
    }

    pub fn label<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Column::new(name, ColumnKind::Label, values.into_iter().map(Into::into).collect())
    }

    pub fn categorical<I>(name: impl Into<String>, domain: Vec<Value>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Column::new(
            name,
            ColumnKind::Categorical { domain },
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Display name of the header (levels joined with " / ").
    pub fn name(&self) -> String {
        key_to_string(&self.key)
    }

    /// True if the header is a single text level equal to `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.key.len() == 1 && self.key[0].as_str() == Some(name)
    }

    /// Same header and kind, new values.
    pub fn with_values(&self, values: Vec<Value>) -> Column {
        Column {
            key: self.key.clone(),
            kind: self.kind.clone(),
            values,
        }
    }
}

// ============================================================================
// ROW INDEX
// ============================================================================

/// Row labels of one or two levels, with a name and kind per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIndex {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    labels: Vec<Key>,
}

impl RowIndex {
    pub fn new(names: Vec<String>, kinds: Vec<ColumnKind>, labels: Vec<Key>) -> Result<Self> {
        if kinds.len() != names.len() {
            return Err(TableError::IndexLevelMismatch {
                levels: names.len(),
                found: kinds.len(),
            });
        }
        if let Some(bad) = labels.iter().find(|l| l.len() != names.len()) {
            return Err(TableError::IndexLevelMismatch {
                levels: names.len(),
                found: bad.len(),
            });
        }
        Ok(RowIndex { names, kinds, labels })
    }

    pub fn levels(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kinds(&self) -> &[ColumnKind] {
        &self.kinds
    }

    pub fn labels(&self) -> &[Key] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All values of one level, in row order.
    pub fn level_values(&self, level: usize) -> Vec<Value> {
        self.labels
            .iter()
            .map(|l| l.get(level).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn position(&self, key: &Key) -> Option<usize> {
        self.labels.iter().position(|l| l == key)
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// An immutable-by-convention table of typed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    index: Option<RowIndex>,
    /// Names of the header levels (set by pivot).
    header_names: Vec<String>,
    /// Declared domain of the outer header level, if it came from a categorical.
    header_categories: Option<Vec<Value>>,
    height: usize,
}

impl Table {
    /// Builds a table from columns of equal length with unique headers.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let height = columns.first().map_or(0, Column::len);
        let mut seen: FxHashSet<&Key> = FxHashSet::default();
        for column in &columns {
            if column.len() != height {
                return Err(TableError::LengthMismatch {
                    what: format!("column '{}'", column.name()),
                    expected: height,
                    found: column.len(),
                });
            }
            if !seen.insert(column.key()) {
                return Err(TableError::DuplicateColumn(column.name()));
            }
        }
        Ok(Table {
            columns,
            index: None,
            header_names: Vec::new(),
            header_categories: None,
            height,
        })
    }

    /// Attaches a row index. Its length must match the table height,
    /// unless the table has no columns yet.
    pub fn with_index(mut self, index: RowIndex) -> Result<Self> {
        if self.columns.is_empty() {
            self.height = index.len();
        } else if index.len() != self.height {
            return Err(TableError::LengthMismatch {
                what: "row index".to_string(),
                expected: self.height,
                found: index.len(),
            });
        }
        self.index = Some(index);
        Ok(self)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_keys(&self) -> Vec<Key> {
        self.columns.iter().map(|c| c.key().clone()).collect()
    }

    pub fn index(&self) -> Option<&RowIndex> {
        self.index.as_ref()
    }

    pub fn header_names(&self) -> &[String] {
        &self.header_names
    }

    pub fn header_categories(&self) -> Option<&[Value]> {
        self.header_categories.as_deref()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.has_name(name))
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column_by_key(&self, key: &Key) -> Option<&Column> {
        self.columns.iter().find(|c| c.key() == key)
    }

    /// Value at (row, single-level column name).
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).ok().and_then(|c| c.values().get(row))
    }

    /// Value at (row, header key).
    pub fn get_by_key(&self, row: usize, key: &Key) -> Option<&Value> {
        self.column_by_key(key).and_then(|c| c.values().get(row))
    }

    /// Row position of an index label.
    pub fn row_position(&self, label: &Key) -> Option<usize> {
        self.index.as_ref().and_then(|i| i.position(label))
    }

    fn rebuild(&self, columns: Vec<Column>) -> Table {
        Table {
            columns,
            index: self.index.clone(),
            header_names: self.header_names.clone(),
            header_categories: self.header_categories.clone(),
            height: self.height,
        }
    }

    // ========================================================================
    // COLUMN OPERATIONS
    // ========================================================================

    /// Adds a column, replacing any column with the same header.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        let empty = self.columns.is_empty() && self.index.is_none();
        if !empty && column.len() != self.height {
            return Err(TableError::LengthMismatch {
                what: format!("column '{}'", column.name()),
                expected: self.height,
                found: column.len(),
            });
        }
        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.key() == column.key()) {
            Some(pos) => columns[pos] = column,
            None => columns.push(column),
        }
        let mut table = self.rebuild(columns);
        if empty {
            table.height = table.columns.first().map_or(0, Column::len);
        }
        Ok(table)
    }

    pub fn drop_columns(&self, names: &[&str]) -> Result<Table> {
        for name in names {
            self.column(name)?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| !names.iter().any(|n| c.has_name(n)))
            .cloned()
            .collect();
        Ok(self.rebuild(columns))
    }

    /// Reorders columns by a permutation of column positions.
    pub fn reorder_columns(&self, order: &[usize]) -> Result<Table> {
        let mut used = vec![false; self.columns.len()];
        for &pos in order {
            if pos >= used.len() || used[pos] {
                return Err(TableError::LengthMismatch {
                    what: "column permutation".to_string(),
                    expected: self.columns.len(),
                    found: order.len(),
                });
            }
            used[pos] = true;
        }
        if order.len() != self.columns.len() {
            return Err(TableError::LengthMismatch {
                what: "column permutation".to_string(),
                expected: self.columns.len(),
                found: order.len(),
            });
        }
        let columns = order.iter().map(|&pos| self.columns[pos].clone()).collect();
        Ok(self.rebuild(columns))
    }

    /// Renames single-level text headers. Headers not in the mapping are kept.
    pub fn rename_columns(&self, mapping: &FxHashMap<String, String>) -> Result<Table> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .map(|c| {
                let renamed = c
                    .key()
                    .first()
                    .and_then(Value::as_str)
                    .filter(|_| c.key().len() == 1)
                    .and_then(|name| mapping.get(name));
                match renamed {
                    Some(new_name) => Column::new(new_name.clone(), c.kind().clone(), c.values().to_vec()),
                    None => c.clone(),
                }
            })
            .collect();
        let mut table = Table::new(columns)?;
        table.index = self.index.clone();
        table.header_names = self.header_names.clone();
        table.header_categories = self.header_categories.clone();
        table.height = self.height;
        Ok(table)
    }

    /// Maps every header label at `level`. The declared header categories
    /// follow the outer level.
    pub fn relabel_header_level(&self, level: usize, f: impl Fn(&Value) -> Value) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut key = c.key().clone();
                if let Some(label) = key.get_mut(level) {
                    *label = f(label);
                }
                Column::from_key(key, c.kind().clone(), c.values().to_vec())
            })
            .collect();
        let mut table = self.rebuild(columns);
        if level == 0 {
            table.header_categories = self
                .header_categories
                .as_ref()
                .map(|cats| cats.iter().map(&f).collect());
        }
        table
    }

    pub fn set_header_names(&self, names: Vec<String>) -> Table {
        let mut table = self.clone();
        table.header_names = names;
        table
    }

    pub fn with_header_categories(&self, categories: Option<Vec<Value>>) -> Table {
        let mut table = self.clone();
        table.header_categories = categories;
        table
    }

    /// Drops declared header categories that no column uses.
    pub fn prune_unused_header_categories(&self) -> Table {
        let mut table = self.clone();
        if let Some(cats) = &self.header_categories {
            let used: FxHashSet<&Value> = self.columns.iter().filter_map(|c| c.key().first()).collect();
            table.header_categories = Some(cats.iter().filter(|v| used.contains(v)).cloned().collect());
        }
        table
    }

    /// Coerces a column to a categorical over `domain`. Values outside the
    /// domain become null.
    pub fn as_categorical(&self, name: &str, domain: &[Value]) -> Result<Table> {
        let column = self.column(name)?;
        let members: FxHashSet<&Value> = domain.iter().collect();
        let values = column
            .values()
            .iter()
            .map(|v| if members.contains(v) { v.clone() } else { Value::Null })
            .collect();
        self.with_column(Column::from_key(
            column.key().clone(),
            ColumnKind::Categorical { domain: domain.to_vec() },
            values,
        ))
    }

    /// Replaces nulls in the listed columns.
    pub fn fill_null(&self, columns: &[Key], value: &Value) -> Result<Table> {
        for key in columns {
            if self.column_by_key(key).is_none() {
                return Err(TableError::ColumnNotFound(key_to_string(key)));
            }
        }
        Ok(self.fill_null_where(|c| columns.contains(c.key()), value))
    }

    /// Replaces nulls in every column accepted by `select`.
    pub fn fill_null_where(&self, select: impl Fn(&Column) -> bool, value: &Value) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                if !select(c) {
                    return c.clone();
                }
                let values = c
                    .values()
                    .iter()
                    .map(|v| if v.is_null() { value.clone() } else { v.clone() })
                    .collect();
                c.with_values(values)
            })
            .collect();
        self.rebuild(columns)
    }

    // ========================================================================
    // ROW OPERATIONS
    // ========================================================================

    /// Gathers rows by position. Positions must be in bounds.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| c.with_values(rows.iter().map(|&r| c.values()[r].clone()).collect()))
            .collect();
        let index = self.index.as_ref().map(|idx| RowIndex {
            names: idx.names.clone(),
            kinds: idx.kinds.clone(),
            labels: rows.iter().map(|&r| idx.labels[r].clone()).collect(),
        });
        Table {
            columns,
            index,
            header_names: self.header_names.clone(),
            header_categories: self.header_categories.clone(),
            height: rows.len(),
        }
    }

    pub fn filter(&self, mask: &[bool]) -> Result<Table> {
        if mask.len() != self.height {
            return Err(TableError::LengthMismatch {
                what: "filter mask".to_string(),
                expected: self.height,
                found: mask.len(),
            });
        }
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| if keep { Some(i) } else { None })
            .collect();
        Ok(self.take_rows(&rows))
    }

    /// Stable ascending permutation of rows by the named columns.
    pub fn sort_permutation(&self, names: &[&str]) -> Result<Vec<usize>> {
        let keys = names
            .iter()
            .map(|n| self.column(n).map(|c| (c.values(), LevelOrder::for_kind(c.kind()))))
            .collect::<Result<Vec<_>>>()?;
        let mut rows: Vec<usize> = (0..self.height).collect();
        rows.sort_by(|&a, &b| {
            for (values, order) in &keys {
                let ord = order.compare(&values[a], &values[b]);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(rows)
    }

    /// Stable ascending sort by the named columns; nulls last.
    pub fn sort_by(&self, names: &[&str]) -> Result<Table> {
        let rows = self.sort_permutation(names)?;
        Ok(self.take_rows(&rows))
    }

    // ========================================================================
    // INDEX OPERATIONS
    // ========================================================================

    /// Moves the named columns into the row index (replacing any existing index).
    pub fn set_index(&self, names: &[&str]) -> Result<Table> {
        let level_columns = names
            .iter()
            .map(|n| self.column(n))
            .collect::<Result<Vec<_>>>()?;
        let labels = (0..self.height)
            .map(|row| level_columns.iter().map(|c| c.values()[row].clone()).collect())
            .collect();
        let index = RowIndex {
            names: names.iter().map(|n| n.to_string()).collect(),
            kinds: level_columns.iter().map(|c| c.kind().clone()).collect(),
            labels,
        };
        let mut table = self.drop_columns(names)?;
        table.index = Some(index);
        table.height = self.height;
        Ok(table)
    }

    /// Moves the row index levels back in front of the columns.
    pub fn reset_index(&self) -> Result<Table> {
        let index = match &self.index {
            Some(index) => index,
            None => return Ok(self.clone()),
        };
        let mut columns: Vec<Column> = (0..index.levels())
            .map(|level| Column::new(index.names[level].clone(), index.kinds[level].clone(), index.level_values(level)))
            .collect();
        columns.extend(self.columns.iter().cloned());
        let mut table = Table::new(columns)?;
        table.header_names = self.header_names.clone();
        table.header_categories = self.header_categories.clone();
        table.height = self.height;
        Ok(table)
    }

    pub fn set_index_names(&self, names: &[String]) -> Result<Table> {
        let index = self.index.as_ref().ok_or(TableError::NoIndex)?;
        if names.len() != index.levels() {
            return Err(TableError::IndexLevelMismatch {
                levels: index.levels(),
                found: names.len(),
            });
        }
        let mut table = self.clone();
        if let Some(idx) = table.index.as_mut() {
            idx.names = names.to_vec();
        }
        Ok(table)
    }

    /// Removes one level of a multi-level row index.
    pub fn drop_index_level(&self, level: usize) -> Result<Table> {
        let index = self.index.as_ref().ok_or(TableError::NoIndex)?;
        if level >= index.levels() {
            return Err(TableError::IndexLevelMismatch {
                levels: index.levels(),
                found: level + 1,
            });
        }
        let mut names = index.names.clone();
        let mut kinds = index.kinds.clone();
        names.remove(level);
        kinds.remove(level);
        let labels = index
            .labels
            .iter()
            .map(|l| {
                let mut l = l.clone();
                l.remove(level);
                l
            })
            .collect();
        let mut table = self.clone();
        table.index = Some(RowIndex { names, kinds, labels });
        Ok(table)
    }

    /// Maps every label of one index level through a fallible function.
    pub fn try_map_index_level<E, F>(&self, level: usize, mut f: F) -> std::result::Result<Table, E>
    where
        E: From<TableError>,
        F: FnMut(&Value) -> std::result::Result<Value, E>,
    {
        let index = self.index.as_ref().ok_or(TableError::NoIndex)?;
        if level >= index.levels() {
            return Err(TableError::IndexLevelMismatch {
                levels: index.levels(),
                found: level + 1,
            }
            .into());
        }
        let mut labels = Vec::with_capacity(index.len());
        for label in &index.labels {
            let mut label = label.clone();
            let mapped = f(&label[level])?;
            label[level] = mapped;
            labels.push(label);
        }
        let mut kinds = index.kinds.clone();
        // Mapped labels no longer belong to the old categorical domain
        if kinds[level].is_categorical() {
            kinds[level] = ColumnKind::Label;
        }
        let mut table = self.clone();
        table.index = Some(RowIndex {
            names: index.names.clone(),
            kinds,
            labels,
        });
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::label("site", ["north", "south", "east", "north"]),
            Column::numeric("visits", [3, 5, 1, 2]),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::label("a", ["x", "y"]),
            Column::numeric("b", [1]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_new_rejects_duplicate_headers() {
        let err = Table::new(vec![Column::numeric("a", [1]), Column::numeric("a", [2])]).unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_sort_by_is_stable_with_nulls_last() {
        let table = Table::new(vec![
            Column::numeric("key", [Value::Int(2), Value::Null, Value::Int(1), Value::Null, Value::Int(1)]),
            Column::label("tag", ["a", "b", "c", "d", "e"]),
        ])
        .unwrap();
        let sorted = table.sort_by(&["key"]).unwrap();
        let tags: Vec<String> = sorted.column("tag").unwrap().values().iter().map(|v| v.to_string()).collect();
        assert_eq!(tags, vec!["c", "e", "a", "b", "d"]);
    }

    #[test]
    fn test_categorical_sort_follows_domain() {
        let table = sample()
            .as_categorical("site", &["south".into(), "north".into(), "east".into()])
            .unwrap();
        let sorted = table.sort_by(&["site"]).unwrap();
        assert_eq!(
            sorted.column("site").unwrap().values(),
            &[
                Value::text("south"),
                Value::text("north"),
                Value::text("north"),
                Value::text("east"),
            ][..]
        );
    }

    #[test]
    fn test_as_categorical_nulls_out_of_domain_values() {
        let table = sample().as_categorical("site", &["north".into()]).unwrap();
        let values = table.column("site").unwrap().values();
        assert_eq!(values[0], Value::text("north"));
        assert!(values[1].is_null());
        assert!(values[2].is_null());
    }

    #[test]
    fn test_set_and_reset_index_round_trip() {
        let indexed = sample().set_index(&["site"]).unwrap();
        assert_eq!(indexed.width(), 1);
        assert_eq!(indexed.index().unwrap().names(), &["site".to_string()]);
        let flat = indexed.reset_index().unwrap();
        assert_eq!(flat, sample());
    }

    #[test]
    fn test_fill_null_where_only_touches_selected_columns() {
        let table = Table::new(vec![
            Column::numeric("a", [Value::Null, Value::Int(1)]),
            Column::numeric("b", [Value::Null, Value::Int(2)]),
        ])
        .unwrap();
        let filled = table.fill_null_where(|c| c.has_name("a"), &Value::Int(0));
        assert_eq!(filled.get(0, "a"), Some(&Value::Int(0)));
        assert!(filled.get(0, "b").unwrap().is_null());
    }

    #[test]
    fn test_fill_null_replaces_listed_columns() {
        let table = Table::new(vec![
            Column::numeric("a", [Value::Null, Value::Int(1)]),
            Column::numeric("b", [Value::Null, Value::Int(2)]),
        ])
        .unwrap();
        let a_key = table.column("a").unwrap().key().clone();
        let filled = table.fill_null(&[a_key], &Value::Int(0)).unwrap();
        assert_eq!(filled.get(0, "a"), Some(&Value::Int(0)));
        assert_eq!(filled.get(1, "a"), Some(&Value::Int(1)));
        assert!(filled.get(0, "b").unwrap().is_null());

        let missing = Key::from_vec(vec![Value::text("c")]);
        let err = table.fill_null(&[missing], &Value::Int(0)).unwrap_err();
        assert!(matches!(err, TableError::ColumnNotFound(_)));
    }

    #[test]
    fn test_categorical_column_sorts_by_domain() {
        let domain: Vec<Value> = vec!["low".into(), "mid".into(), "high".into()];
        let table = Table::new(vec![
            Column::categorical("band", domain.clone(), ["high", "low", "high"]),
            Column::numeric("visits", [2, 1, 4]),
        ])
        .unwrap();
        assert_eq!(table.column("band").unwrap().kind().domain(), Some(&domain[..]));
        let sorted = table.sort_by(&["band"]).unwrap();
        assert_eq!(sorted.get(0, "band"), Some(&Value::text("low")));
        assert_eq!(sorted.get(2, "visits"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_prune_unused_header_categories() {
        let table = Table::new(vec![Column::numeric("b", [1])])
            .unwrap()
            .with_header_categories(Some(vec!["a".into(), "b".into(), "c".into()]));
        let pruned = table.prune_unused_header_categories();
        assert_eq!(pruned.header_categories(), Some(&[Value::text("b")][..]));
    }

    #[test]
    fn test_reorder_columns_rejects_non_permutation() {
        assert!(sample().reorder_columns(&[0, 0]).is_err());
        let swapped = sample().reorder_columns(&[1, 0]).unwrap();
        assert!(swapped.columns()[0].has_name("visits"));
    }
}
