//! FILENAME: core/table-engine/src/groupby.rs
//! Grouped aggregation.
//!
//! Aggregation operations are opaque to the grouping machinery: anything
//! implementing `Aggregator` can be plugged into an `AggregationSpec`. A
//! small set of built-in operations (`AggregationType`) covers the usual
//! report statistics.
//!
//! Algorithm:
//! 1. Bucket row positions by their group key (rows with a null key are dropped)
//! 2. Enumerate output keys: observed keys, or the cartesian product of every
//!    level's values when categorical domains must be fully represented
//! 3. For each key and each (column, operation), apply the operation to the
//!    bucket's values (an empty slice for unobserved groups)

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{compare_keys, Column, ColumnKind, LevelOrder, RowIndex, Table};
use crate::value::{Key, Value};

// ============================================================================
// AGGREGATOR
// ============================================================================

/// An aggregation operation over the values of one group.
///
/// Called with an empty slice for groups that have no rows; the result
/// should be the operation's identity (e.g. 0 for count) or null.
pub trait Aggregator: Send + Sync {
    fn apply(&self, values: &[&Value]) -> Value;
}

/// Built-in aggregation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    /// Number of non-null values.
    Count,
    /// Number of rows, nulls included.
    Size,
    Sum,
    Mean,
    Min,
    Max,
    /// Number of distinct non-null values.
    NUnique,
    Median,
    /// Sample standard deviation.
    StdDev,
    /// Sample variance.
    Var,
}

impl AggregationType {
    pub fn name(&self) -> &'static str {
        match self {
            AggregationType::Count => "count",
            AggregationType::Size => "size",
            AggregationType::Sum => "sum",
            AggregationType::Mean => "mean",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::NUnique => "nunique",
            AggregationType::Median => "median",
            AggregationType::StdDev => "std",
            AggregationType::Var => "var",
        }
    }
}

impl Default for AggregationType {
    fn default() -> Self {
        AggregationType::Count
    }
}

/// Running statistics over the numeric values of one group.
/// Using Welford's algorithm for numerical stability.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    count_numbers: u64,
    sum: f64,
    mean: f64,
    m2: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    fn add_number(&mut self, value: f64) {
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));

        let delta = value - self.mean;
        self.mean += delta / (self.count_numbers as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance(&self) -> Option<f64> {
        if self.count_numbers > 1 {
            Some(self.m2 / ((self.count_numbers - 1) as f64))
        } else {
            None
        }
    }
}

/// Exact running sum and extremes of integer inputs; `all_int` drops as
/// soon as a non-integer number is seen.
struct IntAccumulator {
    all_int: bool,
    sum: Option<i64>,
    min: Option<i64>,
    max: Option<i64>,
}

impl Default for IntAccumulator {
    fn default() -> Self {
        IntAccumulator {
            all_int: true,
            sum: Some(0),
            min: None,
            max: None,
        }
    }
}

impl IntAccumulator {
    fn add(&mut self, value: i64) {
        self.sum = self.sum.and_then(|s| s.checked_add(value));
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// `None` on mixed input or i64 overflow.
    fn exact_sum(&self) -> Option<i64> {
        if self.all_int {
            self.sum
        } else {
            None
        }
    }
}

impl Aggregator for AggregationType {
    fn apply(&self, values: &[&Value]) -> Value {
        match self {
            AggregationType::Size => return Value::Int(values.len() as i64),
            AggregationType::Count => {
                return Value::Int(values.iter().filter(|v| !v.is_null()).count() as i64)
            }
            AggregationType::NUnique => {
                let distinct: FxHashSet<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
                return Value::Int(distinct.len() as i64);
            }
            AggregationType::Median => {
                let mut numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numbers.is_empty() {
                    return Value::Null;
                }
                numbers.sort_by(|a, b| a.total_cmp(b));
                let mid = numbers.len() / 2;
                let median = if numbers.len() % 2 == 0 {
                    (numbers[mid - 1] + numbers[mid]) / 2.0
                } else {
                    numbers[mid]
                };
                return Value::Float(median);
            }
            _ => {}
        }

        let mut acc = Accumulator::default();
        let mut ints = IntAccumulator::default();
        for value in values {
            if let Some(n) = value.as_f64() {
                match value {
                    Value::Int(i) => ints.add(*i),
                    _ => ints.all_int = false,
                }
                acc.add_number(n);
            }
        }

        match self {
            AggregationType::Sum => match ints.exact_sum() {
                // Sum over zero rows is 0, keeping integer sums integral
                Some(sum) => Value::Int(sum),
                None => Value::Float(acc.sum),
            },
            AggregationType::Mean => {
                if acc.count_numbers > 0 {
                    Value::Float(acc.mean)
                } else {
                    Value::Null
                }
            }
            AggregationType::Min => match (ints.all_int, ints.min) {
                (true, Some(min)) => Value::Int(min),
                _ => acc.min.map_or(Value::Null, Value::Float),
            },
            AggregationType::Max => match (ints.all_int, ints.max) {
                (true, Some(max)) => Value::Int(max),
                _ => acc.max.map_or(Value::Null, Value::Float),
            },
            AggregationType::Var => acc.variance().map_or(Value::Null, Value::Float),
            AggregationType::StdDev => acc.variance().map_or(Value::Null, |v| Value::Float(v.sqrt())),
            AggregationType::Size | AggregationType::Count | AggregationType::NUnique | AggregationType::Median => {
                Value::Null
            }
        }
    }
}

struct FnAggregator<F>(F);

impl<F> Aggregator for FnAggregator<F>
where
    F: Fn(&[&Value]) -> Value + Send + Sync,
{
    fn apply(&self, values: &[&Value]) -> Value {
        (self.0)(values)
    }
}

// ============================================================================
// AGGREGATION SPEC
// ============================================================================

/// An aggregation operation with the name it is reported under.
#[derive(Clone)]
pub struct NamedAggregation {
    name: String,
    op: Arc<dyn Aggregator>,
}

impl NamedAggregation {
    pub fn builtin(aggregation: AggregationType) -> Self {
        NamedAggregation {
            name: aggregation.name().to_string(),
            op: Arc::new(aggregation),
        }
    }

    pub fn custom<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[&Value]) -> Value + Send + Sync + 'static,
    {
        NamedAggregation {
            name: name.into(),
            op: Arc::new(FnAggregator(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, values: &[&Value]) -> Value {
        self.op.apply(values)
    }
}

impl fmt::Debug for NamedAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedAggregation").field("name", &self.name).finish()
    }
}

/// Serializable description of the aggregations for one source column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationDefinition {
    pub column: String,
    pub operations: Vec<AggregationType>,
}

/// Ordered mapping from source column to one or more named operations.
///
/// Output columns follow the aggregation order. A source column with exactly one
/// operation yields a column named after the source; with several, each
/// yields `"{source}_{operation}"`.
#[derive(Debug, Clone, Default)]
pub struct AggregationSpec {
    entries: Vec<(String, Vec<NamedAggregation>)>,
}

impl AggregationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, column: impl Into<String>, aggregation: NamedAggregation) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some((_, ops)) => ops.push(aggregation),
            None => self.entries.push((column, vec![aggregation])),
        }
    }

    /// Builder form of `add` for a built-in operation.
    pub fn with(mut self, column: impl Into<String>, aggregation: AggregationType) -> Self {
        self.add(column, NamedAggregation::builtin(aggregation));
        self
    }

    /// Builder form of `add` for a caller-supplied operation.
    pub fn with_custom<F>(mut self, column: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[&Value]) -> Value + Send + Sync + 'static,
    {
        self.add(column, NamedAggregation::custom(name, f));
        self
    }

    pub fn from_definitions(definitions: &[AggregationDefinition]) -> Self {
        let mut spec = AggregationSpec::new();
        for def in definitions {
            for &op in &def.operations {
                spec.add(def.column.clone(), NamedAggregation::builtin(op));
            }
        }
        spec
    }

    pub fn entries(&self) -> &[(String, Vec<NamedAggregation>)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Output column names, in output order.
    pub fn output_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (column, ops) in &self.entries {
            if ops.len() == 1 {
                names.push(column.clone());
            } else {
                names.extend(ops.iter().map(|op| format!("{}_{}", column, op.name())));
            }
        }
        names
    }
}

// ============================================================================
// GROUP BY
// ============================================================================

/// A pending grouping of a table by one or more key columns.
pub struct GroupBy<'a> {
    table: &'a Table,
    keys: Vec<&'a Column>,
    observed: bool,
}

impl Table {
    pub fn group_by<'a>(&'a self, keys: &[&str]) -> Result<GroupBy<'a>> {
        let keys = keys.iter().map(|k| self.column(k)).collect::<Result<Vec<_>>>()?;
        Ok(GroupBy {
            table: self,
            keys,
            observed: true,
        })
    }
}

impl<'a> GroupBy<'a> {
    /// With `observed(false)`, the output enumerates the cartesian product of
    /// every key level: the full domain for categorical keys, the observed
    /// distinct values for the others.
    pub fn observed(mut self, observed: bool) -> Self {
        self.observed = observed;
        self
    }

    pub fn aggregate(&self, spec: &AggregationSpec) -> Result<Table> {
        let sources = spec
            .entries()
            .iter()
            .map(|(column, ops)| self.table.column(column).map(|c| (c, ops)))
            .collect::<Result<Vec<_>>>()?;

        // Step 1: bucket rows by key
        let mut buckets: FxHashMap<Key, Vec<usize>> = FxHashMap::default();
        let mut observed_keys: Vec<Key> = Vec::new();
        for row in 0..self.table.height() {
            let key: Key = self.keys.iter().map(|c| c.values()[row].clone()).collect();
            if key.iter().any(Value::is_null) {
                continue;
            }
            let bucket = buckets.entry(key.clone()).or_insert_with(|| {
                observed_keys.push(key);
                Vec::new()
            });
            bucket.push(row);
        }

        // Step 2: enumerate output keys in sorted order
        let orders: Vec<LevelOrder> = self.keys.iter().map(|c| LevelOrder::for_kind(c.kind())).collect();
        let group_keys = if self.observed {
            let mut keys = observed_keys;
            keys.sort_by(|a, b| compare_keys(&orders, a, b));
            keys
        } else {
            self.cartesian_keys(&observed_keys, &orders)
        };

        // Step 3: aggregate each group
        let empty: Vec<usize> = Vec::new();
        let mut outputs: Vec<Vec<Value>> = vec![Vec::with_capacity(group_keys.len()); spec.output_names().len()];
        for key in &group_keys {
            let rows = buckets.get(key).unwrap_or(&empty);
            let mut slot = 0;
            for (source, ops) in &sources {
                let values: Vec<&Value> = rows.iter().map(|&r| &source.values()[r]).collect();
                for op in ops.iter() {
                    outputs[slot].push(op.apply(&values));
                    slot += 1;
                }
            }
        }

        let columns = spec
            .output_names()
            .into_iter()
            .zip(outputs)
            .map(|(name, values)| Column::new(name, ColumnKind::Numeric, values))
            .collect();
        let index = RowIndex::new(
            self.keys.iter().map(|c| c.name()).collect(),
            self.keys.iter().map(|c| c.kind().clone()).collect(),
            group_keys,
        )?;
        Table::new(columns)?.with_index(index)
    }

    fn cartesian_keys(&self, observed_keys: &[Key], orders: &[LevelOrder]) -> Vec<Key> {
        let mut levels: Vec<Vec<Value>> = Vec::with_capacity(self.keys.len());
        for (level, column) in self.keys.iter().enumerate() {
            let values = match column.kind().domain() {
                Some(domain) => {
                    let mut seen = FxHashSet::default();
                    domain.iter().filter(|v| seen.insert(*v)).cloned().collect()
                }
                None => {
                    let mut seen = FxHashSet::default();
                    let mut values: Vec<Value> = observed_keys
                        .iter()
                        .map(|k| k[level].clone())
                        .filter(|v| seen.insert(v.clone()))
                        .collect();
                    values.sort_by(|a, b| orders[level].compare(a, b));
                    values
                }
            };
            levels.push(values);
        }

        let mut keys: Vec<Key> = vec![Key::new()];
        for values in &levels {
            let mut next = Vec::with_capacity(keys.len() * values.len());
            for prefix in &keys {
                for value in values {
                    let mut key = prefix.clone();
                    key.push(value.clone());
                    next.push(key);
                }
            }
            keys = next;
        }
        keys
    }
}
