//! FILENAME: core/report-engine/src/labels.rs
//! Label utilities: ordering maps and value-relabeling maps.
//!
//! Both maps keep their entries in insertion order next to a hash lookup, so
//! they serialize back to the list a caller wrote and iterate
//! deterministically.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use table_engine::Value;

use crate::error::{ReportError, Result};

// ============================================================================
// ORDER INDEX
// ============================================================================

/// Label -> position mapping defining a display order.
///
/// Deserializes from either an ordered list of labels (`["FY19", "FY20"]`)
/// or explicit `[label, position]` pairs (`[["FY19", 0], ["FY21", 5]]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "OrderRepr", into = "OrderRepr")]
pub struct OrderIndex {
    entries: Vec<(Value, usize)>,
    positions: FxHashMap<Value, usize>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OrderRepr {
    Labels(Vec<Value>),
    Pairs(Vec<(Value, usize)>),
}

impl OrderIndex {
    /// Positions are the 0-based list positions.
    pub fn from_labels<I>(labels: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        OrderIndex::from_pairs(labels.into_iter().enumerate().map(|(pos, label)| (label, pos)))
    }

    /// Explicit label/position pairs. Positions need not be contiguous, and
    /// two labels may share a position (inverting such an index fails).
    pub fn from_pairs<I, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (V, usize)>,
        V: Into<Value>,
    {
        let mut index = OrderIndex::default();
        for (label, pos) in pairs {
            let label = label.into();
            if index.positions.insert(label.clone(), pos).is_some() {
                return Err(ReportError::DuplicateLabel { label });
            }
            index.entries.push((label, pos));
        }
        Ok(index)
    }

    pub fn position(&self, label: &Value) -> Option<usize> {
        self.positions.get(label).copied()
    }

    pub fn contains(&self, label: &Value) -> bool {
        self.positions.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Value, usize)] {
        &self.entries
    }

    /// Labels sorted by position (ties keep insertion order).
    pub fn labels_in_order(&self) -> Vec<Value> {
        let mut entries: Vec<&(Value, usize)> = self.entries.iter().collect();
        entries.sort_by_key(|(_, pos)| *pos);
        entries.into_iter().map(|(label, _)| label.clone()).collect()
    }

    /// Distinct positions, ascending.
    pub fn positions_in_order(&self) -> Vec<usize> {
        let mut positions: Vec<usize> = self.entries.iter().map(|(_, pos)| *pos).collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    /// Position -> label map, keyed by `Value::Int(position)`.
    pub fn invert(&self) -> Result<LabelMap> {
        let mut inverse = LabelMap::default();
        for (label, pos) in &self.entries {
            let code = Value::from(*pos);
            if let Some(first) = inverse.get(&code) {
                return Err(ReportError::AmbiguousReverseMapping {
                    label: code,
                    first: first.clone(),
                    second: label.clone(),
                });
            }
            inverse.push(code, label.clone());
        }
        Ok(inverse)
    }
}

impl PartialEq for OrderIndex {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TryFrom<OrderRepr> for OrderIndex {
    type Error = ReportError;

    fn try_from(repr: OrderRepr) -> Result<Self> {
        match repr {
            OrderRepr::Labels(labels) => OrderIndex::from_labels(labels),
            OrderRepr::Pairs(pairs) => OrderIndex::from_pairs(pairs),
        }
    }
}

impl From<OrderIndex> for OrderRepr {
    fn from(index: OrderIndex) -> Self {
        let contiguous = index.entries.iter().enumerate().all(|(i, (_, pos))| i == *pos);
        if contiguous {
            OrderRepr::Labels(index.entries.into_iter().map(|(label, _)| label).collect())
        } else {
            OrderRepr::Pairs(index.entries)
        }
    }
}

// ============================================================================
// LABEL MAP
// ============================================================================

/// Raw value -> display label mapping.
///
/// Serialized as a list of `[raw, label]` pairs since raw values are not
/// necessarily strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<(Value, Value)>", into = "Vec<(Value, Value)>")]
pub struct LabelMap {
    entries: Vec<(Value, Value)>,
    lookup: FxHashMap<Value, usize>,
}

impl LabelMap {
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut map = LabelMap::default();
        for (raw, label) in pairs {
            let raw = raw.into();
            if map.lookup.contains_key(&raw) {
                return Err(ReportError::DuplicateLabel { label: raw });
            }
            map.push(raw, label.into());
        }
        Ok(map)
    }

    fn push(&mut self, raw: Value, label: Value) {
        self.lookup.insert(raw.clone(), self.entries.len());
        self.entries.push((raw, label));
    }

    pub fn get(&self, raw: &Value) -> Option<&Value> {
        self.lookup.get(raw).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, raw: &Value) -> bool {
        self.lookup.contains_key(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Value, Value)] {
        &self.entries
    }

    /// Distinct display labels in map order.
    pub fn labels(&self) -> Vec<Value> {
        let mut labels: Vec<Value> = Vec::with_capacity(self.entries.len());
        for (_, label) in &self.entries {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        labels
    }

    /// Label -> raw value map. Fails if two raw values share a label.
    pub fn invert(&self) -> Result<LabelMap> {
        let mut inverse = LabelMap::default();
        for (raw, label) in &self.entries {
            if let Some(first) = inverse.get(label) {
                return Err(ReportError::AmbiguousReverseMapping {
                    label: label.clone(),
                    first: first.clone(),
                    second: raw.clone(),
                });
            }
            inverse.push(label.clone(), raw.clone());
        }
        Ok(inverse)
    }
}

impl PartialEq for LabelMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TryFrom<Vec<(Value, Value)>> for LabelMap {
    type Error = ReportError;

    fn try_from(pairs: Vec<(Value, Value)>) -> Result<Self> {
        LabelMap::from_pairs(pairs)
    }
}

impl From<LabelMap> for Vec<(Value, Value)> {
    fn from(map: LabelMap) -> Self {
        map.entries
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Builds a label -> position map from labels in their desired order.
pub fn build_order_index<I>(ordered_labels: I) -> Result<OrderIndex>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    OrderIndex::from_labels(ordered_labels)
}

/// Zips raw data values with display labels, position by position.
pub fn build_value_to_label_map<R, L>(raw_values: R, labels: L) -> Result<LabelMap>
where
    R: IntoIterator,
    R::Item: Into<Value>,
    L: IntoIterator,
    L::Item: Into<Value>,
{
    let raw: Vec<Value> = raw_values.into_iter().map(Into::into).collect();
    let labels: Vec<Value> = labels.into_iter().map(Into::into).collect();
    if raw.len() != labels.len() {
        return Err(ReportError::LengthMismatch {
            what: "relabel values and labels".to_string(),
            expected: raw.len(),
            found: labels.len(),
        });
    }
    LabelMap::from_pairs(raw.into_iter().zip(labels))
}
