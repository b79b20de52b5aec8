//! FILENAME: core/report-engine/src/relabel.rs
//! Relabel/Reorder-Column Step.
//!
//! Prepares the column that becomes the pivoted header. Raw values are
//! optionally mapped to display labels, and display labels optionally to
//! order positions. With an order map the working column holds the integer
//! position, which is what the grouping and pivot primitives sort by; the
//! `HeaderEncoding` remembers how to turn positions back into labels once
//! the reshape is done.

use rustc_hash::FxHashMap;
use table_engine::{Column, ColumnKind, Table, Value};

use crate::error::{ReportError, Result};
use crate::labels::{LabelMap, OrderIndex};
use crate::log_debug;

/// How the working pivot column was derived from the raw one.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderEncoding {
    column: String,
    relabel: Option<LabelMap>,
    order: Option<OrderIndex>,
    /// Position -> display label, present when ordered.
    decode: Option<LabelMap>,
}

impl HeaderEncoding {
    /// Encoding of a column used as-is.
    pub fn raw(column: impl Into<String>) -> Self {
        HeaderEncoding {
            column: column.into(),
            relabel: None,
            order: None,
            decode: None,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    pub fn is_relabeled(&self) -> bool {
        self.relabel.is_some()
    }

    /// Display label for a raw value.
    fn display_label(&self, raw: &Value) -> Result<Value> {
        match &self.relabel {
            Some(map) => map.get(raw).cloned().ok_or_else(|| ReportError::UnknownLabel {
                column: self.column.clone(),
                value: raw.clone(),
            }),
            None => Ok(raw.clone()),
        }
    }

    /// Working value for a raw value. Nulls stay null.
    pub fn encode(&self, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        let label = self.display_label(raw)?;
        match &self.order {
            Some(order) => order.position(&label).map(Value::from).ok_or_else(|| ReportError::UnknownLabel {
                column: self.column.clone(),
                value: label,
            }),
            None => Ok(label),
        }
    }

    /// Display label for a working value. Only order positions are mapped
    /// back; relabeled values already are display labels.
    pub fn decode(&self, working: &Value) -> Value {
        self.decode
            .as_ref()
            .and_then(|map| map.get(working))
            .cloned()
            .unwrap_or_else(|| working.clone())
    }

    /// The full working domain in display order: every order position when
    /// ordered, every display label in map order when only relabeled.
    pub fn working_domain(&self) -> Option<Vec<Value>> {
        if let Some(order) = &self.order {
            return Some(order.positions_in_order().into_iter().map(Value::from).collect());
        }
        self.relabel.as_ref().map(LabelMap::labels)
    }
}

/// Replaces `column` with its working encoding.
///
/// Fails with `UnknownLabel` when a present value has no relabel or order
/// entry, and with `AmbiguousReverseMapping` when two present values would
/// share a display label (or two present labels share an order position).
pub fn apply_column_relabel_and_order(
    table: &Table,
    column: &str,
    relabel_map: Option<&LabelMap>,
    order_map: Option<&OrderIndex>,
) -> Result<(Table, HeaderEncoding)> {
    let mut encoding = HeaderEncoding::raw(column);
    if relabel_map.is_none() && order_map.is_none() {
        table.column(column)?;
        return Ok((table.clone(), encoding));
    }
    encoding.relabel = relabel_map.cloned();
    encoding.order = order_map.cloned();

    let source = table.column(column)?;
    let mut label_sources: FxHashMap<Value, Value> = FxHashMap::default();
    let mut position_labels: FxHashMap<Value, Value> = FxHashMap::default();
    let mut working = Vec::with_capacity(source.len());
    for raw in source.values() {
        if raw.is_null() {
            working.push(Value::Null);
            continue;
        }
        let label = encoding.display_label(raw)?;
        check_unique(&mut label_sources, &label, raw)?;
        let code = encoding.encode(raw)?;
        if encoding.is_ordered() {
            check_unique(&mut position_labels, &code, &label)?;
        }
        working.push(code);
    }

    if let Some(order) = order_map {
        // First label listed for a position wins for positions not in the data
        let mut decode: Vec<(Value, Value)> = position_labels.into_iter().collect();
        for (label, pos) in order.entries() {
            let code = Value::from(*pos);
            if !decode.iter().any(|(c, _)| *c == code) {
                decode.push((code, label.clone()));
            }
        }
        decode.sort_by(|a, b| a.0.compare(&b.0));
        encoding.decode = Some(LabelMap::from_pairs(decode)?);
    }

    log_debug!(
        "RELABEL",
        "{}: relabel={} order={} rows={}",
        column,
        encoding.is_relabeled(),
        encoding.is_ordered(),
        working.len()
    );

    let replaced = Column::from_key(source.key().clone(), ColumnKind::Label, working);
    Ok((table.with_column(replaced)?, encoding))
}

/// Records `image <- source`, failing if `image` already came from elsewhere.
fn check_unique(seen: &mut FxHashMap<Value, Value>, image: &Value, source: &Value) -> Result<()> {
    match seen.get(image) {
        Some(first) if first != source => Err(ReportError::AmbiguousReverseMapping {
            label: image.clone(),
            first: first.clone(),
            second: source.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            seen.insert(image.clone(), source.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{build_order_index, build_value_to_label_map};

    fn years() -> Table {
        Table::new(vec![
            Column::label("year", [Value::Int(2021), Value::Int(2019), Value::Null, Value::Int(2020)]),
            Column::numeric("n", [1, 2, 3, 4]),
        ])
        .unwrap()
    }

    fn fiscal() -> LabelMap {
        build_value_to_label_map([2019, 2020, 2021], ["FY19", "FY20", "FY21"]).unwrap()
    }

    #[test]
    fn test_no_maps_is_identity() {
        let (table, encoding) = apply_column_relabel_and_order(&years(), "year", None, None).unwrap();
        assert_eq!(table, years());
        assert_eq!(encoding.decode(&Value::Int(2019)), Value::Int(2019));
        assert!(encoding.working_domain().is_none());
    }

    #[test]
    fn test_relabel_only_keeps_display_labels() {
        let map = fiscal();
        let (table, encoding) = apply_column_relabel_and_order(&years(), "year", Some(&map), None).unwrap();
        assert_eq!(table.get(0, "year"), Some(&Value::text("FY21")));
        assert!(table.get(2, "year").unwrap().is_null());
        assert_eq!(encoding.decode(&Value::text("FY21")), Value::text("FY21"));
        assert_eq!(encoding.working_domain().map(|d| d.len()), Some(3));
    }

    #[test]
    fn test_order_replaces_working_column_with_positions() {
        let map = fiscal();
        let order = build_order_index(["FY21", "FY20", "FY19"]).unwrap();
        let (table, encoding) = apply_column_relabel_and_order(&years(), "year", Some(&map), Some(&order)).unwrap();
        assert_eq!(table.get(0, "year"), Some(&Value::Int(0)));
        assert_eq!(table.get(1, "year"), Some(&Value::Int(2)));
        assert_eq!(encoding.decode(&Value::Int(2)), Value::text("FY19"));
        assert_eq!(encoding.encode(&Value::Int(2020)).unwrap(), Value::Int(1));
        assert_eq!(
            encoding.working_domain(),
            Some(vec![Value::Int(0), Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_order_without_relabel_uses_raw_values() {
        let order = build_order_index([2020, 2019, 2021]).unwrap();
        let (table, encoding) = apply_column_relabel_and_order(&years(), "year", None, Some(&order)).unwrap();
        assert_eq!(table.get(3, "year"), Some(&Value::Int(0)));
        assert_eq!(encoding.decode(&Value::Int(0)), Value::Int(2020));
    }

    #[test]
    fn test_unknown_labels_fail() {
        let partial = build_value_to_label_map([2019, 2020], ["FY19", "FY20"]).unwrap();
        let err = apply_column_relabel_and_order(&years(), "year", Some(&partial), None).unwrap_err();
        assert_eq!(
            err,
            ReportError::UnknownLabel {
                column: "year".to_string(),
                value: Value::Int(2021),
            }
        );

        let order = build_order_index(["FY19", "FY20"]).unwrap();
        let err = apply_column_relabel_and_order(&years(), "year", Some(&fiscal()), Some(&order)).unwrap_err();
        assert!(matches!(err, ReportError::UnknownLabel { value: Value::Text(_), .. }));
    }

    #[test]
    fn test_collisions_among_present_values_fail() {
        let merged = build_value_to_label_map([2019, 2020, 2021], ["early", "early", "late"]).unwrap();
        let err = apply_column_relabel_and_order(&years(), "year", Some(&merged), None).unwrap_err();
        assert!(matches!(err, ReportError::AmbiguousReverseMapping { .. }));

        let shared = OrderIndex::from_pairs([("FY19", 0), ("FY20", 0), ("FY21", 1)]).unwrap();
        let err = apply_column_relabel_and_order(&years(), "year", Some(&fiscal()), Some(&shared)).unwrap_err();
        assert!(matches!(err, ReportError::AmbiguousReverseMapping { .. }));
    }

    #[test]
    fn test_collisions_among_absent_values_are_allowed() {
        let map = build_value_to_label_map([2019, 2020, 2021, 1999, 1998], ["FY19", "FY20", "FY21", "old", "old"]).unwrap();
        assert!(apply_column_relabel_and_order(&years(), "year", Some(&map), None).is_ok());
    }
}
