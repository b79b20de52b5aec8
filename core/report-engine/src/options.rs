//! FILENAME: core/report-engine/src/options.rs
//! Report Options - the optional knobs shared by every recipe.
//!
//! Every knob is absent by default; recipes ignore the knobs that do not
//! apply to their layout. Options are serializable so report definitions
//! can be stored next to the data they describe.

use serde::{Deserialize, Serialize};
use table_engine::Value;

use crate::error::Result;
use crate::labels::{LabelMap, OrderIndex};

// ============================================================================
// NULL FILL
// ============================================================================

/// Which result columns get missing aggregate results replaced by zero.
///
/// In JSON: `false` for none, `true` for all, or a list of column labels.
/// A label selects every column with that label on any header level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NullFillRepr", into = "NullFillRepr")]
pub enum NullFill {
    None,
    Columns(Vec<Value>),
    All,
}

impl Default for NullFill {
    fn default() -> Self {
        NullFill::None
    }
}

impl NullFill {
    pub fn is_none(&self) -> bool {
        matches!(self, NullFill::None)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NullFillRepr {
    Flag(bool),
    Columns(Vec<Value>),
}

impl From<NullFillRepr> for NullFill {
    fn from(repr: NullFillRepr) -> Self {
        match repr {
            NullFillRepr::Flag(true) => NullFill::All,
            NullFillRepr::Flag(false) => NullFill::None,
            NullFillRepr::Columns(labels) => NullFill::Columns(labels),
        }
    }
}

impl From<NullFill> for NullFillRepr {
    fn from(fill: NullFill) -> Self {
        match fill {
            NullFill::None => NullFillRepr::Flag(false),
            NullFill::All => NullFillRepr::Flag(true),
            NullFill::Columns(labels) => NullFillRepr::Columns(labels),
        }
    }
}

// ============================================================================
// REPORT OPTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    /// Raw pivot-column value -> display label.
    #[serde(default)]
    pub relabel_map: Option<LabelMap>,

    /// Display label (or raw value, without a relabel map) -> header position.
    #[serde(default)]
    pub order_map: Option<OrderIndex>,

    /// Raw pivot-column values that dense recipes must always report,
    /// in display order.
    #[serde(default)]
    pub column_domain: Option<Vec<Value>>,

    /// Per row-index level: raw label -> display label.
    #[serde(default)]
    pub index_relabel_maps: Vec<Option<LabelMap>>,

    /// Per row-index level: display label order.
    #[serde(default)]
    pub index_order_lists: Vec<Option<OrderIndex>>,

    /// Display names for the row-index levels.
    #[serde(default)]
    pub index_names: Option<Vec<String>>,

    /// Display names for the value fields (or, in `simple_groupby`, for the
    /// result columns), positionally.
    #[serde(default)]
    pub stats_names: Option<Vec<String>>,

    #[serde(default)]
    pub null_to_zero: NullFill,

    /// Normalize every row group to proportions before reshaping.
    #[serde(default)]
    pub percent_of_group: bool,

    /// Apply the row order lists. When false, rows keep the reshape order.
    #[serde(default = "default_true")]
    pub reorder_rows: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            relabel_map: None,
            order_map: None,
            column_domain: None,
            index_relabel_maps: Vec::new(),
            index_order_lists: Vec::new(),
            index_names: None,
            stats_names: None,
            null_to_zero: NullFill::None,
            percent_of_group: false,
            reorder_rows: true,
        }
    }
}

impl ReportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn index_relabel_map(&self, level: usize) -> Option<&LabelMap> {
        self.index_relabel_maps.get(level).and_then(Option::as_ref)
    }

    pub fn index_order_list(&self, level: usize) -> Option<&OrderIndex> {
        self.index_order_lists.get(level).and_then(Option::as_ref)
    }

    pub fn with_relabel_map(mut self, map: LabelMap) -> Self {
        self.relabel_map = Some(map);
        self
    }

    pub fn with_order_map(mut self, order: OrderIndex) -> Self {
        self.order_map = Some(order);
        self
    }

    pub fn with_column_domain<I>(mut self, domain: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.column_domain = Some(domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_index_relabel_map(mut self, level: usize, map: LabelMap) -> Self {
        if self.index_relabel_maps.len() <= level {
            self.index_relabel_maps.resize(level + 1, None);
        }
        self.index_relabel_maps[level] = Some(map);
        self
    }

    pub fn with_index_order_list(mut self, level: usize, order: OrderIndex) -> Self {
        if self.index_order_lists.len() <= level {
            self.index_order_lists.resize(level + 1, None);
        }
        self.index_order_lists[level] = Some(order);
        self
    }

    pub fn with_index_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_stats_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stats_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_null_to_zero(mut self, fill: NullFill) -> Self {
        self.null_to_zero = fill;
        self
    }

    pub fn with_percent_of_group(mut self, percent: bool) -> Self {
        self.percent_of_group = percent;
        self
    }

    pub fn with_reorder_rows(mut self, reorder: bool) -> Self {
        self.reorder_rows = reorder;
        self
    }
}
