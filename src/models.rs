//! Data models for the sales copilot.
//!
//! This module contains the core data structures shared by the
//! normalizer, the aggregation engine, and the report generators.

use crate::data::frame::build_frame;
use chrono::{NaiveDate, Weekday};
use polars::prelude::{DataFrame, IntoLazy, LazyFrame, PolarsResult};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Columns every input table must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "date",
    "store",
    "menu_item",
    "revenue",
    "qty",
    "customer_segment",
];

/// One row of the sales log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub store: String,
    pub menu_item: String,
    /// Non-negative amount in the dataset's currency unit.
    pub revenue: f64,
    pub qty: i64,
    pub customer_segment: String,
}

/// A sales record plus its derived columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    pub sales: SalesRecord,
    /// `revenue / qty`; `None` when `qty` is not positive.
    pub avg_price: Option<f64>,
    /// Calendar month, 1-12.
    pub month: u32,
    #[serde(serialize_with = "serialize_weekday")]
    pub day_of_week: Weekday,
    /// ISO week number.
    pub week: u32,
    /// Advisory flag; outliers are never removed.
    pub is_outlier: bool,
}

/// Revenue bounds outside which a row is flagged as an outlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, revenue: f64) -> bool {
        revenue >= self.lower && revenue <= self.upper
    }
}

/// Non-fatal condition raised while deriving columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationWarning {
    /// `avg_price` could not be computed because `qty` was not positive.
    AvgPriceNotComputable { row: usize, qty: i64 },
}

impl fmt::Display for ComputationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputationWarning::AvgPriceNotComputable { row, qty } => write!(
                f,
                "row {}: avg_price not computable (qty = {})",
                row, qty
            ),
        }
    }
}

/// The cleaned, derived-column-augmented table.
///
/// Built once per load by [`crate::data::normalize`] and read-only afterwards.
/// Rows are kept both as records and as a polars frame for aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTable {
    records: Vec<NormalizedRecord>,
    warnings: Vec<ComputationWarning>,
    outlier_bounds: Option<OutlierBounds>,
    #[serde(skip)]
    frame: DataFrame,
}

impl NormalizedTable {
    pub(crate) fn new(
        records: Vec<NormalizedRecord>,
        warnings: Vec<ComputationWarning>,
        outlier_bounds: Option<OutlierBounds>,
    ) -> PolarsResult<Self> {
        let frame = build_frame(&records)?;
        Ok(Self {
            records,
            warnings,
            outlier_bounds,
            frame,
        })
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// A lazy query over the rows.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    pub fn warnings(&self) -> &[ComputationWarning] {
        &self.warnings
    }

    pub fn outlier_bounds(&self) -> Option<OutlierBounds> {
        self.outlier_bounds
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn outlier_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_outlier).count()
    }
}

impl Default for NormalizedTable {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            warnings: Vec::new(),
            outlier_bounds: None,
            frame: DataFrame::empty(),
        }
    }
}

// The frame is derived from the records.
impl PartialEq for NormalizedTable {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
            && self.warnings == other.warnings
            && self.outlier_bounds == other.outlier_bounds
    }
}

/// First and last date in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Quantity sold for one menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub menu_item: String,
    pub qty: i64,
}

/// Headline snapshot computed once per load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    pub total_revenue: f64,
    pub total_qty_sold: i64,
    pub avg_transaction_value: f64,
    /// Distinct store labels, sorted.
    pub stores: Vec<String>,
    /// Distinct customer segments, sorted.
    pub customer_segments: Vec<String>,
    pub unique_menu_items: usize,
    /// Best sellers by quantity, largest first.
    pub top_selling_items: Vec<ItemQuantity>,
    pub revenue_by_store: BTreeMap<String, f64>,
    pub revenue_by_segment: BTreeMap<String, f64>,
    pub outlier_count: usize,
    /// Rows whose `avg_price` could not be computed.
    pub rows_without_avg_price: usize,
}

/// Full English weekday name, e.g. "Monday".
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub(crate) fn serialize_weekday<S: Serializer>(
    day: &Weekday,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(weekday_name(*day))
}
