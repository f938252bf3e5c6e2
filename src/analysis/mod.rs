//! Aggregation engine.
//!
//! Every analysis is a pure function over a [`NormalizedTable`], expressed
//! as polars queries over the table's frame: nothing is cached and nothing
//! is mutated, so calling the same analysis twice yields identical results.
//! Empty tables produce empty results. Groupings are emitted in sorted key
//! order.

pub mod correlation;
pub mod menu;
pub mod search;
pub mod segments;
pub mod stores;
pub mod summary;
pub mod trends;

pub use correlation::{correlation, CorrelationAnalysis};
pub use menu::{menu_performance, MenuPerformance};
pub use search::search;
pub use segments::{segment_performance, SegmentAnalysis};
pub use stores::{store_performance, StoreAnalysis};
pub use summary::summarize;
pub use trends::{trends, SalesTrends};

use crate::data::frame;
use crate::error::Result;
use crate::models::{ItemQuantity, NormalizedTable};
use polars::prelude::*;
use tracing::warn;

/// Limits and thresholds for the ranking-style analyses.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    /// Length of the top-performers list.
    pub top_items: usize,
    /// Length of the low-performers list.
    pub bottom_items: usize,
    /// Best sellers listed in the data summary.
    pub summary_top_items: usize,
    /// Best sellers listed per store.
    pub store_top_items: usize,
    /// Items above this revenue quantile are high performers.
    pub high_performer_quantile: f64,
    /// Items below this revenue quantile are low performers.
    pub low_performer_quantile: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_items: 10,
            bottom_items: 5,
            summary_top_items: 5,
            store_top_items: 5,
            high_performer_quantile: 0.8,
            low_performer_quantile: 0.2,
        }
    }
}

impl From<&crate::config::AnalysisConfig> for AnalysisOptions {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            top_items: config.top_items,
            bottom_items: config.bottom_items,
            summary_top_items: config.summary_top_items,
            store_top_items: config.store_top_items,
            high_performer_quantile: config.high_performer_quantile,
            low_performer_quantile: config.low_performer_quantile,
        }
    }
}

/// The five analyses that can be run, exported and explained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnalysisKind {
    Trends,
    Menu,
    Segments,
    Stores,
    Correlation,
}

impl AnalysisKind {
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisKind::Trends => "Sales Trends",
            AnalysisKind::Menu => "Menu Performance",
            AnalysisKind::Segments => "Customer Segments",
            AnalysisKind::Stores => "Store Performance",
            AnalysisKind::Correlation => "Price-Quantity Correlation",
        }
    }
}

/// Run one analysis and return its result as JSON.
pub fn analysis_json(
    kind: AnalysisKind,
    table: &NormalizedTable,
    options: &AnalysisOptions,
) -> Result<serde_json::Value> {
    if table.is_empty() {
        warn!("{} requested on an empty table", kind.title());
    }

    let value = match kind {
        AnalysisKind::Trends => serde_json::to_value(trends(table)?)?,
        AnalysisKind::Menu => serde_json::to_value(menu_performance(table, options)?)?,
        AnalysisKind::Segments => serde_json::to_value(segment_performance(table)?)?,
        AnalysisKind::Stores => serde_json::to_value(store_performance(table, options)?)?,
        AnalysisKind::Correlation => serde_json::to_value(correlation(table)?)?,
    };
    Ok(value)
}

/// Sort grouped output by its key columns, ascending.
pub(crate) fn sorted_by(frame: LazyFrame, keys: &[&str]) -> LazyFrame {
    frame.sort_by_exprs(
        keys.iter().map(|k| col(k)).collect::<Vec<_>>(),
        SortMultipleOptions::default(),
    )
}

/// Items with the highest summed quantity, largest first; ties by name.
pub(crate) fn top_items_by_qty(rows: LazyFrame, n: usize) -> PolarsResult<Vec<ItemQuantity>> {
    let totals = rows
        .group_by([col(frame::MENU_ITEM)])
        .agg([col(frame::QTY).sum().alias(frame::QTY)])
        .sort_by_exprs(
            [col(frame::QTY), col(frame::MENU_ITEM)],
            SortMultipleOptions {
                descending: vec![true, false],
                ..Default::default()
            },
        )
        .limit(n as IdxSize)
        .collect()?;

    let items = frame::strings(&totals, frame::MENU_ITEM)?
        .into_iter()
        .zip(frame::integers(&totals, frame::QTY)?)
        .map(|(menu_item, qty)| ItemQuantity { menu_item, qty })
        .collect();
    Ok(items)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_sorted_by_orders_keys() {
        let table = sample();
        let grouped = sorted_by(
            table
                .lazy()
                .group_by([col(frame::STORE)])
                .agg([len().alias("rows")]),
            &[frame::STORE],
        )
        .collect()
        .unwrap();

        assert_eq!(
            frame::strings(&grouped, frame::STORE).unwrap(),
            vec!["Store A", "Store B", "Store C"]
        );
        assert_eq!(frame::integers(&grouped, "rows").unwrap().iter().sum::<i64>(), 20);
    }

    #[test]
    fn test_top_items_by_qty_breaks_ties_by_name() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,A,Teh,1000,4,Regular\n\
                   2024-01-15,A,Kopi,1000,4,Regular\n\
                   2024-01-16,A,Roti,1000,9,Regular\n";
        let table = table_from(csv);

        let top = top_items_by_qty(table.lazy(), 2).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].menu_item, "Roti");
        assert_eq!(top[1].menu_item, "Kopi");
    }

    #[test]
    fn test_analysis_json_per_kind() {
        let table = scenario();
        let options = AnalysisOptions::default();

        let json = analysis_json(AnalysisKind::Trends, &table, &options).unwrap();
        assert_eq!(json["daily_trends"][0]["revenue"], 163000.0);

        let json = analysis_json(AnalysisKind::Menu, &table, &options).unwrap();
        assert_eq!(json["top_performers"][0]["menu_item"], "Nasi Goreng");
        assert_eq!(
            json["menu_performance"][0]["performance_category"],
            "Average"
        );

        let json = analysis_json(AnalysisKind::Stores, &table, &options).unwrap();
        assert!(json["store_popular_items"]["Store A"].is_array());

        let json = analysis_json(AnalysisKind::Correlation, &empty(), &options).unwrap();
        assert!(json["correlation_matrix"]["variables"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_analysis_options_defaults() {
        let options = AnalysisOptions::default();
        assert_eq!(options.top_items, 10);
        assert_eq!(options.bottom_items, 5);
        assert_eq!(options.high_performer_quantile, 0.8);
    }
}
