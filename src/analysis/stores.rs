//! Store (outlet) performance.

use crate::analysis::{sorted_by, top_items_by_qty, AnalysisOptions};
use crate::data::frame::{self, first_integer, floats, integers, strings};
use crate::data::stats::round_to;
use crate::error::Result;
use crate::models::{ItemQuantity, NormalizedTable};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregates for one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorePerformance {
    pub store: String,
    pub total_revenue: f64,
    pub avg_revenue_per_transaction: f64,
    pub transaction_count: usize,
    pub total_qty_sold: i64,
    pub avg_qty_per_transaction: f64,
    /// Distinct menu items sold at this store.
    pub menu_variety: usize,
    /// Total revenue over the number of distinct dates in the whole table.
    pub revenue_per_day: f64,
    /// Total revenue per transaction.
    pub efficiency_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreAnalysis {
    pub store_performance: Vec<StorePerformance>,
    /// Best sellers by quantity within each store.
    pub store_popular_items: BTreeMap<String, Vec<ItemQuantity>>,
}

pub fn store_performance(
    table: &NormalizedTable,
    options: &AnalysisOptions,
) -> Result<StoreAnalysis> {
    if table.is_empty() {
        return Ok(StoreAnalysis::default());
    }

    let trading_days = first_integer(
        &table
            .lazy()
            .select([col(frame::DATE).n_unique().alias("days")])
            .collect()?,
        "days",
    )?
    .max(1);

    let grouped = sorted_by(
        table.lazy().group_by([col(frame::STORE)]).agg([
            col(frame::REVENUE).sum().alias("total_revenue"),
            col(frame::REVENUE).mean().alias("avg_revenue"),
            len().alias("transaction_count"),
            col(frame::QTY).sum().alias("total_qty"),
            col(frame::QTY).cast(DataType::Float64).mean().alias("avg_qty"),
            col(frame::MENU_ITEM).n_unique().alias("menu_variety"),
        ]),
        &[frame::STORE],
    )
    .collect()?;

    let names = strings(&grouped, frame::STORE)?;
    let totals = floats(&grouped, "total_revenue")?;
    let mean_revenue = floats(&grouped, "avg_revenue")?;
    let counts = integers(&grouped, "transaction_count")?;
    let quantities = integers(&grouped, "total_qty")?;
    let mean_qty = floats(&grouped, "avg_qty")?;
    let varieties = integers(&grouped, "menu_variety")?;

    let mut store_performance = Vec::with_capacity(names.len());
    let mut store_popular_items = BTreeMap::new();

    for (i, store) in names.into_iter().enumerate() {
        let transaction_count = counts[i].max(1) as usize;
        let total_revenue = round_to(totals[i].unwrap_or_default(), 2);

        let store_rows = table.lazy().filter(col(frame::STORE).eq(lit(store.as_str())));
        let popular = top_items_by_qty(store_rows, options.store_top_items)?;

        store_performance.push(StorePerformance {
            store: store.clone(),
            total_revenue,
            avg_revenue_per_transaction: round_to(mean_revenue[i].unwrap_or_default(), 2),
            transaction_count,
            total_qty_sold: quantities[i],
            avg_qty_per_transaction: round_to(mean_qty[i].unwrap_or_default(), 2),
            menu_variety: varieties[i].max(0) as usize,
            revenue_per_day: total_revenue / trading_days as f64,
            efficiency_score: round_to(total_revenue / transaction_count as f64, 2),
        });
        store_popular_items.insert(store, popular);
    }

    Ok(StoreAnalysis {
        store_performance,
        store_popular_items,
    })
}
