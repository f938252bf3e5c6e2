//! Headline data summary.

use crate::analysis::{sorted_by, top_items_by_qty, AnalysisOptions};
use crate::data::frame::{self, dates, first_float, first_integer, floats, strings};
use crate::error::Result;
use crate::models::{DataSummary, DateRange, NormalizedTable};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::warn;

/// Compute the [`DataSummary`] snapshot for a table.
pub fn summarize(table: &NormalizedTable, options: &AnalysisOptions) -> Result<DataSummary> {
    if table.is_empty() {
        warn!("Summarizing an empty table");
        return Ok(DataSummary::default());
    }

    let totals = table
        .lazy()
        .select([
            col(frame::DATE).min().alias("first_date"),
            col(frame::DATE).max().alias("last_date"),
            col(frame::REVENUE).sum().alias("total_revenue"),
            col(frame::QTY).sum().alias("total_qty"),
            col(frame::REVENUE).mean().alias("avg_transaction_value"),
            col(frame::MENU_ITEM).n_unique().alias("unique_menu_items"),
        ])
        .collect()?;

    let first = dates(&totals, "first_date")?;
    let last = dates(&totals, "last_date")?;
    let date_range = first
        .first()
        .zip(last.first())
        .map(|(start, end)| DateRange {
            start: *start,
            end: *end,
        });

    let revenue_by_store = revenue_by(table, frame::STORE)?;
    let revenue_by_segment = revenue_by(table, frame::SEGMENT)?;

    Ok(DataSummary {
        total_records: table.len(),
        date_range,
        total_revenue: first_float(&totals, "total_revenue")?.unwrap_or_default(),
        total_qty_sold: first_integer(&totals, "total_qty")?,
        avg_transaction_value: first_float(&totals, "avg_transaction_value")?.unwrap_or_default(),
        stores: revenue_by_store.keys().cloned().collect(),
        customer_segments: revenue_by_segment.keys().cloned().collect(),
        unique_menu_items: first_integer(&totals, "unique_menu_items")?.max(0) as usize,
        top_selling_items: top_items_by_qty(table.lazy(), options.summary_top_items)?,
        revenue_by_store,
        revenue_by_segment,
        outlier_count: table.outlier_count(),
        rows_without_avg_price: table.warnings().len(),
    })
}

/// Revenue summed per distinct value of `key`.
fn revenue_by(table: &NormalizedTable, key: &str) -> Result<BTreeMap<String, f64>> {
    let grouped = sorted_by(
        table
            .lazy()
            .group_by([col(key)])
            .agg([col(frame::REVENUE).sum()]),
        &[key],
    )
    .collect()?;

    let totals = strings(&grouped, key)?
        .into_iter()
        .zip(floats(&grouped, frame::REVENUE)?)
        .map(|(name, revenue)| (name, revenue.unwrap_or_default()))
        .collect();
    Ok(totals)
}
