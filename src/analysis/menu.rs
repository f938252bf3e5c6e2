//! Menu item performance.
//!
//! Items are categorized against quantile thresholds computed once over the
//! per-item revenue totals of the current table. Comparisons are strict, so
//! an item sitting exactly on a threshold (including the single-item case,
//! where both thresholds equal its own total) is `Average`.

use crate::analysis::{sorted_by, AnalysisOptions};
use crate::data::frame::{self, floats, integers, strings};
use crate::data::stats::{quantiles, round_to};
use crate::error::Result;
use crate::models::NormalizedTable;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceCategory {
    #[serde(rename = "High Performer")]
    HighPerformer,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Low Performer")]
    LowPerformer,
}

impl fmt::Display for PerformanceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceCategory::HighPerformer => write!(f, "High Performer"),
            PerformanceCategory::Average => write!(f, "Average"),
            PerformanceCategory::LowPerformer => write!(f, "Low Performer"),
        }
    }
}

/// Aggregates for one menu item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItemPerformance {
    pub menu_item: String,
    pub total_revenue: f64,
    pub avg_revenue: f64,
    /// Number of transactions.
    pub frequency: usize,
    pub total_qty: i64,
    /// Mean of the defined `avg_price` values; `None` if none are defined.
    pub avg_price: Option<f64>,
    pub revenue_per_order: f64,
    /// Frequency relative to the most frequent item, 0-100.
    pub popularity_score: f64,
    pub performance_category: PerformanceCategory,
}

/// Compact entry for the top and bottom lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuRanking {
    pub menu_item: String,
    pub total_revenue: f64,
    pub total_qty: i64,
}

/// Revenue totals separating the performance categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceThresholds {
    pub high: f64,
    pub low: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuPerformance {
    /// One entry per item, alphabetical.
    pub menu_performance: Vec<MenuItemPerformance>,
    /// Highest total revenue first.
    pub top_performers: Vec<MenuRanking>,
    /// Lowest total revenue first.
    pub low_performers: Vec<MenuRanking>,
    pub thresholds: Option<PerformanceThresholds>,
}

impl MenuPerformance {
    pub fn count_in(&self, category: PerformanceCategory) -> usize {
        self.menu_performance
            .iter()
            .filter(|m| m.performance_category == category)
            .count()
    }
}

pub fn menu_performance(
    table: &NormalizedTable,
    options: &AnalysisOptions,
) -> Result<MenuPerformance> {
    if table.is_empty() {
        return Ok(MenuPerformance::default());
    }

    let grouped = sorted_by(
        table.lazy().group_by([col(frame::MENU_ITEM)]).agg([
            col(frame::REVENUE).sum().alias("total_revenue"),
            col(frame::REVENUE).mean().alias("avg_revenue"),
            len().alias("frequency"),
            col(frame::QTY).sum().alias("total_qty"),
            col(frame::AVG_PRICE).mean().alias("avg_price"),
        ]),
        &[frame::MENU_ITEM],
    )
    .collect()?;

    let thresholds = match quantiles(
        &grouped,
        "total_revenue",
        &[options.high_performer_quantile, options.low_performer_quantile],
    )?[..]
    {
        [Some(high), Some(low)] => Some(PerformanceThresholds { high, low }),
        _ => None,
    };
    debug!("Menu thresholds: {:?}", thresholds);

    let names = strings(&grouped, frame::MENU_ITEM)?;
    let totals = floats(&grouped, "total_revenue")?;
    let means = floats(&grouped, "avg_revenue")?;
    let frequencies = integers(&grouped, "frequency")?;
    let quantities = integers(&grouped, "total_qty")?;
    let prices = floats(&grouped, "avg_price")?;
    let max_frequency = frequencies.iter().copied().max().unwrap_or(1).max(1) as f64;

    let items: Vec<MenuItemPerformance> = names
        .into_iter()
        .enumerate()
        .map(|(i, menu_item)| {
            let raw_total = totals[i].unwrap_or_default();
            let total_revenue = round_to(raw_total, 2);
            let frequency = frequencies[i].max(1) as usize;

            MenuItemPerformance {
                menu_item,
                total_revenue,
                avg_revenue: round_to(means[i].unwrap_or_default(), 2),
                frequency,
                total_qty: quantities[i],
                avg_price: prices[i].map(|p| round_to(p, 2)),
                revenue_per_order: total_revenue / frequency as f64,
                popularity_score: 100.0 * frequency as f64 / max_frequency,
                performance_category: thresholds
                    .map_or(PerformanceCategory::Average, |t| categorize(raw_total, t)),
            }
        })
        .collect();

    let mut by_revenue: Vec<&MenuItemPerformance> = items.iter().collect();
    // Stable sort over alphabetical input: ties resolve by name.
    by_revenue.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));
    let top_performers = by_revenue
        .iter()
        .take(options.top_items)
        .map(|m| ranking(m))
        .collect();

    by_revenue.sort_by(|a, b| a.total_revenue.total_cmp(&b.total_revenue));
    let low_performers = by_revenue
        .iter()
        .take(options.bottom_items)
        .map(|m| ranking(m))
        .collect();

    Ok(MenuPerformance {
        menu_performance: items,
        top_performers,
        low_performers,
        thresholds,
    })
}

fn categorize(total_revenue: f64, thresholds: PerformanceThresholds) -> PerformanceCategory {
    if total_revenue > thresholds.high {
        PerformanceCategory::HighPerformer
    } else if total_revenue < thresholds.low {
        PerformanceCategory::LowPerformer
    } else {
        PerformanceCategory::Average
    }
}

fn ranking(item: &MenuItemPerformance) -> MenuRanking {
    MenuRanking {
        menu_item: item.menu_item.clone(),
        total_revenue: item.total_revenue,
        total_qty: item.total_qty,
    }
}
