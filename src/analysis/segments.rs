//! Customer segment performance.

use crate::analysis::sorted_by;
use crate::data::frame::{self, first_float, floats, integers, strings};
use crate::data::stats::{describe_exprs, read_describes, round_to, Describe};
use crate::error::Result;
use crate::models::NormalizedTable;
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregates for one customer segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentPerformance {
    pub customer_segment: String,
    pub total_revenue: f64,
    pub avg_revenue_per_transaction: f64,
    pub transaction_count: usize,
    pub total_qty: i64,
    pub avg_qty_per_transaction: f64,
    pub avg_price_per_item: Option<f64>,
    /// Percentage of the table's total revenue.
    pub revenue_share: f64,
    pub customer_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SegmentAnalysis {
    pub segment_performance: Vec<SegmentPerformance>,
    /// Distribution of `avg_price` per segment (defined prices only).
    pub segment_comparison: BTreeMap<String, Describe>,
}

pub fn segment_performance(table: &NormalizedTable) -> Result<SegmentAnalysis> {
    if table.is_empty() {
        return Ok(SegmentAnalysis::default());
    }

    let mut aggregations = vec![
        col(frame::REVENUE).sum().alias("total_revenue"),
        col(frame::REVENUE).mean().alias("avg_revenue"),
        len().alias("transaction_count"),
        col(frame::QTY).sum().alias("total_qty"),
        col(frame::QTY).cast(DataType::Float64).mean().alias("avg_qty"),
        col(frame::AVG_PRICE).mean().alias("avg_price"),
    ];
    aggregations.extend(describe_exprs(frame::AVG_PRICE));

    let grouped = sorted_by(
        table
            .lazy()
            .group_by([col(frame::SEGMENT)])
            .agg(aggregations),
        &[frame::SEGMENT],
    )
    .collect()?;

    let grand_total = first_float(
        &table.lazy().select([col(frame::REVENUE).sum()]).collect()?,
        frame::REVENUE,
    )?
    .unwrap_or_default();

    let names = strings(&grouped, frame::SEGMENT)?;
    let totals = floats(&grouped, "total_revenue")?;
    let mean_revenue = floats(&grouped, "avg_revenue")?;
    let counts = integers(&grouped, "transaction_count")?;
    let quantities = integers(&grouped, "total_qty")?;
    let mean_qty = floats(&grouped, "avg_qty")?;
    let prices = floats(&grouped, "avg_price")?;
    let describes = read_describes(&grouped, frame::AVG_PRICE)?;

    let mut segment_performance = Vec::with_capacity(names.len());
    let mut segment_comparison = BTreeMap::new();

    for (i, (segment, describe)) in names.into_iter().zip(describes).enumerate() {
        let transaction_count = counts[i].max(1) as usize;
        let total_revenue = round_to(totals[i].unwrap_or_default(), 2);

        let revenue_share = if grand_total > 0.0 {
            round_to(total_revenue / grand_total * 100.0, 2)
        } else {
            0.0
        };

        segment_performance.push(SegmentPerformance {
            customer_segment: segment.clone(),
            total_revenue,
            avg_revenue_per_transaction: round_to(mean_revenue[i].unwrap_or_default(), 2),
            transaction_count,
            total_qty: quantities[i],
            avg_qty_per_transaction: round_to(mean_qty[i].unwrap_or_default(), 2),
            avg_price_per_item: prices[i].map(|p| round_to(p, 2)),
            revenue_share,
            customer_value: total_revenue / transaction_count as f64,
        });
        segment_comparison.insert(segment, describe);
    }

    Ok(SegmentAnalysis {
        segment_performance,
        segment_comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;

    #[test]
    fn test_revenue_share_sums_to_hundred() {
        for table in [scenario(), sample()] {
            let result = segment_performance(&table).unwrap();
            let share: f64 = result.segment_performance.iter().map(|s| s.revenue_share).sum();
            assert!((share - 100.0).abs() < 0.05, "share was {share}");
        }
    }

    #[test]
    fn test_segment_metrics() {
        let result = segment_performance(&sample()).unwrap();
        let names: Vec<_> = result
            .segment_performance
            .iter()
            .map(|s| s.customer_segment.as_str())
            .collect();
        assert_eq!(names, vec!["Budget", "Premium", "Regular"]);

        // Budget: 15000 + 12000 + 68000 + 24000 + 18000 + 9000
        let budget = &result.segment_performance[0];
        assert_eq!(budget.transaction_count, 6);
        assert_eq!(budget.total_revenue, 146000.0);
        assert_eq!(budget.total_qty, 42);
        assert_eq!(budget.avg_qty_per_transaction, 7.0);
        assert!((budget.customer_value - 24333.333).abs() < 0.001);
    }

    #[test]
    fn test_segment_comparison_describe() {
        let result = segment_performance(&scenario()).unwrap();
        let premium = &result.segment_comparison["Premium"];
        assert_eq!(premium.count, 1);
        assert_eq!(premium.mean, Some(19500.0));
        assert_eq!(premium.std, None);
        assert_eq!(premium.max, Some(19500.0));
    }

    #[test]
    fn test_zero_qty_row_counts_in_sums_not_prices() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,A,Teh,6000,2,Regular\n\
                   2024-01-16,A,Teh,4000,0,Regular\n";
        let result = segment_performance(&table_from(csv)).unwrap();
        let regular = &result.segment_performance[0];

        assert_eq!(regular.total_revenue, 10000.0);
        assert_eq!(regular.transaction_count, 2);
        assert_eq!(regular.avg_price_per_item, Some(3000.0));
        assert_eq!(result.segment_comparison["Regular"].count, 1);
    }

    #[test]
    fn test_zero_revenue_table_has_zero_share() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,A,Teh,0,2,Regular\n";
        let result = segment_performance(&table_from(csv)).unwrap();
        assert_eq!(result.segment_performance[0].revenue_share, 0.0);
    }

    #[test]
    fn test_idempotent() {
        let table = sample();
        assert_eq!(
            segment_performance(&table).unwrap(),
            segment_performance(&table).unwrap()
        );
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(segment_performance(&empty()).unwrap(), SegmentAnalysis::default());
    }
}
