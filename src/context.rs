//! Plain-text dataset context for language-model prompts.
//!
//! The output depends only on the [`DataSummary`]: every collection in it is
//! already sorted, so the same summary always renders to the same text.

use crate::models::{DataSummary, NormalizedTable};
use serde::Serialize;

/// Currency prefix used when none is configured.
pub const DEFAULT_CURRENCY: &str = "Rp";

/// Returned instead of a context block when no rows are loaded.
pub const NO_DATA: &str = "No data loaded";

/// Build the dataset context with the default currency.
pub fn build_llm_context(summary: &DataSummary, table: &NormalizedTable) -> String {
    build_llm_context_with(summary, table, DEFAULT_CURRENCY)
}

pub fn build_llm_context_with(
    summary: &DataSummary,
    table: &NormalizedTable,
    currency: &str,
) -> String {
    if table.is_empty() {
        return NO_DATA.to_string();
    }

    let mut out = String::new();

    out.push_str("DATASET SUMMARY:\n");
    out.push_str(&format!("- Total Records: {}\n", summary.total_records));
    if let Some(range) = summary.date_range {
        out.push_str(&format!("- Date Range: {} to {}\n", range.start, range.end));
    }
    out.push_str(&format!(
        "- Total Revenue: {}\n",
        format_currency(summary.total_revenue, currency)
    ));
    out.push_str(&format!("- Total Items Sold: {}\n", summary.total_qty_sold));
    out.push_str(&format!(
        "- Average Transaction: {}\n",
        format_currency(summary.avg_transaction_value, currency)
    ));
    out.push('\n');

    out.push_str(&format!("STORES: {}\n", summary.stores.join(", ")));
    out.push_str(&format!(
        "CUSTOMER SEGMENTS: {}\n",
        summary.customer_segments.join(", ")
    ));
    out.push_str(&format!("UNIQUE MENU ITEMS: {}\n", summary.unique_menu_items));
    out.push('\n');

    push_block(&mut out, "TOP SELLING ITEMS", &summary.top_selling_items);
    push_block(&mut out, "REVENUE BY STORE", &summary.revenue_by_store);
    push_block(&mut out, "REVENUE BY SEGMENT", &summary.revenue_by_segment);

    out.truncate(out.trim_end().len());
    out
}

fn push_block<T: Serialize>(out: &mut String, title: &str, value: &T) {
    out.push_str(title);
    out.push_str(":\n");
    out.push_str(&serde_json::to_string_pretty(value).unwrap_or_default());
    out.push_str("\n\n");
}

/// Format an amount as `<currency> 1,234,567`, rounded to whole units.
pub fn format_currency(amount: f64, currency: &str) -> String {
    format!("{} {}", currency, group_thousands(amount.round() as i64))
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;
    use crate::analysis::{summarize, AnalysisOptions};

    fn context_for(table: &NormalizedTable) -> String {
        let summary = summarize(table, &AnalysisOptions::default()).unwrap();
        build_llm_context(&summary, table)
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(2_090_500), "2,090,500");
        assert_eq!(group_thousands(-45000), "-45,000");
    }

    #[test]
    fn test_format_currency_rounds() {
        assert_eq!(format_currency(59333.33, "Rp"), "Rp 59,333");
        assert_eq!(format_currency(178000.0, "$"), "$ 178,000");
    }

    #[test]
    fn test_context_sections_in_order() {
        let context = context_for(&scenario());
        assert!(context.starts_with("DATASET SUMMARY"));
        assert!(context.contains("Total Records: 3"));
        assert!(context.contains("Date Range: 2024-01-15 to 2024-01-16"));
        assert!(context.contains("Total Revenue: Rp 178,000"));
        assert!(context.contains("STORES: Store A, Store B"));
        assert!(context.contains("CUSTOMER SEGMENTS: Budget, Premium, Regular"));

        let order = [
            "Total Records",
            "Date Range",
            "Total Revenue",
            "Total Items Sold",
            "Average Transaction",
            "STORES",
            "CUSTOMER SEGMENTS",
            "UNIQUE MENU ITEMS",
            "TOP SELLING ITEMS",
            "REVENUE BY STORE",
            "REVENUE BY SEGMENT",
        ];
        let positions: Vec<usize> = order.iter().map(|s| context.find(s).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_context_is_deterministic() {
        let table = sample();
        assert_eq!(context_for(&table), context_for(&table));
    }

    #[test]
    fn test_top_items_block_is_json() {
        let context = context_for(&scenario());
        let start = context.find("TOP SELLING ITEMS:\n").unwrap() + "TOP SELLING ITEMS:\n".len();
        let end = context.find("\n\nREVENUE BY STORE").unwrap();
        let items: Vec<serde_json::Value> = serde_json::from_str(&context[start..end]).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["menu_item"], "Es Teh");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(context_for(&empty()), NO_DATA);
    }
}
