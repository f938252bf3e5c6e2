//! JSON exports and Markdown report generation.
//!
//! Two export documents are produced, each stamped with the time it was
//! generated: the data summary on its own, and the full report with every
//! analysis. The full report can also be rendered as Markdown.

use crate::analysis::menu::PerformanceCategory;
use crate::analysis::{
    correlation, menu_performance, segment_performance, store_performance, trends,
    AnalysisOptions, CorrelationAnalysis, MenuPerformance, SalesTrends, SegmentAnalysis,
    StoreAnalysis,
};
use crate::context::format_currency;
use crate::models::{weekday_name, DataSummary, NormalizedTable};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The data summary, timestamped.
#[derive(Debug, Clone, Serialize)]
pub struct DataSummaryExport {
    pub generated_at: DateTime<Utc>,
    pub data_summary: DataSummary,
}

impl DataSummaryExport {
    pub fn new(summary: &DataSummary) -> Self {
        Self {
            generated_at: Utc::now(),
            data_summary: summary.clone(),
        }
    }

    pub fn default_file_name(&self) -> String {
        timestamped_name("data_summary", self.generated_at, "json")
    }
}

/// The data summary plus every analysis, timestamped.
#[derive(Debug, Clone, Serialize)]
pub struct FullReportExport {
    pub generated_at: DateTime<Utc>,
    pub data_summary: DataSummary,
    pub sales_trends: SalesTrends,
    pub menu_performance: MenuPerformance,
    pub customer_segments: SegmentAnalysis,
    pub store_performance: StoreAnalysis,
    pub correlation_analysis: CorrelationAnalysis,
}

impl FullReportExport {
    /// Run all analyses over `table`.
    pub fn build(
        summary: &DataSummary,
        table: &NormalizedTable,
        options: &AnalysisOptions,
    ) -> Result<Self> {
        Ok(Self {
            generated_at: Utc::now(),
            data_summary: summary.clone(),
            sales_trends: trends(table)?,
            menu_performance: menu_performance(table, options)?,
            customer_segments: segment_performance(table)?,
            store_performance: store_performance(table, options)?,
            correlation_analysis: correlation(table)?,
        })
    }

    pub fn default_file_name(&self) -> String {
        timestamped_name("fnb_analysis_report", self.generated_at, "json")
    }
}

/// `<prefix>_<YYYYmmdd_HHMMSS>.<extension>`
pub fn timestamped_name(prefix: &str, at: DateTime<Utc>, extension: &str) -> String {
    format!("{}_{}.{}", prefix, at.format("%Y%m%d_%H%M%S"), extension)
}

/// Serialize an export as pretty JSON.
pub fn generate_json_report<T: Serialize>(export: &T) -> Result<String> {
    serde_json::to_string_pretty(export).map_err(Into::into)
}

/// Write rendered export content, creating parent directories as needed.
pub fn write_export(path: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Render the data summary alone as Markdown.
pub fn generate_markdown_summary(export: &DataSummaryExport, currency: &str) -> String {
    let mut output = String::new();

    output.push_str("# F&B Data Summary\n\n");
    output.push_str(&format!(
        "*Generated {}*\n\n",
        export.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&generate_headline_section(&export.data_summary, currency));
    output.push_str(&generate_data_quality_section(&export.data_summary));

    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &FullReportExport, currency: &str) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# F&B Sales Analysis Report\n\n");

    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_headline_section(&report.data_summary, currency));
    output.push_str(&generate_trends_section(&report.sales_trends, currency));
    output.push_str(&generate_menu_section(&report.menu_performance, currency));
    output.push_str(&generate_segments_section(&report.customer_segments, currency));
    output.push_str(&generate_stores_section(&report.store_performance, currency));
    output.push_str(&generate_correlation_section(&report.correlation_analysis));
    output.push_str(&generate_data_quality_section(&report.data_summary));

    // Footer
    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Report generated by fnb-copilot v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(report: &FullReportExport) -> String {
    let mut section = String::new();
    let summary = &report.data_summary;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(range) = summary.date_range {
        section.push_str(&format!(
            "- **Period:** {} to {}\n",
            range.start, range.end
        ));
    }
    section.push_str(&format!("- **Records:** {}\n", summary.total_records));
    section.push_str(&format!("- **Stores:** {}\n", summary.stores.join(", ")));
    section.push_str(&format!(
        "- **Customer Segments:** {}\n\n",
        summary.customer_segments.join(", ")
    ));

    section
}

fn generate_headline_section(summary: &DataSummary, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## Headline Metrics\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|---:|\n");
    section.push_str(&format!(
        "| Total Revenue | {} |\n",
        format_currency(summary.total_revenue, currency)
    ));
    section.push_str(&format!("| Items Sold | {} |\n", summary.total_qty_sold));
    section.push_str(&format!(
        "| Average Transaction | {} |\n",
        format_currency(summary.avg_transaction_value, currency)
    ));
    section.push_str(&format!("| Transactions | {} |\n", summary.total_records));
    section.push_str(&format!("| Menu Items | {} |\n\n", summary.unique_menu_items));

    if !summary.top_selling_items.is_empty() {
        section.push_str("### Best Sellers by Quantity\n\n");
        for (i, item) in summary.top_selling_items.iter().enumerate() {
            section.push_str(&format!("{}. {} ({})\n", i + 1, item.menu_item, item.qty));
        }
        section.push('\n');
    }

    section
}

fn generate_trends_section(trends: &SalesTrends, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## Sales Trends\n\n");
    if trends.daily_trends.is_empty() {
        section.push_str("No sales recorded.\n\n");
        return section;
    }

    section.push_str("### Monthly\n\n");
    section.push_str("| Month | Revenue | Quantity |\n");
    section.push_str("|:---:|---:|---:|\n");
    for month in &trends.monthly_trends {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            month.month,
            format_currency(month.revenue, currency),
            month.qty
        ));
    }
    section.push('\n');

    section.push_str("### Day of Week (average per transaction)\n\n");
    section.push_str("| Day | Revenue | Quantity |\n");
    section.push_str("|:---|---:|---:|\n");
    for day in &trends.weekly_patterns {
        section.push_str(&format!(
            "| {} | {} | {:.1} |\n",
            weekday_name(day.day_of_week),
            format_currency(day.revenue, currency),
            day.qty
        ));
    }
    section.push('\n');

    if let Some(best) = trends
        .daily_trends
        .iter()
        .max_by(|a, b| a.revenue.total_cmp(&b.revenue))
    {
        section.push_str(&format!(
            "Best day: **{}** with {}.\n\n",
            best.date,
            format_currency(best.revenue, currency)
        ));
    }

    section
}

fn generate_menu_section(menu: &MenuPerformance, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## Menu Performance\n\n");
    if menu.menu_performance.is_empty() {
        section.push_str("No menu items.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| High Performer | Average | Low Performer |\n|:---:|:---:|:---:|\n| {} | {} | {} |\n\n",
        menu.count_in(PerformanceCategory::HighPerformer),
        menu.count_in(PerformanceCategory::Average),
        menu.count_in(PerformanceCategory::LowPerformer),
    ));

    section.push_str("### Top Performers\n\n");
    section.push_str("| Menu Item | Revenue | Quantity |\n");
    section.push_str("|:---|---:|---:|\n");
    for item in &menu.top_performers {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            item.menu_item,
            format_currency(item.total_revenue, currency),
            item.total_qty
        ));
    }
    section.push('\n');

    section.push_str("### Low Performers\n\n");
    for item in &menu.low_performers {
        section.push_str(&format!(
            "- {} ({})\n",
            item.menu_item,
            format_currency(item.total_revenue, currency)
        ));
    }
    section.push('\n');

    section
}

fn generate_segments_section(segments: &SegmentAnalysis, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## Customer Segments\n\n");
    if segments.segment_performance.is_empty() {
        section.push_str("No customer segments.\n\n");
        return section;
    }

    section.push_str("| Segment | Revenue | Share | Transactions | Value per Transaction |\n");
    section.push_str("|:---|---:|---:|---:|---:|\n");
    for segment in &segments.segment_performance {
        section.push_str(&format!(
            "| {} | {} | {:.2}% | {} | {} |\n",
            segment.customer_segment,
            format_currency(segment.total_revenue, currency),
            segment.revenue_share,
            segment.transaction_count,
            format_currency(segment.customer_value, currency)
        ));
    }
    section.push('\n');

    section
}

fn generate_stores_section(stores: &StoreAnalysis, currency: &str) -> String {
    let mut section = String::new();

    section.push_str("## Store Performance\n\n");
    if stores.store_performance.is_empty() {
        section.push_str("No stores.\n\n");
        return section;
    }

    section.push_str("| Store | Revenue | Transactions | Menu Variety | Revenue per Day | Best Seller |\n");
    section.push_str("|:---|---:|---:|---:|---:|:---|\n");
    for store in &stores.store_performance {
        let best_seller = stores
            .store_popular_items
            .get(&store.store)
            .and_then(|items| items.first())
            .map(|item| item.menu_item.as_str())
            .unwrap_or("-");
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            store.store,
            format_currency(store.total_revenue, currency),
            store.transaction_count,
            store.menu_variety,
            format_currency(store.revenue_per_day, currency),
            best_seller
        ));
    }
    section.push('\n');

    section
}

fn generate_correlation_section(analysis: &CorrelationAnalysis) -> String {
    let mut section = String::new();
    let fmt = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v));
    let insights = &analysis.insights;

    section.push_str("## Correlations\n\n");
    section.push_str(&format!(
        "- **Price vs quantity:** {}\n",
        fmt(insights.price_qty_correlation)
    ));
    section.push_str(&format!(
        "- **Price vs revenue:** {}\n",
        fmt(insights.price_revenue_correlation)
    ));
    section.push_str(&format!(
        "- **Quantity vs revenue:** {}\n\n",
        fmt(insights.qty_revenue_correlation)
    ));

    section
}

fn generate_data_quality_section(summary: &DataSummary) -> String {
    let mut section = String::new();

    section.push_str("## Data Quality\n\n");
    section.push_str(&format!(
        "- Revenue outliers flagged (kept in all totals): {}\n",
        summary.outlier_count
    ));
    section.push_str(&format!(
        "- Rows without an average price (qty not positive): {}\n\n",
        summary.rows_without_avg_price
    ));

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summarize;
    use crate::analysis::test_support::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn build_report(table: &NormalizedTable) -> FullReportExport {
        let options = AnalysisOptions::default();
        let summary = summarize(table, &options).unwrap();
        FullReportExport::build(&summary, table, &options).unwrap()
    }

    #[test]
    fn test_timestamped_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            timestamped_name("data_summary", at, "json"),
            "data_summary_20240305_140709.json"
        );
    }

    #[test]
    fn test_full_report_json_has_all_sections() {
        let report = build_report(&scenario());
        let json: serde_json::Value =
            serde_json::from_str(&generate_json_report(&report).unwrap()).unwrap();

        for key in [
            "generated_at",
            "data_summary",
            "sales_trends",
            "menu_performance",
            "customer_segments",
            "store_performance",
            "correlation_analysis",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["data_summary"]["total_records"], 3);
        assert!(report.default_file_name().starts_with("fnb_analysis_report_"));
    }

    #[test]
    fn test_summary_export_is_summary_verbatim() {
        let options = AnalysisOptions::default();
        let summary = summarize(&sample(), &options).unwrap();
        let export = DataSummaryExport::new(&summary);
        let json: serde_json::Value =
            serde_json::from_str(&generate_json_report(&export).unwrap()).unwrap();

        assert_eq!(json["data_summary"], serde_json::to_value(&summary).unwrap());
        assert!(export.default_file_name().ends_with(".json"));
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&build_report(&sample()), "Rp");

        assert!(markdown.contains("# F&B Sales Analysis Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("| Total Revenue | Rp 1,754,500 |"));
        assert!(markdown.contains("| Nasi Goreng | Rp 493,000 | 29 |"));
        assert!(markdown.contains("## Customer Segments"));
        assert!(markdown.contains("## Store Performance"));
        assert!(markdown.contains("Revenue outliers flagged (kept in all totals): 1"));
    }

    #[test]
    fn test_markdown_report_for_empty_table() {
        let markdown = generate_markdown_report(&build_report(&empty()), "Rp");
        assert!(markdown.contains("No sales recorded."));
        assert!(markdown.contains("No menu items."));
        assert!(markdown.contains("- **Price vs quantity:** n/a"));
    }

    #[test]
    fn test_markdown_summary() {
        let summary = summarize(&scenario(), &AnalysisOptions::default()).unwrap();
        let markdown = generate_markdown_summary(&DataSummaryExport::new(&summary), "Rp");
        assert!(markdown.contains("# F&B Data Summary"));
        assert!(markdown.contains("1. Es Teh (10)"));
    }

    #[test]
    fn test_write_export_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exports").join("report.json");

        let written = write_export(&path, "{}").unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
