//! Chart specifications.
//!
//! Charts are plain data: a [`ChartSpec`] names the chart kind, its axes and
//! its series, and can be serialised for an external renderer or drawn in
//! the terminal with [`render_bars`].

use crate::analysis::stores::StorePerformance;
use crate::analysis::{
    menu_performance, segment_performance, store_performance, trends, AnalysisKind,
    AnalysisOptions,
};
use crate::error::Result;
use crate::models::{weekday_name, NormalizedTable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Items shown on the menu performance chart.
const MENU_CHART_ITEMS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    HorizontalBar,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Line => write!(f, "line"),
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::HorizontalBar => write!(f, "horizontal bar"),
            ChartKind::Scatter => write!(f, "scatter"),
        }
    }
}

/// A category label or an x coordinate, plus the plotted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    pub y: f64,
}

impl DataPoint {
    pub fn labeled(label: impl Into<String>, y: f64) -> Self {
        Self {
            label: Some(label.into()),
            x: None,
            y,
        }
    }

    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            label: None,
            x: Some(x),
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<DataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// One-paragraph description used as context when explaining a chart.
    pub fn description(&self) -> String {
        let series = self
            .series
            .iter()
            .map(|s| format!("{} ({} points)", s.name, s.points.len()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} chart \"{}\"; x axis: {}, y axis: {}; series: {}",
            self.kind, self.title, self.x_label, self.y_label, series
        )
    }
}

/// The charts that can be built from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartType {
    SalesTrend,
    Menu,
    Stores,
    Segments,
    Weekly,
    PriceQuantity,
}

impl ChartType {
    /// The chart that illustrates an analysis.
    pub fn for_analysis(kind: AnalysisKind) -> Self {
        match kind {
            AnalysisKind::Trends => ChartType::SalesTrend,
            AnalysisKind::Menu => ChartType::Menu,
            AnalysisKind::Segments => ChartType::Segments,
            AnalysisKind::Stores => ChartType::Stores,
            AnalysisKind::Correlation => ChartType::PriceQuantity,
        }
    }
}

pub fn build_chart(
    chart: ChartType,
    table: &NormalizedTable,
    options: &AnalysisOptions,
) -> Result<ChartSpec> {
    let spec = match chart {
        ChartType::SalesTrend => sales_trend_chart(table)?,
        ChartType::Menu => menu_chart(table, options)?,
        ChartType::Stores => store_chart(table, options)?,
        ChartType::Segments => segment_chart(table)?,
        ChartType::Weekly => weekly_chart(table)?,
        ChartType::PriceQuantity => price_quantity_chart(table),
    };
    Ok(spec)
}

fn sales_trend_chart(table: &NormalizedTable) -> Result<ChartSpec> {
    let daily = trends(table)?.daily_trends;

    Ok(ChartSpec {
        title: "Sales Trends Over Time".to_string(),
        kind: ChartKind::Line,
        x_label: "Date".to_string(),
        y_label: "Revenue / Quantity".to_string(),
        series: vec![
            Series {
                name: "Daily Revenue".to_string(),
                points: daily
                    .iter()
                    .map(|d| DataPoint::labeled(d.date.to_string(), d.revenue))
                    .collect(),
            },
            Series {
                name: "Daily Quantity Sold".to_string(),
                points: daily
                    .iter()
                    .map(|d| DataPoint::labeled(d.date.to_string(), d.qty as f64))
                    .collect(),
            },
        ],
    })
}

fn menu_chart(table: &NormalizedTable, options: &AnalysisOptions) -> Result<ChartSpec> {
    let options = AnalysisOptions {
        top_items: MENU_CHART_ITEMS,
        ..options.clone()
    };
    let top = menu_performance(table, &options)?.top_performers;

    Ok(ChartSpec {
        title: format!("Top {} Menu Items by Revenue", top.len()),
        kind: ChartKind::HorizontalBar,
        x_label: "Revenue".to_string(),
        y_label: "Menu Items".to_string(),
        series: vec![Series {
            name: "Revenue".to_string(),
            points: top
                .iter()
                .map(|m| DataPoint::labeled(m.menu_item.clone(), m.total_revenue))
                .collect(),
        }],
    })
}

fn store_chart(table: &NormalizedTable, options: &AnalysisOptions) -> Result<ChartSpec> {
    let stores = store_performance(table, options)?.store_performance;
    let series = |name: &str, value: fn(&StorePerformance) -> f64| Series {
        name: name.to_string(),
        points: stores
            .iter()
            .map(|s| DataPoint::labeled(s.store.clone(), value(s)))
            .collect(),
    };

    Ok(ChartSpec {
        title: "Store Performance Comparison".to_string(),
        kind: ChartKind::Bar,
        x_label: "Store".to_string(),
        y_label: "Value".to_string(),
        series: vec![
            series("Revenue by Store", |s| s.total_revenue),
            series("Quantity Sold", |s| s.total_qty_sold as f64),
            series("Menu Variety", |s| s.menu_variety as f64),
        ],
    })
}

fn segment_chart(table: &NormalizedTable) -> Result<ChartSpec> {
    let segments = segment_performance(table)?.segment_performance;

    Ok(ChartSpec {
        title: "Customer Segment Analysis".to_string(),
        kind: ChartKind::Bar,
        x_label: "Customer Segment".to_string(),
        y_label: "Value".to_string(),
        series: vec![
            Series {
                name: "Revenue Share (%)".to_string(),
                points: segments
                    .iter()
                    .map(|s| DataPoint::labeled(s.customer_segment.clone(), s.revenue_share))
                    .collect(),
            },
            Series {
                name: "Average Transaction Value".to_string(),
                points: segments
                    .iter()
                    .map(|s| {
                        DataPoint::labeled(s.customer_segment.clone(), s.avg_revenue_per_transaction)
                    })
                    .collect(),
            },
        ],
    })
}

fn weekly_chart(table: &NormalizedTable) -> Result<ChartSpec> {
    let weekly = trends(table)?.weekly_patterns;

    Ok(ChartSpec {
        title: "Weekly Sales Patterns".to_string(),
        kind: ChartKind::Bar,
        x_label: "Day of Week".to_string(),
        y_label: "Average per Transaction".to_string(),
        series: vec![
            Series {
                name: "Average Revenue".to_string(),
                points: weekly
                    .iter()
                    .map(|w| DataPoint::labeled(weekday_name(w.day_of_week), w.revenue))
                    .collect(),
            },
            Series {
                name: "Average Quantity".to_string(),
                points: weekly
                    .iter()
                    .map(|w| DataPoint::labeled(weekday_name(w.day_of_week), w.qty))
                    .collect(),
            },
        ],
    })
}

fn price_quantity_chart(table: &NormalizedTable) -> ChartSpec {
    let mut by_segment: BTreeMap<&str, Vec<DataPoint>> = BTreeMap::new();
    for record in table.records() {
        if let Some(price) = record.avg_price {
            by_segment
                .entry(record.sales.customer_segment.as_str())
                .or_default()
                .push(DataPoint::xy(price, record.sales.qty as f64));
        }
    }

    ChartSpec {
        title: "Price vs Quantity by Customer Segment".to_string(),
        kind: ChartKind::Scatter,
        x_label: "Average Price per Item".to_string(),
        y_label: "Quantity Sold".to_string(),
        series: by_segment
            .into_iter()
            .map(|(name, points)| Series {
                name: name.to_string(),
                points,
            })
            .collect(),
    }
}

/// Draw labelled series as horizontal text bars at most `width` cells long.
///
/// Returns `None` for scatter charts, which have no category axis.
pub fn render_bars(spec: &ChartSpec, width: usize) -> Option<String> {
    if spec.kind == ChartKind::Scatter {
        return None;
    }

    let mut out = format!("{}\n", spec.title);
    for series in &spec.series {
        out.push_str(&format!("\n{}\n", series.name));

        let label_width = series
            .points
            .iter()
            .filter_map(|p| p.label.as_deref())
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0);
        let max = series.points.iter().map(|p| p.y).fold(0.0_f64, f64::max);

        for point in &series.points {
            let label = point.label.as_deref().unwrap_or("");
            let cells = if max > 0.0 {
                ((point.y / max) * width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "  {:<lw$} | {} {}\n",
                label,
                "█".repeat(cells),
                format_value(point.y),
                lw = label_width
            ));
        }
    }

    Some(out)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;

    fn chart(kind: ChartType) -> ChartSpec {
        build_chart(kind, &sample(), &AnalysisOptions::default()).unwrap()
    }

    #[test]
    fn test_sales_trend_chart() {
        let spec =
            build_chart(ChartType::SalesTrend, &scenario(), &AnalysisOptions::default()).unwrap();
        assert_eq!(spec.kind, ChartKind::Line);
        assert_eq!(spec.series.len(), 2);
        assert_eq!(spec.series[0].points[0], DataPoint::labeled("2024-01-15", 163000.0));
        assert_eq!(spec.series[1].points[1].y, 10.0);
    }

    #[test]
    fn test_menu_chart_sorted_by_revenue() {
        let spec = chart(ChartType::Menu);
        let points = &spec.series[0].points;
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].label.as_deref(), Some("Nasi Goreng"));
        assert!(points.windows(2).all(|w| w[0].y >= w[1].y));
    }

    #[test]
    fn test_menu_chart_title_counts_shown_items() {
        assert_eq!(chart(ChartType::Menu).title, "Top 7 Menu Items by Revenue");

        let spec = build_chart(ChartType::Menu, &scenario(), &AnalysisOptions::default()).unwrap();
        assert_eq!(spec.title, "Top 3 Menu Items by Revenue");
        assert_eq!(spec.series[0].points.len(), 3);
    }

    #[test]
    fn test_store_chart_has_three_series() {
        let spec = chart(ChartType::Stores);
        let names: Vec<_> = spec.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue by Store", "Quantity Sold", "Menu Variety"]);
        assert_eq!(spec.series[2].points[0], DataPoint::labeled("Store A", 7.0));
    }

    #[test]
    fn test_weekly_chart_uses_day_names_in_order() {
        let spec = chart(ChartType::Weekly);
        let labels: Vec<_> = spec.series[0]
            .points
            .iter()
            .filter_map(|p| p.label.clone())
            .collect();
        assert_eq!(labels[0], "Monday");
        assert_eq!(labels.last().map(String::as_str), Some("Sunday"));
    }

    #[test]
    fn test_scatter_skips_rows_without_price() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,A,Teh,6000,2,Regular\n\
                   2024-01-16,A,Teh,4000,0,Regular\n\
                   2024-01-16,A,Kopi,9000,1,Premium\n";
        let table = table_from(csv);
        let spec =
            build_chart(ChartType::PriceQuantity, &table, &AnalysisOptions::default()).unwrap();
        assert_eq!(spec.series.len(), 2);
        assert_eq!(spec.series[0].name, "Premium");
        assert_eq!(spec.series[1].points, vec![DataPoint::xy(3000.0, 2.0)]);
    }

    #[test]
    fn test_render_bars_scales_to_width() {
        let spec = ChartSpec {
            title: "Revenue".to_string(),
            kind: ChartKind::Bar,
            x_label: "Store".to_string(),
            y_label: "Revenue".to_string(),
            series: vec![Series {
                name: "Revenue".to_string(),
                points: vec![
                    DataPoint::labeled("A", 100.0),
                    DataPoint::labeled("Long", 50.0),
                ],
            }],
        };

        let text = render_bars(&spec, 10).unwrap();
        assert!(text.contains(&format!("  A    | {} 100", "█".repeat(10))));
        assert!(text.contains(&format!("  Long | {} 50", "█".repeat(5))));
    }

    #[test]
    fn test_render_bars_skips_scatter() {
        assert!(render_bars(&chart(ChartType::PriceQuantity), 40).is_none());
    }

    #[test]
    fn test_description_mentions_series() {
        let description = chart(ChartType::Segments).description();
        assert!(description.starts_with("bar chart \"Customer Segment Analysis\""));
        assert!(description.contains("Revenue Share (%) (3 points)"));
    }

    #[test]
    fn test_empty_table_charts_have_no_points() {
        let spec = build_chart(ChartType::Menu, &empty(), &AnalysisOptions::default()).unwrap();
        assert!(spec.series[0].points.is_empty());
        assert!(render_bars(&spec, 20).is_some());
    }
}
