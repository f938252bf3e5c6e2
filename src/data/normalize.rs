//! Table normalization.
//!
//! Turns a [`RawTable`] into a typed [`NormalizedTable`]: parses dates and
//! numbers, flags revenue outliers with the IQR rule, and derives
//! `avg_price`, `month`, `day_of_week` and `week` for every row.
//!
//! Any unparseable cell aborts the whole load; no partial table is produced.
//! A non-positive `qty` is not an error: the row's `avg_price` is left
//! undefined and a [`ComputationWarning`] is recorded instead. A `qty`
//! beyond [`MAX_QTY`] in either direction is rejected, which keeps every
//! quantity total within `i64`.

use crate::data::loader::RawTable;
use crate::data::stats::quantiles;
use crate::error::{Error, Result};
use crate::models::{
    ComputationWarning, NormalizedRecord, NormalizedTable, OutlierBounds, SalesRecord,
    REQUIRED_COLUMNS,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::{DataFrame, NamedFrom, Series};
use tracing::{debug, info, warn};

/// Multiplier applied to the IQR when bounding non-extreme revenue.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Largest accepted magnitude of a row's `qty`.
pub const MAX_QTY: i64 = 1_000_000_000;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Normalize with the default outlier multiplier.
pub fn normalize(raw: &RawTable) -> Result<NormalizedTable> {
    normalize_with(raw, DEFAULT_IQR_MULTIPLIER)
}

/// Normalize using `iqr_multiplier` for the outlier fences.
pub fn normalize_with(raw: &RawTable, iqr_multiplier: f64) -> Result<NormalizedTable> {
    let columns = ColumnIndex::resolve(raw)?;

    let sales = raw
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| columns.parse_row(row, i + 1))
        .collect::<Result<Vec<_>>>()?;

    let revenues: Vec<f64> = sales.iter().map(|s| s.revenue).collect();
    let bounds = outlier_bounds(&revenues, iqr_multiplier)?;
    if let Some(b) = bounds {
        debug!(
            "Outlier fences: [{:.2}, {:.2}] (Q1 {:.2}, Q3 {:.2})",
            b.lower, b.upper, b.q1, b.q3
        );
    }

    let mut warnings = Vec::new();
    let records: Vec<NormalizedRecord> = sales
        .into_iter()
        .enumerate()
        .map(|(i, sales)| {
            let avg_price = if sales.qty > 0 {
                Some(sales.revenue / sales.qty as f64)
            } else {
                warnings.push(ComputationWarning::AvgPriceNotComputable {
                    row: i + 1,
                    qty: sales.qty,
                });
                None
            };
            let is_outlier = bounds.map_or(false, |b| !b.contains(sales.revenue));
            let date = sales.date;

            NormalizedRecord {
                avg_price,
                month: date.month(),
                day_of_week: date.weekday(),
                week: date.iso_week().week(),
                is_outlier,
                sales,
            }
        })
        .collect();

    for warning in &warnings {
        warn!("{}", warning);
    }

    let table = NormalizedTable::new(records, warnings, bounds)?;
    info!(
        "Normalized {} rows ({} outliers flagged, {} without avg_price)",
        table.len(),
        table.outlier_count(),
        table.warnings().len()
    );

    Ok(table)
}

/// IQR fences over the whole revenue column; `None` for an empty column.
pub fn outlier_bounds(revenues: &[f64], iqr_multiplier: f64) -> Result<Option<OutlierBounds>> {
    let df = DataFrame::new(vec![Series::new("revenue", revenues)])?;
    let (q1, q3) = match quantiles(&df, "revenue", &[0.25, 0.75])?[..] {
        [Some(q1), Some(q3)] => (q1, q3),
        _ => return Ok(None),
    };
    let iqr = q3 - q1;

    Ok(Some(OutlierBounds {
        q1,
        q3,
        lower: q1 - iqr_multiplier * iqr,
        upper: q3 + iqr_multiplier * iqr,
    }))
}

/// Parse a date cell; a trailing time component is accepted and dropped.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Positions of the required columns within a raw table.
struct ColumnIndex {
    date: usize,
    store: usize,
    menu_item: usize,
    revenue: usize,
    qty: usize,
    customer_segment: usize,
}

impl ColumnIndex {
    fn resolve(raw: &RawTable) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| raw.column_index(name).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let idx = |name: &str| raw.column_index(name).unwrap_or_default();
        Ok(Self {
            date: idx("date"),
            store: idx("store"),
            menu_item: idx("menu_item"),
            revenue: idx("revenue"),
            qty: idx("qty"),
            customer_segment: idx("customer_segment"),
        })
    }

    fn parse_row(&self, row: &[String], line: usize) -> Result<SalesRecord> {
        let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");

        let date = parse_date(cell(self.date)).ok_or_else(|| {
            Error::Validation(format!(
                "row {}: unparseable date '{}'",
                line,
                cell(self.date)
            ))
        })?;

        let revenue = parse_revenue(cell(self.revenue)).ok_or_else(|| {
            Error::Validation(format!(
                "row {}: revenue must be a non-negative number, got '{}'",
                line,
                cell(self.revenue)
            ))
        })?;

        let qty = parse_qty(cell(self.qty)).ok_or_else(|| {
            Error::Validation(format!(
                "row {}: qty must be an integer between -{} and {}, got '{}'",
                line,
                MAX_QTY,
                MAX_QTY,
                cell(self.qty)
            ))
        })?;

        Ok(SalesRecord {
            date,
            store: cell(self.store).to_string(),
            menu_item: cell(self.menu_item).to_string(),
            revenue,
            qty,
            customer_segment: cell(self.customer_segment).to_string(),
        })
    }
}

fn parse_revenue(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn parse_qty(value: &str) -> Option<i64> {
    let value = value.trim();
    let limit = MAX_QTY as f64;
    value
        .parse::<i64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0 && v.abs() <= limit)
                .map(|v| v as i64)
        })
        .filter(|v| v.abs() <= MAX_QTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_csv;
    use chrono::Weekday;

    fn raw(csv: &str) -> RawTable {
        parse_csv(csv.as_bytes()).unwrap()
    }

    const SCENARIO: &str = "date,store,menu_item,revenue,qty,customer_segment\n\
        2024-01-15,Store A,Nasi Goreng,85000,5,Regular\n\
        2024-01-15,Store B,Ayam Bakar,78000,4,Premium\n\
        2024-01-16,Store A,Es Teh,15000,10,Budget\n";

    #[test]
    fn test_normalize_derives_columns() {
        let table = normalize(&raw(SCENARIO)).unwrap();
        assert_eq!(table.len(), 3);

        let first = &table.records()[0];
        assert_eq!(first.avg_price, Some(17000.0));
        assert_eq!(first.month, 1);
        assert_eq!(first.day_of_week, Weekday::Mon);
        assert_eq!(first.week, 3);
        assert!(!first.is_outlier);
        assert!(table.warnings().is_empty());
    }

    #[test]
    fn test_missing_columns_fail() {
        let err = normalize(&raw("date,store,menu_item,revenue\n2024-01-15,A,B,1\n")).unwrap_err();
        match err {
            Error::Validation(msg) => {
                assert!(msg.contains("qty"));
                assert!(msg.contains("customer_segment"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_date_fails_whole_load() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,Store A,Nasi Goreng,85000,5,Regular\n\
                   yesterday,Store B,Ayam Bakar,78000,4,Premium\n";
        let err = normalize(&raw(csv)).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_zero_qty_is_warning_not_error() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,Store A,Nasi Goreng,85000,5,Regular\n\
                   2024-01-15,Store B,Ayam Bakar,78000,0,Premium\n";
        let table = normalize(&raw(csv)).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[1].avg_price, None);
        assert_eq!(
            table.warnings(),
            &[ComputationWarning::AvgPriceNotComputable { row: 2, qty: 0 }]
        );
    }

    #[test]
    fn test_outliers_flagged_not_removed() {
        let table = normalize(&raw(include_str!("../../fixtures/sample_sales.csv"))).unwrap();

        assert_eq!(table.len(), 20);
        assert_eq!(table.outlier_count(), 1);
        let outlier = table.records().iter().find(|r| r.is_outlier).unwrap();
        assert_eq!(outlier.sales.menu_item, "Rendang");

        let bounds = table.outlier_bounds().unwrap();
        assert!((bounds.q1 - 39750.0).abs() < 1e-9);
        assert!((bounds.q3 - 93000.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_table_normalizes() {
        let table = normalize(&raw("date,store,menu_item,revenue,qty,customer_segment\n")).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.outlier_bounds(), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("2024/01/15"), expected);
        assert_eq!(parse_date("01/15/2024"), expected);
        assert_eq!(parse_date("2024-01-15 13:45:00"), expected);
        assert_eq!(parse_date("2024-01-15T13:45:00"), expected);
        assert_eq!(parse_date("15 Jan"), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_revenue("85000"), Some(85000.0));
        assert_eq!(parse_revenue("12.5"), Some(12.5));
        assert_eq!(parse_revenue("-1"), None);
        assert_eq!(parse_revenue("abc"), None);
        assert_eq!(parse_qty("5"), Some(5));
        assert_eq!(parse_qty("5.0"), Some(5));
        assert_eq!(parse_qty("5.5"), None);
        assert_eq!(parse_qty("-3"), Some(-3));
    }

    #[test]
    fn test_parse_qty_rejects_out_of_range() {
        assert_eq!(parse_qty("1000000000"), Some(MAX_QTY));
        assert_eq!(parse_qty("1e9"), Some(MAX_QTY));
        assert_eq!(parse_qty("1000000001"), None);
        assert_eq!(parse_qty("1e30"), None);
        assert_eq!(parse_qty("-1e30"), None);
        assert_eq!(parse_qty("9223372036854775807"), None);
        assert_eq!(parse_qty("inf"), None);
    }

    #[test]
    fn test_huge_qty_fails_load_instead_of_overflowing() {
        let csv = "date,store,menu_item,revenue,qty,customer_segment\n\
                   2024-01-15,Store A,Nasi Goreng,85000,9223372036854775807,Regular\n\
                   2024-01-15,Store A,Nasi Goreng,85000,1,Regular\n";
        let err = normalize(&raw(csv)).unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_largest_quantities_still_sum() {
        let csv = format!(
            "date,store,menu_item,revenue,qty,customer_segment\n\
             2024-01-15,Store A,Teh,1,{max},Regular\n\
             2024-01-16,Store A,Teh,1,{max},Regular\n",
            max = MAX_QTY
        );
        let table = normalize(&raw(&csv)).unwrap();
        let summary = crate::analysis::summarize(&table, &Default::default()).unwrap();
        assert_eq!(summary.total_qty_sold, 2 * MAX_QTY);
    }

    #[test]
    fn test_raw_input_not_mutated() {
        let input = raw(SCENARIO);
        let before = input.clone();
        let _ = normalize(&input).unwrap();
        assert_eq!(input, before);
    }
}
