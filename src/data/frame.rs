//! Columnar view of a normalized table.
//!
//! The aggregation engine runs polars expressions over this frame. Dates
//! are stored as day numbers and weekdays as 0 (Monday) to 6 (Sunday), so
//! sorting by either column gives calendar order.

use crate::models::NormalizedRecord;
use chrono::{Datelike, NaiveDate, Weekday};
use polars::prelude::*;

pub const DATE: &str = "date";
pub const STORE: &str = "store";
pub const MENU_ITEM: &str = "menu_item";
pub const REVENUE: &str = "revenue";
pub const QTY: &str = "qty";
pub const SEGMENT: &str = "customer_segment";
pub const AVG_PRICE: &str = "avg_price";
pub const MONTH: &str = "month";
pub const WEEKDAY: &str = "day_of_week";
pub const IS_OUTLIER: &str = "is_outlier";

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Build the frame for a set of normalized records, one row per record.
pub fn build_frame(records: &[NormalizedRecord]) -> PolarsResult<DataFrame> {
    let dates: Vec<i32> = records
        .iter()
        .map(|r| r.sales.date.num_days_from_ce())
        .collect();
    let stores: Vec<&str> = records.iter().map(|r| r.sales.store.as_str()).collect();
    let items: Vec<&str> = records
        .iter()
        .map(|r| r.sales.menu_item.as_str())
        .collect();
    let revenues: Vec<f64> = records.iter().map(|r| r.sales.revenue).collect();
    let quantities: Vec<i64> = records.iter().map(|r| r.sales.qty).collect();
    let segments: Vec<&str> = records
        .iter()
        .map(|r| r.sales.customer_segment.as_str())
        .collect();
    let prices: Vec<Option<f64>> = records.iter().map(|r| r.avg_price).collect();
    let months: Vec<i32> = records.iter().map(|r| r.month as i32).collect();
    let weekdays: Vec<i32> = records
        .iter()
        .map(|r| r.day_of_week.num_days_from_monday() as i32)
        .collect();
    let outliers: Vec<bool> = records.iter().map(|r| r.is_outlier).collect();

    DataFrame::new(vec![
        Series::new(DATE, dates),
        Series::new(STORE, stores),
        Series::new(MENU_ITEM, items),
        Series::new(REVENUE, revenues),
        Series::new(QTY, quantities),
        Series::new(SEGMENT, segments),
        Series::new(AVG_PRICE, prices),
        Series::new(MONTH, months),
        Series::new(WEEKDAY, weekdays),
        Series::new(IS_OUTLIER, outliers),
    ])
}

pub fn strings(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

/// Float values of a column; integer columns are cast.
pub fn floats(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().map(finite).collect();
    Ok(values)
}

/// Integer values of a column; nulls read as zero.
pub fn integers(df: &DataFrame, name: &str) -> PolarsResult<Vec<i64>> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    let values = series.i64()?.into_iter().map(Option::unwrap_or_default).collect();
    Ok(values)
}

/// First value of a float column, for single-row aggregate frames.
pub fn first_float(df: &DataFrame, name: &str) -> PolarsResult<Option<f64>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let value = series.f64()?.get(0);
    Ok(finite(value))
}

pub fn first_integer(df: &DataFrame, name: &str) -> PolarsResult<i64> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    let value = series.i64()?.get(0);
    Ok(value.unwrap_or_default())
}

/// Dates stored as day numbers.
pub fn dates(df: &DataFrame, name: &str) -> PolarsResult<Vec<NaiveDate>> {
    Ok(integers(df, name)?
        .into_iter()
        .filter_map(|days| NaiveDate::from_num_days_from_ce_opt(days as i32))
        .collect())
}

pub fn weekday_from_index(index: i64) -> Option<Weekday> {
    usize::try_from(index)
        .ok()
        .and_then(|i| WEEKDAYS.get(i).copied())
}

/// NaN (zero variance, empty input) reads as undefined.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::*;

    #[test]
    fn test_frame_has_one_row_per_record() {
        let table = sample();
        let df = table.frame();
        assert_eq!(df.height(), 20);
        assert_eq!(df.width(), 10);
        assert_eq!(strings(df, STORE).unwrap()[0], "Store A");
    }

    #[test]
    fn test_dates_round_trip_through_day_numbers() {
        let table = scenario();
        let days = dates(table.frame(), DATE).unwrap();
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn test_missing_price_reads_as_none() {
        let table = table_from(
            "date,store,menu_item,revenue,qty,customer_segment\n\
             2024-01-15,A,Teh,4000,0,Regular\n",
        );
        assert_eq!(floats(table.frame(), AVG_PRICE).unwrap(), vec![None]);
    }

    #[test]
    fn test_weekday_from_index() {
        assert_eq!(weekday_from_index(0), Some(Weekday::Mon));
        assert_eq!(weekday_from_index(6), Some(Weekday::Sun));
        assert_eq!(weekday_from_index(7), None);
        assert_eq!(weekday_from_index(-1), None);
    }

    #[test]
    fn test_finite_drops_nan() {
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(Some(1.5)), Some(1.5));
    }
}
