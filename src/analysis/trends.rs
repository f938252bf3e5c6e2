//! Sales trends over time.

use crate::analysis::sorted_by;
use crate::data::frame::{self, dates, floats, integers, weekday_from_index};
use crate::error::Result;
use crate::models::NormalizedTable;
use chrono::{NaiveDate, Weekday};
use polars::prelude::*;
use serde::Serialize;

/// Revenue and quantity summed over one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub revenue: f64,
    pub qty: i64,
}

/// Revenue and quantity summed over one calendar month (1-12, all years).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub month: u32,
    pub revenue: f64,
    pub qty: i64,
}

/// Mean revenue and quantity per transaction on one weekday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayPattern {
    #[serde(serialize_with = "crate::models::serialize_weekday")]
    pub day_of_week: Weekday,
    pub revenue: f64,
    pub qty: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SalesTrends {
    /// Ascending by date.
    pub daily_trends: Vec<DailyTrend>,
    /// Ascending by month.
    pub monthly_trends: Vec<MonthlyTrend>,
    /// Monday through Sunday; days without sales are omitted.
    pub weekly_patterns: Vec<WeekdayPattern>,
}

pub fn trends(table: &NormalizedTable) -> Result<SalesTrends> {
    if table.is_empty() {
        return Ok(SalesTrends::default());
    }

    let daily = summed_by(table, frame::DATE)?;
    let daily_trends = dates(&daily, frame::DATE)?
        .into_iter()
        .zip(floats(&daily, frame::REVENUE)?)
        .zip(integers(&daily, frame::QTY)?)
        .map(|((date, revenue), qty)| DailyTrend {
            date,
            revenue: revenue.unwrap_or_default(),
            qty,
        })
        .collect();

    let monthly = summed_by(table, frame::MONTH)?;
    let monthly_trends = integers(&monthly, frame::MONTH)?
        .into_iter()
        .zip(floats(&monthly, frame::REVENUE)?)
        .zip(integers(&monthly, frame::QTY)?)
        .map(|((month, revenue), qty)| MonthlyTrend {
            month: month as u32,
            revenue: revenue.unwrap_or_default(),
            qty,
        })
        .collect();

    let weekly = sorted_by(
        table.lazy().group_by([col(frame::WEEKDAY)]).agg([
            col(frame::REVENUE).mean(),
            col(frame::QTY).cast(DataType::Float64).mean(),
        ]),
        &[frame::WEEKDAY],
    )
    .collect()?;
    let weekly_patterns = integers(&weekly, frame::WEEKDAY)?
        .into_iter()
        .zip(floats(&weekly, frame::REVENUE)?)
        .zip(floats(&weekly, frame::QTY)?)
        .filter_map(|((day, revenue), qty)| {
            Some(WeekdayPattern {
                day_of_week: weekday_from_index(day)?,
                revenue: revenue?,
                qty: qty?,
            })
        })
        .collect();

    Ok(SalesTrends {
        daily_trends,
        monthly_trends,
        weekly_patterns,
    })
}

/// Revenue and quantity summed per value of `key`, ascending.
fn summed_by(table: &NormalizedTable, key: &str) -> Result<DataFrame> {
    let grouped = sorted_by(
        table
            .lazy()
            .group_by([col(key)])
            .agg([col(frame::REVENUE).sum(), col(frame::QTY).sum()]),
        &[key],
    )
    .collect()?;
    Ok(grouped)
}
