//! Descriptive statistics over polars frames.
//!
//! Quantiles use linear interpolation between closest ranks and the
//! standard deviation is the sample (ddof = 1) estimator, matching what
//! dataframe tools report for the same column.

use crate::data::frame::{finite, first_float, first_integer, floats, integers};
use polars::lazy::dsl::pearson_corr;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Round to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Linear-interpolation quantile of a column.
pub fn quantile_expr(column: &str, q: f64) -> Expr {
    col(column).quantile(lit(q), QuantileInterpolOptions::Linear)
}

/// Quantiles `qs` of one column; `None` for an empty or all-null column.
pub fn quantiles(df: &DataFrame, column: &str, qs: &[f64]) -> PolarsResult<Vec<Option<f64>>> {
    let exprs: Vec<Expr> = qs
        .iter()
        .enumerate()
        .map(|(i, q)| quantile_expr(column, *q).alias(&format!("q{}", i)))
        .collect();

    let result = df.clone().lazy().select(exprs).collect()?;
    (0..qs.len())
        .map(|i| first_float(&result, &format!("q{}", i)))
        .collect()
}

/// Pearson correlation over the rows where both columns are defined;
/// `None` when undefined (fewer than two pairs or a constant column).
pub fn pearson(df: &DataFrame, a: &str, b: &str) -> PolarsResult<Option<f64>> {
    let result = df
        .clone()
        .lazy()
        .filter(col(a).is_not_null().and(col(b).is_not_null()))
        .select([
            len().alias("pairs"),
            pearson_corr(col(a).cast(DataType::Float64), col(b).cast(DataType::Float64), 1)
                .alias("r"),
        ])
        .collect()?;

    if first_integer(&result, "pairs")? < 2 {
        return Ok(None);
    }
    Ok(first_float(&result, "r")?.map(|r| r.clamp(-1.0, 1.0)))
}

/// Count, mean, std, min, quartiles and max of a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

const DESCRIBE_FIELDS: [&str; 8] = ["count", "mean", "std", "min", "q25", "median", "q75", "max"];

/// Aggregations feeding [`Describe`], usable in a `select` or a grouped `agg`.
pub fn describe_exprs(column: &str) -> Vec<Expr> {
    let c = || col(column).cast(DataType::Float64);
    let exprs = [
        c().count(),
        c().mean(),
        c().std(1),
        c().min(),
        quantile_expr(column, 0.25),
        quantile_expr(column, 0.5),
        quantile_expr(column, 0.75),
        c().max(),
    ];

    exprs
        .into_iter()
        .zip(DESCRIBE_FIELDS)
        .map(|(expr, field)| expr.alias(&describe_alias(column, field)))
        .collect()
}

/// Read one [`Describe`] per row of a frame aggregated with [`describe_exprs`].
pub fn read_describes(df: &DataFrame, column: &str) -> PolarsResult<Vec<Describe>> {
    let counts = integers(df, &describe_alias(column, "count"))?;
    let mut fields = Vec::with_capacity(DESCRIBE_FIELDS.len() - 1);
    for field in &DESCRIBE_FIELDS[1..] {
        fields.push(floats(df, &describe_alias(column, field))?);
    }

    let describes = counts
        .into_iter()
        .enumerate()
        .map(|(row, count)| {
            let at = |field: usize| fields[field].get(row).copied().flatten();
            Describe {
                count: count.max(0) as usize,
                mean: at(0),
                // a single value has no sample deviation
                std: if count < 2 { None } else { finite(at(1)) },
                min: at(2),
                q25: at(3),
                median: at(4),
                q75: at(5),
                max: at(6),
            }
        })
        .collect();

    Ok(describes)
}

fn describe_alias(column: &str, field: &str) -> String {
    format!("{}_{}", column, field)
}
