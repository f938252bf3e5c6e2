//! Pearson correlation between revenue, quantity and average price.
//!
//! Each coefficient is computed over the rows where both variables are
//! defined, so rows without an `avg_price` only drop out of the pairs that
//! involve price. Undefined coefficients (constant series, fewer than two
//! pairs) are `None` and serialize as `null`.

use crate::data::frame;
use crate::data::stats::{pearson, round_to};
use crate::error::Result;
use crate::models::NormalizedTable;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Revenue,
    Qty,
    AvgPrice,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Revenue, Metric::Qty, Metric::AvgPrice];

    /// Column holding this metric in the table's frame.
    fn column(&self) -> &'static str {
        match self {
            Metric::Revenue => frame::REVENUE,
            Metric::Qty => frame::QTY,
            Metric::AvgPrice => frame::AVG_PRICE,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Revenue => write!(f, "revenue"),
            Metric::Qty => write!(f, "qty"),
            Metric::AvgPrice => write!(f, "avg_price"),
        }
    }
}

/// Square matrix indexed in the order of `variables`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: Vec<Metric>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Metric, b: Metric) -> Option<f64> {
        let i = self.variables.iter().position(|m| *m == a)?;
        let j = self.variables.iter().position(|m| *m == b)?;
        self.values.get(i)?.get(j).copied().flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationInsights {
    pub price_qty_correlation: Option<f64>,
    pub price_revenue_correlation: Option<f64>,
    pub qty_revenue_correlation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationAnalysis {
    pub correlation_matrix: CorrelationMatrix,
    pub insights: CorrelationInsights,
}

pub fn correlation(table: &NormalizedTable) -> Result<CorrelationAnalysis> {
    if table.is_empty() {
        return Ok(CorrelationAnalysis::default());
    }

    let mut values = Vec::with_capacity(Metric::ALL.len());
    for a in Metric::ALL {
        let mut row = Vec::with_capacity(Metric::ALL.len());
        for b in Metric::ALL {
            let r = pearson(table.frame(), a.column(), b.column())?;
            row.push(r.map(|r| round_to(r, 3)));
        }
        values.push(row);
    }

    let correlation_matrix = CorrelationMatrix {
        variables: Metric::ALL.to_vec(),
        values,
    };
    let insights = CorrelationInsights {
        price_qty_correlation: correlation_matrix.get(Metric::AvgPrice, Metric::Qty),
        price_revenue_correlation: correlation_matrix.get(Metric::AvgPrice, Metric::Revenue),
        qty_revenue_correlation: correlation_matrix.get(Metric::Qty, Metric::Revenue),
    };

    Ok(CorrelationAnalysis {
        correlation_matrix,
        insights,
    })
}
