//! Free-text row search.

use crate::models::{NormalizedRecord, NormalizedTable};

/// Rows whose menu item, store or customer segment contains `query`,
/// ignoring case. An empty query matches every row.
pub fn search<'a>(table: &'a NormalizedTable, query: &str) -> Vec<&'a NormalizedRecord> {
    let needle = query.to_lowercase();

    table
        .records()
        .iter()
        .filter(|r| {
            [
                &r.sales.menu_item,
                &r.sales.store,
                &r.sales.customer_segment,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}
