//! CSV loading.
//!
//! Reads a sales log into a [`RawTable`] of string cells addressed by
//! header name. Typing and validation happen in the normalizer.

use crate::error::Result;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// An untyped table: trimmed header names plus one string cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Load a CSV file from disk.
pub fn load_csv(path: &Path) -> Result<RawTable> {
    info!("Loading sales data from: {}", path.display());
    let file = std::fs::File::open(path)?;
    let table = parse_csv(file)?;
    info!("Read {} rows", table.len());
    Ok(table)
}

/// Parse CSV content with a header row.
pub fn parse_csv<R: Read>(input: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    debug!("Columns: {:?}", headers);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(RawTable::new(headers, rows))
}
