//! The loaded dataset and its derived state.
//!
//! A [`Session`] owns exactly one [`NormalizedTable`] together with the
//! [`DataSummary`] computed from it. Loading new data replaces both at once;
//! a load that fails validation leaves the previous state untouched.

use crate::analysis::{summarize, AnalysisOptions};
use crate::context::{build_llm_context_with, DEFAULT_CURRENCY};
use crate::data::{load_csv, normalize_with, RawTable};
use crate::data::normalize::DEFAULT_IQR_MULTIPLIER;
use crate::error::Result;
use crate::models::{DataSummary, NormalizedTable};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One question put to the model and the answer it gave.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    table: NormalizedTable,
    summary: DataSummary,
    options: AnalysisOptions,
    iqr_multiplier: f64,
    currency: String,
    history: Vec<Exchange>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(AnalysisOptions::default(), DEFAULT_IQR_MULTIPLIER)
    }
}

impl Session {
    /// An empty session; aggregations over it return empty results.
    pub fn new(options: AnalysisOptions, iqr_multiplier: f64) -> Self {
        Self {
            table: NormalizedTable::default(),
            summary: DataSummary::default(),
            options,
            iqr_multiplier,
            currency: DEFAULT_CURRENCY.to_string(),
            history: Vec::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Build a session from a CSV file with default options.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut session = Self::default();
        session.load_csv(path)?;
        Ok(session)
    }

    pub fn load_csv(&mut self, path: &Path) -> Result<()> {
        let raw = load_csv(path)?;
        self.load(&raw)
    }

    /// Normalize `raw` and replace the current table and summary.
    pub fn load(&mut self, raw: &RawTable) -> Result<()> {
        let table = normalize_with(raw, self.iqr_multiplier)?;
        let summary = summarize(&table, &self.options)?;

        info!(
            "Loaded {} records ({} outliers flagged)",
            table.len(),
            table.outlier_count()
        );

        self.table = table;
        self.summary = summary;
        self.history.clear();
        Ok(())
    }

    pub fn table(&self) -> &NormalizedTable {
        &self.table
    }

    pub fn summary(&self) -> &DataSummary {
        &self.summary
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_loaded(&self) -> bool {
        !self.table.is_empty()
    }

    /// Dataset context for prompts.
    pub fn context(&self) -> String {
        build_llm_context_with(&self.summary, &self.table, &self.currency)
    }

    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_support::SCENARIO_CSV;
    use crate::data::loader::parse_csv;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::default();
        assert!(!session.is_loaded());
        assert_eq!(session.summary(), &DataSummary::default());
        assert_eq!(session.context(), "No data loaded");
    }

    #[test]
    fn test_load_replaces_table_and_summary() {
        let mut session = Session::default();
        session
            .load(&parse_csv(SCENARIO_CSV.as_bytes()).unwrap())
            .unwrap();
        assert_eq!(session.table().len(), 3);
        assert_eq!(session.summary().total_records, 3);

        let sample = include_str!("../fixtures/sample_sales.csv");
        session.load(&parse_csv(sample.as_bytes()).unwrap()).unwrap();
        assert_eq!(session.table().len(), 20);
        assert_eq!(session.summary().total_records, 20);
    }

    #[test]
    fn test_failed_load_keeps_previous_state() {
        let mut session = Session::default();
        session
            .load(&parse_csv(SCENARIO_CSV.as_bytes()).unwrap())
            .unwrap();
        session.record_exchange("q", "a");

        let bad = "date,store,menu_item,revenue,qty,customer_segment\n\
                   not-a-date,A,Teh,1000,1,Regular\n";
        let err = session.load(&parse_csv(bad.as_bytes()).unwrap());

        assert!(err.is_err());
        assert_eq!(session.table().len(), 3);
        assert_eq!(session.summary().total_records, 3);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_from_csv() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SCENARIO_CSV.as_bytes()).unwrap();

        let session = Session::from_csv(file.path()).unwrap();
        assert!(session.is_loaded());
        assert!(session.context().contains("Total Records: 3"));
    }

    #[test]
    fn test_currency_flows_into_context() {
        let mut session = Session::default().with_currency("IDR");
        session
            .load(&parse_csv(SCENARIO_CSV.as_bytes()).unwrap())
            .unwrap();
        assert!(session.context().contains("Total Revenue: IDR 178,000"));
    }

    #[test]
    fn test_history() {
        let mut session = Session::default();
        session.record_exchange("Menu apa yang paling laris?", "Nasi Goreng");
        assert_eq!(session.history()[0].answer, "Nasi Goreng");
    }
}
