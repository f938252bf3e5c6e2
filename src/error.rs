//! Error types for the copilot.
//!
//! Validation and transport failures propagate to the caller with a
//! human-readable message. Arithmetic edge cases inside the aggregation
//! layer are never errors; they are reported as warnings on the table.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input table is missing required columns or holds unparseable values.
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP failure or a model response without a usable completion.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No API key found; set the {0} environment variable")]
    MissingCredential(String),

    /// A prompt template was rendered without one of its required fields.
    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A dataframe query over the normalized table failed.
    #[error("Dataframe error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}

impl Error {
    /// Whether the caller can keep using the loaded data after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::MissingCredential(_) | Error::Prompt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
