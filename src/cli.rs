//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::analysis::AnalysisKind;
use crate::charts::ChartType;
use crate::llm::{InsightKind, RecommendationKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fnb-copilot - sales analytics copilot for F&B businesses
///
/// Load a sales CSV (date, store, menu_item, revenue, qty, customer_segment),
/// explore aggregates, export reports, and ask an OpenAI-compatible model
/// for insights and recommendations.
///
/// Examples:
///   fnb-copilot --data sales.csv summary
///   fnb-copilot --data sales.csv analyze menu
///   fnb-copilot --data sales.csv export report --format markdown
///   fnb-copilot --data sales.csv ask "Menu apa yang paling laris?"
///   fnb-copilot --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Sales CSV file to load
    #[arg(short, long, value_name = "CSV", global = true, env = "FNB_COPILOT_DATA")]
    pub data: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .fnb-copilot.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Model name to request from the chat endpoint
    #[arg(long, global = true, env = "FNB_COPILOT_MODEL")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible chat endpoint
    #[arg(long, value_name = "URL", global = true, env = "FNB_COPILOT_BASE_URL")]
    pub base_url: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Language the model should answer in
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .fnb-copilot.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the headline data summary
    Summary {
        /// Print as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run one analysis and print its result as JSON
    Analyze {
        #[arg(value_enum)]
        kind: AnalysisKind,
    },

    /// List rows whose menu item, store or segment contains the query
    Search {
        query: String,

        /// Maximum rows to print
        #[arg(long, value_name = "COUNT")]
        limit: Option<usize>,
    },

    /// Draw a chart in the terminal or save its specification
    Chart {
        #[arg(value_enum)]
        kind: ChartType,

        /// Write the chart specification as JSON to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Width of the longest bar
        #[arg(long, default_value = "40", value_name = "CELLS")]
        width: usize,
    },

    /// Export the data summary or the full analysis report
    Export {
        #[arg(value_enum)]
        target: ExportTarget,

        /// Output file (default: timestamped name in the report directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (json, markdown)
        #[arg(long, default_value = "json", value_name = "FORMAT")]
        format: OutputFormat,
    },

    /// Ask the model for a narrative insight
    Insight {
        #[arg(value_enum, default_value = "general")]
        kind: InsightKind,
    },

    /// Ask the model a question about the data
    Ask { question: String },

    /// Ask the model for strategic recommendations
    Recommend {
        #[arg(value_enum)]
        kind: RecommendationKind,

        /// Business goals or focus areas
        #[arg(long, value_name = "TEXT")]
        goals: Option<String>,
    },

    /// Ask the model to explain an analysis result
    Explain {
        #[arg(value_enum)]
        analysis: AnalysisKind,
    },
}

impl Command {
    /// Whether the command calls the language model.
    pub fn uses_llm(&self) -> bool {
        matches!(
            self,
            Command::Insight { .. }
                | Command::Ask { .. }
                | Command::Recommend { .. }
                | Command::Explain { .. }
        )
    }
}

/// What `export` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportTarget {
    /// The data summary only
    Summary,
    /// Summary plus every analysis
    Report,
}

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON format (default)
    #[default]
    Json,
    /// Markdown format
    Markdown,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A command is required (try --help)".to_string());
        }

        match self.data {
            None => {
                return Err(
                    "No data file given; use --data <CSV> or set FNB_COPILOT_DATA".to_string(),
                )
            }
            Some(ref path) if !path.is_file() => {
                return Err(format!("Data file does not exist: {}", path.display()));
            }
            Some(_) => {}
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(Command::Chart { width: 0, .. }) = self.command {
            return Err("Chart width must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(std::iter::once("fnb-copilot").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_subcommands() {
        let args = parse(&["--data", "s.csv", "analyze", "menu"]);
        assert!(matches!(
            args.command,
            Some(Command::Analyze {
                kind: AnalysisKind::Menu
            })
        ));

        let args = parse(&["recommend", "menu-strategy", "--goals", "grow 20%"]);
        match args.command {
            Some(Command::Recommend { kind, goals }) => {
                assert_eq!(kind, RecommendationKind::MenuStrategy);
                assert_eq!(goals.as_deref(), Some("grow 20%"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = parse(&["insight"]);
        assert!(matches!(
            args.command,
            Some(Command::Insight {
                kind: InsightKind::General
            })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["export", "report", "--format", "markdown", "--data", "x.csv", "-v"]);
        assert_eq!(args.data, Some(PathBuf::from("x.csv")));
        assert!(args.verbose);
    }

    #[test]
    fn test_uses_llm() {
        assert!(parse(&["ask", "why?"]).command.unwrap().uses_llm());
        assert!(!parse(&["summary"]).command.unwrap().uses_llm());
    }

    #[test]
    fn test_validation() {
        let file = NamedTempFile::new().unwrap();
        let data = file.path().to_str().unwrap();

        assert!(parse(&["--data", data, "summary"]).validate().is_ok());
        assert!(parse(&["--data", "/no/such/file.csv", "summary"])
            .validate()
            .is_err());
        assert!(parse(&["--data", data]).validate().is_err());
        assert!(parse(&["--data", data, "--temperature", "3", "summary"])
            .validate()
            .is_err());
        assert!(parse(&["--data", data, "--base-url", "localhost", "ask", "q"])
            .validate()
            .is_err());
        assert!(parse(&["--data", data, "-v", "-q", "summary"])
            .validate()
            .is_err());
        assert!(parse(&["--init-config"]).validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["summary"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
