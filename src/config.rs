//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.fnb-copilot.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".fnb-copilot.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Language-model endpoint settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report and export settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Chat-completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Language the model is asked to answer in.
    #[serde(default = "default_response_language")]
    pub response_language: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            timeout_seconds: default_timeout(),
            api_key_env: default_api_key_env(),
            response_language: default_response_language(),
        }
    }
}

impl LlmConfig {
    /// The API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

fn default_model() -> String {
    "vllm-qwen3".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_top_p() -> f32 {
    0.9
}

fn default_timeout() -> u64 {
    30
}

fn default_api_key_env() -> String {
    "FNB_COPILOT_API_KEY".to_string()
}

fn default_response_language() -> String {
    "Indonesian".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Length of the top-performers list.
    #[serde(default = "default_top_items")]
    pub top_items: usize,

    /// Length of the low-performers list.
    #[serde(default = "default_bottom_items")]
    pub bottom_items: usize,

    /// Best sellers listed in the data summary.
    #[serde(default = "default_short_list")]
    pub summary_top_items: usize,

    /// Best sellers listed per store.
    #[serde(default = "default_short_list")]
    pub store_top_items: usize,

    #[serde(default = "default_high_quantile")]
    pub high_performer_quantile: f64,

    #[serde(default = "default_low_quantile")]
    pub low_performer_quantile: f64,

    /// IQR multiplier for the revenue outlier fences.
    #[serde(default = "default_iqr_multiplier")]
    pub outlier_iqr_multiplier: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_items: default_top_items(),
            bottom_items: default_bottom_items(),
            summary_top_items: default_short_list(),
            store_top_items: default_short_list(),
            high_performer_quantile: default_high_quantile(),
            low_performer_quantile: default_low_quantile(),
            outlier_iqr_multiplier: default_iqr_multiplier(),
        }
    }
}

fn default_top_items() -> usize {
    10
}

fn default_bottom_items() -> usize {
    5
}

fn default_short_list() -> usize {
    5
}

fn default_high_quantile() -> f64 {
    0.8
}

fn default_low_quantile() -> f64 {
    0.2
}

fn default_iqr_multiplier() -> f64 {
    crate::data::normalize::DEFAULT_IQR_MULTIPLIER
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory exports are written to when no explicit path is given.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Currency prefix for amounts in text output.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            currency: default_currency(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_currency() -> String {
    crate::context::DEFAULT_CURRENCY.to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Reject values the aggregation layer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        for (name, q) in [
            ("high_performer_quantile", a.high_performer_quantile),
            ("low_performer_quantile", a.low_performer_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                anyhow::bail!("analysis.{} must be between 0.0 and 1.0", name);
            }
        }
        if a.low_performer_quantile > a.high_performer_quantile {
            anyhow::bail!("analysis.low_performer_quantile must not exceed high_performer_quantile");
        }
        if !a.outlier_iqr_multiplier.is_finite() || a.outlier_iqr_multiplier < 0.0 {
            anyhow::bail!("analysis.outlier_iqr_multiplier must be a non-negative number");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.llm.model = model.clone();
        }
        if let Some(ref base_url) = args.base_url {
            self.llm.base_url = base_url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.llm.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.llm.timeout_seconds = timeout;
        }
        if let Some(ref language) = args.language {
            self.llm.response_language = language.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
