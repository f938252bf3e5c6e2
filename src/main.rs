//! fnb-copilot - sales analytics copilot for F&B businesses
//!
//! A CLI tool that loads a sales CSV, computes descriptive aggregates
//! (trends, menu, segments, stores, correlation), exports reports, and
//! forwards summaries to an OpenAI-compatible model for narrative insights.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (validation, transport, config, I/O)

mod analysis;
mod charts;
mod cli;
mod config;
mod context;
mod data;
mod error;
mod llm;
mod models;
mod report;
mod session;

use analysis::{analysis_json, search, AnalysisOptions};
use anyhow::{Context, Result};
use charts::{build_chart, render_bars};
use cli::{Args, Command, ExportTarget, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use llm::{CompletionOptions, Copilot, OpenAiClient};
use report::{DataSummaryExport, FullReportExport};
use session::Session;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a .env file next to the data
    dotenv::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("fnb-copilot v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .fnb-copilot.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the model endpoint, ranking limits, and currency.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG`, when set, replaces the level chosen by --verbose/--quiet.
/// Logs go to stderr so command output can be piped.
fn init_logging(args: &Args) {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let result = if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(args.log_level()).finish())
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the data and run the selected command.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let command = args.command.clone().context("No command given")?;
    let data_path = args.data.clone().context("No data file given")?;

    // Fail on a missing credential before touching the data
    let client = if command.uses_llm() {
        Some(OpenAiClient::from_config(&config.llm)?)
    } else {
        None
    };

    let options = AnalysisOptions::from(&config.analysis);
    let mut session = Session::new(options, config.analysis.outlier_iqr_multiplier)
        .with_currency(config.report.currency.clone());
    session
        .load_csv(&data_path)
        .with_context(|| format!("Failed to load {}", data_path.display()))?;

    if !session.table().warnings().is_empty() {
        warn!(
            "{} rows have no average price and are left out of price metrics",
            session.table().warnings().len()
        );
    }

    match command {
        Command::Summary { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(session.summary())?);
            } else {
                println!("{}", session.context());
            }
        }
        Command::Analyze { kind } => {
            let result = analysis_json(kind, session.table(), session.options())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Search { query, limit } => print_search(&session, &query, limit),
        Command::Chart {
            kind,
            output,
            width,
        } => {
            let spec = build_chart(kind, session.table(), session.options())?;
            if let Some(path) = output {
                let written = report::write_export(&path, &serde_json::to_string_pretty(&spec)?)?;
                println!("✅ Chart specification saved to: {}", written.display());
            } else if let Some(text) = render_bars(&spec, width) {
                println!("{}", text);
            } else {
                println!("{}", serde_json::to_string_pretty(&spec)?);
            }
        }
        Command::Export {
            target,
            output,
            format,
        } => {
            let written = export(&session, &config, target, output, format)?;
            println!("✅ Export saved to: {}", written.display());
        }
        llm_command => {
            let client = client.context("No model client configured")?;
            run_llm_command(llm_command, client, &config, &mut session, args.quiet).await?
        }
    }

    Ok(())
}

/// Print matching rows as a pipe-separated table.
fn print_search(session: &Session, query: &str, limit: Option<usize>) {
    let hits = search(session.table(), query);
    println!("🔍 {} matching rows for \"{}\"\n", hits.len(), query);

    if hits.is_empty() {
        return;
    }

    println!("date | store | menu_item | revenue | qty | customer_segment");
    for record in hits.iter().take(limit.unwrap_or(usize::MAX)) {
        let s = &record.sales;
        println!(
            "{} | {} | {} | {} | {} | {}{}",
            s.date,
            s.store,
            s.menu_item,
            s.revenue,
            s.qty,
            s.customer_segment,
            if record.is_outlier { " (outlier)" } else { "" }
        );
    }
}

/// Write the requested export and return the path written.
fn export(
    session: &Session,
    config: &Config,
    target: ExportTarget,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<PathBuf> {
    let currency = session.currency();

    let (content, default_name) = match target {
        ExportTarget::Summary => {
            let export = DataSummaryExport::new(session.summary());
            let content = match format {
                OutputFormat::Json => report::generate_json_report(&export)?,
                OutputFormat::Markdown => report::generate_markdown_summary(&export, currency),
            };
            (content, export.default_file_name())
        }
        ExportTarget::Report => {
            println!("📝 Generating report...");
            let export =
                FullReportExport::build(session.summary(), session.table(), session.options())?;
            let content = match format {
                OutputFormat::Json => report::generate_json_report(&export)?,
                OutputFormat::Markdown => report::generate_markdown_report(&export, currency),
            };
            (content, export.default_file_name())
        }
    };

    let path = output.unwrap_or_else(|| {
        config
            .report
            .output_dir
            .join(default_name)
            .with_extension(format.extension())
    });
    report::write_export(&path, &content)
}

/// Run a command that needs the language model.
async fn run_llm_command(
    command: Command,
    client: OpenAiClient,
    config: &Config,
    session: &mut Session,
    quiet: bool,
) -> Result<()> {
    let copilot = Copilot::new(
        client,
        CompletionOptions::from(&config.llm),
        config.llm.response_language.clone(),
    );

    let spinner = if quiet {
        None
    } else {
        Some(waiting_spinner(&config.llm.model))
    };

    let result = match command {
        Command::Insight { kind } => copilot.generate_insight(session, kind).await,
        Command::Ask { question } => copilot.answer_question(session, &question).await,
        Command::Recommend { kind, goals } => {
            copilot.recommend(session, kind, goals.as_deref()).await
        }
        Command::Explain { analysis } => copilot.explain(session, analysis).await,
        other => anyhow::bail!("{:?} does not use the model", other),
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let answer = result?;
    println!("{}", answer);
    Ok(())
}

fn waiting_spinner(model: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(format!("Waiting for {}...", model));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
