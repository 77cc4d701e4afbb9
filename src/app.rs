//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - loads the CSV
//! - runs the requested pipeline stages
//! - prints the report and writes optional exports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, RunArgs};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `autostat` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Analyze(args) => handle_run(args, pipeline::analyze),
        Command::Classify(args) => handle_run(args, pipeline::classify),
        Command::Integrate(args) => handle_run(args, pipeline::integrate),
    }
}

type Stage = fn(&crate::data::Dataset, &crate::domain::AnalysisConfig) -> Result<pipeline::RunOutput, AppError>;

fn handle_run(args: RunArgs, stage: Stage) -> Result<(), AppError> {
    let config = args.analysis_config();
    config.validate()?;

    let ingested = crate::io::load_csv(&args.csv, args.index.as_deref())?;
    let run = stage(&ingested.dataset, &config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run, &args.csv.display().to_string(), &ingested.row_errors)
    );

    if let Some(path) = &args.export_json {
        crate::io::export::write_json(path, &run)?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_integration_csv(path, run.integration.values())?;
    }

    Ok(())
}

/// Logs go to stderr so the report on stdout stays clean.
///
/// `-v`/`-q` pick the level; without them `RUST_LOG` is honoured and the
/// default is `warn`.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new(Level::ERROR.as_str()),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.as_str())),
        (false, 1) => EnvFilter::new(Level::INFO.as_str()),
        (false, 2) => EnvFilter::new(Level::DEBUG.as_str()),
        (false, _) => EnvFilter::new(Level::TRACE.as_str()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
