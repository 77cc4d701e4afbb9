//! Command-line parsing for `autostat`.
//!
//! Argument parsing and command dispatch stay separate from the analysis
//! code. Every tunable can also come from an `AUTOSTAT_*` environment
//! variable (a `.env` file is loaded first by the binary).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    AnalysisConfig, DEFAULT_BIG_DATA_ROW_THRESHOLD, DEFAULT_FOREST_TREES, DEFAULT_GRANGER_MAX_LAG,
    DEFAULT_LINEARITY_THRESHOLD, DEFAULT_MAX_DIFF, DEFAULT_MIN_OBSERVATIONS, DEFAULT_MISSING_DROP_THRESHOLD,
    DEFAULT_SEED, DEFAULT_SIGNIFICANCE_LEVEL,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "autostat",
    version,
    about = "Dataset classification, order-of-integration consensus and estimator selection"
)]
pub struct Cli {
    /// More log output (repeat for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify, test stationarity (time series / panel) and select an estimator.
    Analyze(RunArgs),
    /// Print dataset metadata only.
    Classify(RunArgs),
    /// Determine the order of integration of every numeric column.
    Integrate(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Input CSV (header row required).
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Date/time column to use as the row index.
    #[arg(long, env = "AUTOSTAT_INDEX")]
    pub index: Option<String>,

    /// Write the full run as JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Write the order-of-integration table as CSV.
    #[arg(long = "export-csv", value_name = "PATH")]
    pub export_csv: Option<PathBuf>,

    /// Significance level shared by every stationarity test.
    #[arg(long, env = "AUTOSTAT_SIGNIFICANCE_LEVEL", default_value_t = DEFAULT_SIGNIFICANCE_LEVEL)]
    pub significance_level: f64,

    /// Maximum number of differences tried.
    #[arg(long, env = "AUTOSTAT_MAX_DIFF", default_value_t = DEFAULT_MAX_DIFF)]
    pub max_diff: usize,

    /// Linearity sensitivity in [0, 1].
    #[arg(long, env = "AUTOSTAT_LINEARITY_THRESHOLD", default_value_t = DEFAULT_LINEARITY_THRESHOLD)]
    pub linearity_threshold: f64,

    /// Row count from which a dataset counts as big.
    #[arg(long, env = "AUTOSTAT_BIG_DATA_ROW_THRESHOLD", default_value_t = DEFAULT_BIG_DATA_ROW_THRESHOLD)]
    pub big_data_row_threshold: usize,

    /// Smallest series length that is tested.
    #[arg(long, env = "AUTOSTAT_MIN_OBSERVATIONS", default_value_t = DEFAULT_MIN_OBSERVATIONS)]
    pub min_observations: usize,

    /// Target column for estimation (default: last numeric non-key column).
    #[arg(long, env = "AUTOSTAT_TARGET")]
    pub target: Option<String>,

    /// Seed for holdout splits and bootstrap samples.
    #[arg(long, env = "AUTOSTAT_SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Trees in the random forest.
    #[arg(long, env = "AUTOSTAT_FOREST_TREES", default_value_t = DEFAULT_FOREST_TREES)]
    pub forest_trees: usize,

    /// Largest lag tried by the Granger causality test.
    #[arg(long, env = "AUTOSTAT_GRANGER_MAX_LAG", default_value_t = DEFAULT_GRANGER_MAX_LAG)]
    pub granger_max_lag: usize,

    /// Drop columns missing more than this fraction of cells before estimation.
    #[arg(long, env = "AUTOSTAT_MISSING_DROP_THRESHOLD", default_value_t = DEFAULT_MISSING_DROP_THRESHOLD)]
    pub missing_drop_threshold: f64,
}

impl RunArgs {
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            significance_level: self.significance_level,
            max_diff: self.max_diff,
            linearity_threshold: self.linearity_threshold,
            big_data_row_threshold: self.big_data_row_threshold,
            min_observations: self.min_observations,
            target: self.target.clone(),
            seed: self.seed,
            forest_trees: self.forest_trees,
            granger_max_lag: self.granger_max_lag,
            missing_drop_threshold: self.missing_drop_threshold,
        }
    }
}
