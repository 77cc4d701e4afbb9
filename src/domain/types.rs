//! Shared domain types.
//!
//! These records are produced once per run and then only read. They derive
//! `Serialize` so a whole run can be exported as JSON.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Structural shape of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    TimeSeries,
    CrossSection,
    Panel,
}

impl Layout {
    pub fn label(self) -> &'static str {
        match self {
            Layout::TimeSeries => "time_series",
            Layout::CrossSection => "cross_section",
            Layout::Panel => "panel",
        }
    }
}

/// Whether every entity of a panel is observed the same number of times.
///
/// `None` means the dataset is not a panel at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelBalance {
    Fixed,
    Unfixed,
    None,
}

impl PanelBalance {
    pub fn label(self) -> &'static str {
        match self {
            PanelBalance::Fixed => "fixed",
            PanelBalance::Unfixed => "unfixed",
            PanelBalance::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeCategory {
    Small,
    Big,
}

impl SizeCategory {
    pub fn from_rows(row_count: usize, big_data_row_threshold: usize) -> Self {
        if row_count >= big_data_row_threshold {
            SizeCategory::Big
        } else {
            SizeCategory::Small
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SizeCategory::Small => "small",
            SizeCategory::Big => "big",
        }
    }
}

/// Classification of a dataset, created once per run.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub layout: Layout,
    pub panel_balance: PanelBalance,
    pub size_category: SizeCategory,
    pub row_count: usize,
    pub column_count: usize,
    pub is_linear: bool,
    /// Missing cells over all cells, in `[0, 1]`.
    pub missing_fraction: f64,
    pub has_missing: bool,
    /// Missing cell count per column (columns without gaps are omitted).
    pub missing_by_column: BTreeMap<String, usize>,
    /// Column resolved for the entity role, if any.
    ///
    /// Together with `time_column` this tells a consumer whether an `unfixed`
    /// panel was measured as unbalanced or could not be measured at all.
    pub entity_column: Option<String>,
    pub time_column: Option<String>,
}

impl Metadata {
    /// Whether the panel balance was actually measured rather than defaulted.
    pub fn panel_roles_resolved(&self) -> bool {
        self.entity_column.is_some() && self.time_column.is_some()
    }
}

/// Confidence attached to an order-of-integration answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// Final order-of-integration verdict for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationOrder {
    /// `Some(d)` when differencing `d` times made both test groups agree.
    pub order: Option<usize>,
    /// `I(d)` or `I(?)`.
    pub notation: String,
    pub confidence: Confidence,
    pub interpretation: String,
    /// Differencing depths at which the unit-root group reached no consensus.
    pub inconclusive_iterations: usize,
    /// Why no order was found, when `order` is `None`.
    pub reason: Option<String>,
}

impl IntegrationOrder {
    pub fn found(order: usize, inconclusive_iterations: usize) -> Self {
        Self {
            order: Some(order),
            notation: format!("I({order})"),
            confidence: Confidence::High,
            interpretation: interpret_order(order),
            inconclusive_iterations,
            reason: None,
        }
    }

    pub fn undetermined(reason: impl Into<String>, inconclusive_iterations: usize) -> Self {
        let reason = reason.into();
        Self {
            order: None,
            notation: "I(?)".to_string(),
            confidence: Confidence::Low,
            interpretation: format!("Order of integration could not be determined: {reason}"),
            inconclusive_iterations,
            reason: Some(reason),
        }
    }

    pub fn is_determined(&self) -> bool {
        self.order.is_some()
    }
}

fn interpret_order(d: usize) -> String {
    match d {
        0 => "Stationary in levels - no differencing needed".to_string(),
        1 => "Stationary in first differences - has unit root".to_string(),
        2 => "Stationary in second differences - has two unit roots".to_string(),
        _ => format!("Stationary after {d} differences"),
    }
}

/// Family of estimators a dataset is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "family", content = "balance")]
pub enum EstimatorFamily {
    /// Error-correction, distributed-lag and causality models for short series.
    SmallTimeSeries,
    Panel(PanelBalance),
    Linear,
    NonLinear,
    /// Holdout-validated machine-learning models for large samples.
    BigData,
}

impl EstimatorFamily {
    pub fn display_name(self) -> String {
        match self {
            EstimatorFamily::SmallTimeSeries => "small-sample time series".to_string(),
            EstimatorFamily::Panel(balance) => format!("panel ({})", balance.label()),
            EstimatorFamily::Linear => "linear".to_string(),
            EstimatorFamily::NonLinear => "non-linear".to_string(),
            EstimatorFamily::BigData => "big data / machine learning".to_string(),
        }
    }
}

/// Opaque fitted state owned by an estimator.
pub type FittedArtifact = Arc<dyn Any + Send + Sync>;

/// One fitted estimator result, as seen by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCandidate {
    pub name: String,
    pub target: String,
    pub mae: Option<f64>,
    pub mse: Option<f64>,
    pub r_squared: Option<f64>,
    pub n_obs: usize,
    /// Estimator-specific scalars (adjusted R², test statistics, p-values, ...).
    pub metrics: BTreeMap<String, f64>,
    pub coefficients: BTreeMap<String, f64>,
    pub notes: Vec<String>,
    #[serde(skip)]
    pub fitted_artifact: Option<FittedArtifact>,
}

impl ModelCandidate {
    pub fn new(name: impl Into<String>, target: impl Into<String>, n_obs: usize) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            mae: None,
            mse: None,
            r_squared: None,
            n_obs,
            metrics: BTreeMap::new(),
            coefficients: BTreeMap::new(),
            notes: Vec::new(),
            fitted_artifact: None,
        }
    }
}

/// Defaults for every tunable of a run.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
pub const DEFAULT_MAX_DIFF: usize = 5;
pub const DEFAULT_LINEARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_BIG_DATA_ROW_THRESHOLD: usize = 5000;
pub const DEFAULT_MIN_OBSERVATIONS: usize = 10;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_FOREST_TREES: usize = 50;
pub const DEFAULT_GRANGER_MAX_LAG: usize = 4;
pub const DEFAULT_MISSING_DROP_THRESHOLD: f64 = 0.5;

/// A run's configuration as understood by the pipeline.
///
/// Derived from CLI flags / environment (plus defaults).
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    /// Significance level shared by every stationarity test.
    pub significance_level: f64,
    /// Maximum differencing depth tried by the consensus engine.
    pub max_diff: usize,
    /// Linearity sensitivity; the mean Pearson/Spearman gap must stay below `1 - threshold`.
    pub linearity_threshold: f64,
    pub big_data_row_threshold: usize,
    /// Sample floor below which a series is not tested (also after differencing).
    pub min_observations: usize,
    /// Target column for estimation; defaults to the last numeric non-role column.
    pub target: Option<String>,
    /// Seed for holdout splits and bootstrap samples.
    pub seed: u64,
    pub forest_trees: usize,
    pub granger_max_lag: usize,
    /// Columns missing more than this fraction of cells are dropped before estimation.
    pub missing_drop_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            max_diff: DEFAULT_MAX_DIFF,
            linearity_threshold: DEFAULT_LINEARITY_THRESHOLD,
            big_data_row_threshold: DEFAULT_BIG_DATA_ROW_THRESHOLD,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            target: None,
            seed: DEFAULT_SEED,
            forest_trees: DEFAULT_FOREST_TREES,
            granger_max_lag: DEFAULT_GRANGER_MAX_LAG,
            missing_drop_threshold: DEFAULT_MISSING_DROP_THRESHOLD,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.significance_level.is_finite()
            && self.significance_level > 0.0
            && self.significance_level < 1.0)
        {
            return Err(AppError::invalid_config(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }
        if !(self.linearity_threshold.is_finite()
            && (0.0..=1.0).contains(&self.linearity_threshold))
        {
            return Err(AppError::invalid_config(format!(
                "linearity_threshold must be in [0, 1], got {}",
                self.linearity_threshold
            )));
        }
        if !(self.missing_drop_threshold.is_finite()
            && (0.0..=1.0).contains(&self.missing_drop_threshold))
        {
            return Err(AppError::invalid_config(format!(
                "missing_drop_threshold must be in [0, 1], got {}",
                self.missing_drop_threshold
            )));
        }
        if self.big_data_row_threshold == 0 {
            return Err(AppError::invalid_config("big_data_row_threshold must be > 0"));
        }
        if self.min_observations < 3 {
            return Err(AppError::invalid_config("min_observations must be >= 3"));
        }
        if self.forest_trees == 0 {
            return Err(AppError::invalid_config("forest_trees must be > 0"));
        }
        if self.granger_max_lag == 0 {
            return Err(AppError::invalid_config("granger_max_lag must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_category_threshold_is_inclusive() {
        assert_eq!(SizeCategory::from_rows(4999, 5000), SizeCategory::Small);
        assert_eq!(SizeCategory::from_rows(5000, 5000), SizeCategory::Big);
    }

    #[test]
    fn integration_order_notation() {
        let found = IntegrationOrder::found(1, 0);
        assert_eq!(found.notation, "I(1)");
        assert_eq!(found.confidence, Confidence::High);
        assert!(found.interpretation.contains("unit root"));

        let unknown = IntegrationOrder::undetermined("insufficient data after differencing", 2);
        assert_eq!(unknown.notation, "I(?)");
        assert_eq!(unknown.confidence, Confidence::Low);
        assert_eq!(unknown.order, None);
        assert_eq!(unknown.inconclusive_iterations, 2);
    }

    #[test]
    fn default_config_validates() {
        assert!(AnalysisConfig::default().validate().is_ok());

        let config = AnalysisConfig {
            significance_level: 1.5,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().exit_code(), 2);

        let config = AnalysisConfig {
            missing_drop_threshold: -0.1,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().unwrap_err().message().contains("missing_drop_threshold"));
    }
}
