//! Estimator-family routing and best-candidate selection.
//!
//! Routing is a fixed decision table over the dataset metadata:
//!
//! | size  | layout        | linear | family                   |
//! |-------|---------------|--------|--------------------------|
//! | small | time series   | -      | small-sample time series |
//! | small | panel         | -      | panel (with its balance) |
//! | small | cross section | yes    | linear                   |
//! | small | cross section | no     | non-linear               |
//! | big   | any           | -      | big data                 |
//!
//! Every estimator registered for the family is run; one that fails is
//! recorded as skipped with its reason and never aborts the run.

use serde::Serialize;
use tracing::{info, warn};

use crate::classify::ResolvedRoles;
use crate::data::Dataset;
use crate::domain::{EstimatorFamily, Layout, Metadata, ModelCandidate, PanelBalance, SizeCategory};
use crate::error::{AppError, EXIT_INSUFFICIENT};
use crate::models::bigdata::{HoldoutOls, RandomForestRegressor};
use crate::models::linear::OrdinaryLeastSquares;
use crate::models::nonlinear::PolynomialRegression;
use crate::models::panel::{EntityFixedEffects, PooledOls, TwoWayFixedEffects};
use crate::models::time_series::{DistributedLag, ErrorCorrection, GrangerCausality};
use crate::models::{EstimationInput, Estimator};

pub fn select_family(metadata: &Metadata) -> EstimatorFamily {
    match (metadata.size_category, metadata.layout) {
        (SizeCategory::Big, _) => EstimatorFamily::BigData,
        (SizeCategory::Small, Layout::TimeSeries) => EstimatorFamily::SmallTimeSeries,
        (SizeCategory::Small, Layout::Panel) => EstimatorFamily::Panel(metadata.panel_balance),
        (SizeCategory::Small, Layout::CrossSection) if metadata.is_linear => EstimatorFamily::Linear,
        (SizeCategory::Small, Layout::CrossSection) => EstimatorFamily::NonLinear,
    }
}

fn lowest_by(candidates: &[ModelCandidate], metric: impl Fn(&ModelCandidate) -> Option<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let Some(value) = metric(candidate).filter(|v| v.is_finite()) else {
            continue;
        };
        if best.is_none_or(|(_, best_value)| value < best_value) {
            best = Some((i, value));
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the best candidate.
///
/// Lowest MAE among candidates reporting one; if none does, lowest MSE; if
/// none reports either, the first candidate. Ties keep the earliest.
pub fn select_best(candidates: &[ModelCandidate]) -> Option<usize> {
    lowest_by(candidates, |c| c.mae)
        .or_else(|| lowest_by(candidates, |c| c.mse))
        .or_else(|| (!candidates.is_empty()).then_some(0))
}

/// Estimators registered for a family, in reporting order.
pub fn estimators_for(family: EstimatorFamily) -> Vec<Box<dyn Estimator>> {
    match family {
        EstimatorFamily::SmallTimeSeries => vec![
            Box::new(ErrorCorrection),
            Box::new(DistributedLag),
            Box::new(GrangerCausality),
        ],
        EstimatorFamily::Panel(PanelBalance::Fixed) => vec![
            Box::new(PooledOls),
            Box::new(EntityFixedEffects),
            Box::new(TwoWayFixedEffects),
        ],
        EstimatorFamily::Panel(_) => vec![Box::new(PooledOls), Box::new(EntityFixedEffects)],
        EstimatorFamily::Linear => vec![Box::new(OrdinaryLeastSquares)],
        EstimatorFamily::NonLinear => vec![
            Box::new(PolynomialRegression::new(2)),
            Box::new(PolynomialRegression::new(3)),
        ],
        EstimatorFamily::BigData => vec![Box::new(RandomForestRegressor), Box::new(HoldoutOls)],
    }
}

/// Target and feature columns for estimation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelingPlan {
    pub target: String,
    pub features: Vec<String>,
}

impl ModelingPlan {
    /// Numeric columns that are not entity/time roles are modelling
    /// candidates. The target is `requested` or the last candidate; the
    /// remaining candidates are features.
    pub fn resolve(dataset: &Dataset, roles: &ResolvedRoles, requested: Option<&str>) -> Result<Self, AppError> {
        let candidates: Vec<String> = dataset
            .numeric_columns()
            .filter(|c| !roles.is_role_column(&c.name))
            .map(|c| c.name.clone())
            .collect();

        let target = match requested {
            Some(name) => {
                let column = dataset
                    .column(name)
                    .ok_or_else(|| AppError::invalid_config(format!("target column `{name}` not found")))?;
                if !column.is_numeric() {
                    return Err(AppError::invalid_config(format!(
                        "target column `{name}` is not numeric"
                    )));
                }
                name.to_string()
            }
            None => candidates.last().cloned().ok_or_else(|| {
                AppError::new(EXIT_INSUFFICIENT, "No numeric column available as estimation target.")
            })?,
        };

        let features = candidates.into_iter().filter(|c| *c != target).collect();
        Ok(Self { target, features })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEstimator {
    pub name: String,
    pub reason: String,
}

/// Output of running one estimator family.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSelection {
    pub family: EstimatorFamily,
    pub target: String,
    pub features: Vec<String>,
    pub candidates: Vec<ModelCandidate>,
    /// Estimators that could not run, and why.
    pub skipped: Vec<SkippedEstimator>,
    /// Index into `candidates`.
    pub best: Option<usize>,
}

impl ModelSelection {
    pub fn best_candidate(&self) -> Option<&ModelCandidate> {
        self.best.and_then(|i| self.candidates.get(i))
    }
}

pub fn run_estimators(
    family: EstimatorFamily,
    estimators: &[Box<dyn Estimator>],
    input: &EstimationInput<'_>,
) -> ModelSelection {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();

    for estimator in estimators {
        match estimator.estimate(input) {
            Ok(candidate) => {
                info!(estimator = estimator.name(), mae = ?candidate.mae, "fitted candidate");
                candidates.push(candidate);
            }
            Err(err) => {
                warn!(estimator = estimator.name(), error = %err, "estimator skipped");
                skipped.push(SkippedEstimator {
                    name: estimator.name().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let best = select_best(&candidates);
    ModelSelection {
        family,
        target: input.target.to_string(),
        features: input.features.to_vec(),
        candidates,
        skipped,
        best,
    }
}

pub fn run_family(family: EstimatorFamily, input: &EstimationInput<'_>) -> ModelSelection {
    run_estimators(family, &estimators_for(family), input)
}
