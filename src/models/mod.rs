//! Estimator families and the model-selection dispatcher.
//!
//! Estimators are collaborators behind the `Estimator` trait. The dispatcher
//! only consumes the `ModelCandidate` each one returns; an estimator that
//! cannot run reports an `EstimatorError` and is listed as skipped.

pub mod bigdata;
pub mod diagnostics;
pub mod dispatch;
pub mod forest;
pub mod linear;
pub mod nonlinear;
pub mod panel;
pub mod regression;
pub mod time_series;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::classify::ResolvedRoles;
use crate::data::Dataset;
use crate::domain::{AnalysisConfig, IntegrationOrder, ModelCandidate};

pub use dispatch::{
    ModelSelection, ModelingPlan, SkippedEstimator, estimators_for, run_estimators, run_family, select_best,
    select_family,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("insufficient data: {n_obs} complete rows, at least {required} required")]
    InsufficientData { n_obs: usize, required: usize },
    #[error("not applicable: {0}")]
    NotApplicable(String),
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Everything an estimator may look at.
#[derive(Debug, Clone, Copy)]
pub struct EstimationInput<'a> {
    pub dataset: &'a Dataset,
    pub target: &'a str,
    pub features: &'a [String],
    pub roles: &'a ResolvedRoles,
    /// Orders of integration per column, when stationarity was analysed.
    pub integration: Option<&'a BTreeMap<String, IntegrationOrder>>,
    pub config: &'a AnalysisConfig,
}

impl EstimationInput<'_> {
    pub fn order_of(&self, column: &str) -> Option<usize> {
        self.integration?.get(column)?.order
    }
}

pub trait Estimator: Send + Sync {
    fn name(&self) -> &str;

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError>;
}
