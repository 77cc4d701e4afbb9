//! Stationarity testing and order-of-integration consensus.
//!
//! Each test sits behind the `StationarityTest` capability trait. The
//! consensus engine only sees `TestOutcome`s, so a failing or unavailable
//! test degrades to a missing vote instead of an error.
//!
//! - `unit_root`: ADF, Dickey-Fuller and Phillips-Perron (null: unit root)
//! - `kpss`: KPSS level test (null: stationary)
//! - `mackinnon`: response-surface p-values for the unit-root tests
//! - `consensus`: voting and iterative differencing
//! - `trend`: linear trend detection reported alongside

pub mod consensus;
pub mod kpss;
pub mod mackinnon;
pub mod trend;
pub mod unit_root;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use consensus::{
    ConsensusEngine, ConsensusVote, DifferencingStep, SeriesReport, VoteConclusion, analyze_columns, tally,
};
pub use kpss::Kpss;
pub use trend::{TrendDirection, TrendReport, detect_trend};
pub use unit_root::{AugmentedDickeyFuller, DickeyFuller, PhillipsPerron};

/// Why a single test produced no verdict.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestError {
    #[error("insufficient data: {n_obs} observations, at least {required} required")]
    InsufficientData { n_obs: usize, required: usize },
    #[error("test unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Null hypothesis family of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestFamily {
    /// Null: the series has a unit root. Stationary when `p < significance`.
    UnitRoot,
    /// Null: the series is stationary. Stationary when `p > significance`.
    Stationarity,
}

/// Raw result of a test computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestStatistic {
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    pub n_obs: usize,
    /// Keyed by level, e.g. `"5%"`.
    pub critical_values: BTreeMap<String, f64>,
}

/// One test applied to one series at one differencing depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    pub test: String,
    pub family: TestFamily,
    pub statistic: Option<f64>,
    pub p_value: Option<f64>,
    /// `None` when the test could not run.
    pub is_stationary: Option<bool>,
    pub lags: Option<usize>,
    pub n_obs: usize,
    pub critical_values: BTreeMap<String, f64>,
    pub error: Option<TestError>,
}

impl TestOutcome {
    pub fn failed(test: impl Into<String>, family: TestFamily, n_obs: usize, error: TestError) -> Self {
        Self {
            test: test.into(),
            family,
            statistic: None,
            p_value: None,
            is_stationary: None,
            lags: None,
            n_obs,
            critical_values: BTreeMap::new(),
            error: Some(error),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_stationary.is_some()
    }
}

/// A stationarity or unit-root test.
///
/// Implementors provide `compute` on a clean (finite-only) series; `run`
/// handles cleaning and turns the p-value into a verdict.
pub trait StationarityTest: Send + Sync {
    fn name(&self) -> &str;

    fn family(&self) -> TestFamily;

    fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError>;

    fn run(&self, series: &[f64], significance: f64) -> TestOutcome {
        let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
        let family = self.family();

        match self.compute(&clean) {
            Ok(stat) => {
                let is_stationary = match family {
                    TestFamily::UnitRoot => stat.p_value < significance,
                    TestFamily::Stationarity => stat.p_value > significance,
                };
                debug!(
                    test = self.name(),
                    statistic = stat.statistic,
                    p_value = stat.p_value,
                    lags = stat.lags,
                    is_stationary,
                    "test outcome"
                );
                TestOutcome {
                    test: self.name().to_string(),
                    family,
                    statistic: Some(stat.statistic),
                    p_value: Some(stat.p_value),
                    is_stationary: Some(is_stationary),
                    lags: Some(stat.lags),
                    n_obs: stat.n_obs,
                    critical_values: stat.critical_values,
                    error: None,
                }
            }
            Err(err) => {
                debug!(test = self.name(), error = %err, "test could not run");
                TestOutcome::failed(self.name(), family, clean.len(), err)
            }
        }
    }
}

/// Placeholder for a test whose implementation is not available in this build.
#[derive(Debug, Clone)]
pub struct Unavailable {
    pub name: String,
    pub family: TestFamily,
    pub reason: String,
}

impl StationarityTest for Unavailable {
    fn name(&self) -> &str {
        &self.name
    }

    fn family(&self) -> TestFamily {
        self.family
    }

    fn compute(&self, _series: &[f64]) -> Result<TestStatistic, TestError> {
        Err(TestError::DependencyUnavailable(self.reason.clone()))
    }
}

/// The tests the consensus engine votes with.
pub struct TestBattery {
    pub unit_root: Vec<Box<dyn StationarityTest>>,
    pub stationarity: Box<dyn StationarityTest>,
}

impl TestBattery {
    /// ADF, Dickey-Fuller and Phillips-Perron voting; KPSS confirming.
    pub fn standard() -> Self {
        Self {
            unit_root: vec![
                Box::new(AugmentedDickeyFuller),
                Box::new(DickeyFuller),
                Box::new(PhillipsPerron),
            ],
            stationarity: Box::new(Kpss),
        }
    }
}

/// Reject constant and too-short inputs before fitting.
pub(crate) fn check_series(series: &[f64], required: usize) -> Result<(), TestError> {
    if series.len() < required {
        return Err(TestError::InsufficientData {
            n_obs: series.len(),
            required,
        });
    }
    let first = series[0];
    if series.iter().all(|v| (v - first).abs() <= f64::EPSILON * first.abs().max(1.0)) {
        return Err(TestError::Numerical("series is constant".to_string()));
    }
    Ok(())
}
