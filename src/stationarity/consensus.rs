//! Consensus voting and iterative differencing.
//!
//! At each differencing depth the unit-root tests vote with a two-thirds
//! supermajority; the depth is accepted only when that vote says stationary
//! and KPSS agrees. The first accepted depth is the order of integration.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::data::Dataset;
use crate::domain::{AnalysisConfig, IntegrationOrder};
use crate::math::stats::diff;
use crate::stationarity::trend::{TrendReport, detect_trend};
use crate::stationarity::{TestBattery, TestOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteConclusion {
    Stationary,
    NonStationary,
    Inconclusive,
    /// Fewer than two tests produced a verdict.
    InsufficientTests,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusVote {
    pub votes_stationary: usize,
    pub votes_nonstationary: usize,
    pub valid_tests: usize,
    pub conclusion: VoteConclusion,
    pub has_consensus: bool,
}

/// Tally the verdicts of tests sharing a null hypothesis.
///
/// Errored outcomes are excluded. With `v >= 2` valid tests a side needs
/// `ceil(2v / 3)` votes, so two valid tests must agree unanimously.
pub fn tally(outcomes: &[TestOutcome]) -> ConsensusVote {
    let votes_stationary = outcomes.iter().filter(|o| o.is_stationary == Some(true)).count();
    let votes_nonstationary = outcomes.iter().filter(|o| o.is_stationary == Some(false)).count();
    let valid_tests = votes_stationary + votes_nonstationary;

    let conclusion = if valid_tests < 2 {
        VoteConclusion::InsufficientTests
    } else {
        let required = (2 * valid_tests).div_ceil(3);
        if votes_stationary >= required {
            VoteConclusion::Stationary
        } else if votes_nonstationary >= required {
            VoteConclusion::NonStationary
        } else {
            VoteConclusion::Inconclusive
        }
    };

    ConsensusVote {
        votes_stationary,
        votes_nonstationary,
        valid_tests,
        conclusion,
        has_consensus: matches!(
            conclusion,
            VoteConclusion::Stationary | VoteConclusion::NonStationary
        ),
    }
}

/// Everything measured at one differencing depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferencingStep {
    pub depth: usize,
    pub n_obs: usize,
    pub unit_root: Vec<TestOutcome>,
    pub vote: ConsensusVote,
    pub stationarity: TestOutcome,
    /// Both groups said stationary.
    pub agreed: bool,
}

/// Stationarity analysis of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub column: String,
    pub n_obs: usize,
    pub integration: IntegrationOrder,
    pub steps: Vec<DifferencingStep>,
    pub trend: TrendReport,
}

pub struct ConsensusEngine {
    battery: TestBattery,
    significance_level: f64,
    max_diff: usize,
    min_observations: usize,
}

impl ConsensusEngine {
    pub fn new(battery: TestBattery, config: &AnalysisConfig) -> Self {
        Self {
            battery,
            significance_level: config.significance_level,
            max_diff: config.max_diff,
            min_observations: config.min_observations,
        }
    }

    /// Engine with the standard ADF / DF / PP + KPSS battery.
    pub fn standard(config: &AnalysisConfig) -> Self {
        Self::new(TestBattery::standard(), config)
    }

    pub fn order_of_integration(&self, series: &[f64]) -> IntegrationOrder {
        self.difference_until_stationary(series).0
    }

    pub fn analyze_series(&self, column: &str, series: &[f64]) -> SeriesReport {
        let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
        let (integration, steps) = self.difference_until_stationary(&clean);

        if integration.is_determined() {
            info!(column, order = %integration.notation, "order of integration");
        } else {
            warn!(column, reason = ?integration.reason, "order of integration undetermined");
        }

        SeriesReport {
            column: column.to_string(),
            n_obs: clean.len(),
            integration,
            steps,
            trend: detect_trend(&clean),
        }
    }

    fn difference_until_stationary(&self, series: &[f64]) -> (IntegrationOrder, Vec<DifferencingStep>) {
        let mut current: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
        let mut steps = Vec::new();
        let mut inconclusive = 0;

        if current.len() < self.min_observations {
            return (IntegrationOrder::undetermined("insufficient data", 0), steps);
        }

        for depth in 0..=self.max_diff {
            let step = self.test_depth(depth, &current);
            if !step.vote.has_consensus {
                inconclusive += 1;
            }
            let agreed = step.agreed;
            steps.push(step);

            if agreed {
                return (IntegrationOrder::found(depth, inconclusive), steps);
            }
            if depth < self.max_diff {
                current = diff(&current);
                if current.len() < self.min_observations {
                    return (
                        IntegrationOrder::undetermined("insufficient data after differencing", inconclusive),
                        steps,
                    );
                }
            }
        }

        let reason = format!(
            "no agreement between test groups within {} differences",
            self.max_diff
        );
        (IntegrationOrder::undetermined(reason, inconclusive), steps)
    }

    fn test_depth(&self, depth: usize, series: &[f64]) -> DifferencingStep {
        let unit_root: Vec<TestOutcome> = self
            .battery
            .unit_root
            .iter()
            .map(|test| test.run(series, self.significance_level))
            .collect();
        let vote = tally(&unit_root);
        let stationarity = self.battery.stationarity.run(series, self.significance_level);
        let agreed = vote.conclusion == VoteConclusion::Stationary && stationarity.is_stationary == Some(true);

        debug!(
            depth,
            n_obs = series.len(),
            conclusion = ?vote.conclusion,
            kpss = ?stationarity.is_stationary,
            agreed,
            "differencing step"
        );

        DifferencingStep {
            depth,
            n_obs: series.len(),
            unit_root,
            vote,
            stationarity,
            agreed,
        }
    }
}

/// Analyse each named numeric column in parallel.
///
/// Unknown and non-numeric names are skipped. The result is keyed by column
/// name, so its order does not depend on scheduling.
pub fn analyze_columns(
    engine: &ConsensusEngine,
    dataset: &Dataset,
    columns: &[String],
) -> BTreeMap<String, SeriesReport> {
    columns
        .par_iter()
        .filter_map(|name| {
            let series = dataset.numeric_series(name)?;
            Some((name.clone(), engine.analyze_series(name, &series)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Confidence;
    use crate::data::sample::{integrated, white_noise};
    use crate::stationarity::{StationarityTest, TestError, TestFamily, TestStatistic};

    type Verdict = fn(usize) -> Option<bool>;

    fn yes(_: usize) -> Option<bool> {
        Some(true)
    }

    fn no(_: usize) -> Option<bool> {
        Some(false)
    }

    fn fails(_: usize) -> Option<bool> {
        None
    }

    /// Verdict chosen from the series length: `Some(true)` stationary,
    /// `Some(false)` not, `None` errors out.
    struct Scripted {
        name: &'static str,
        family: TestFamily,
        verdict: Verdict,
    }

    impl StationarityTest for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn family(&self) -> TestFamily {
            self.family
        }

        fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError> {
            let stationary = (self.verdict)(series.len())
                .ok_or_else(|| TestError::Numerical("scripted failure".to_string()))?;
            // Unit-root tests are stationary on small p, KPSS on large p.
            let p_value = match (self.family, stationary) {
                (TestFamily::UnitRoot, true) | (TestFamily::Stationarity, false) => 0.001,
                _ => 0.5,
            };
            Ok(TestStatistic {
                statistic: 0.0,
                p_value,
                lags: 0,
                n_obs: series.len(),
                critical_values: BTreeMap::new(),
            })
        }
    }

    fn battery(unit_root: [Verdict; 3], kpss: Verdict) -> TestBattery {
        let names = ["A", "B", "C"];
        TestBattery {
            unit_root: names
                .into_iter()
                .zip(unit_root)
                .map(|(name, verdict)| {
                    Box::new(Scripted {
                        name,
                        family: TestFamily::UnitRoot,
                        verdict,
                    }) as Box<dyn StationarityTest>
                })
                .collect(),
            stationarity: Box::new(Scripted {
                name: "K",
                family: TestFamily::Stationarity,
                verdict: kpss,
            }),
        }
    }

    fn engine(battery: TestBattery) -> ConsensusEngine {
        ConsensusEngine::new(battery, &AnalysisConfig::default())
    }

    fn outcome(stationary: Option<bool>) -> TestOutcome {
        match stationary {
            Some(s) => TestOutcome {
                test: "T".to_string(),
                family: TestFamily::UnitRoot,
                statistic: Some(0.0),
                p_value: Some(0.0),
                is_stationary: Some(s),
                lags: Some(0),
                n_obs: 50,
                critical_values: BTreeMap::new(),
                error: None,
            },
            None => TestOutcome::failed(
                "T",
                TestFamily::UnitRoot,
                50,
                TestError::Numerical("failed".to_string()),
            ),
        }
    }

    #[test]
    fn two_of_three_is_consensus() {
        let vote = tally(&[outcome(Some(true)), outcome(Some(true)), outcome(Some(false))]);
        assert_eq!(vote.conclusion, VoteConclusion::Stationary);
        assert!(vote.has_consensus);
        assert_eq!((vote.votes_stationary, vote.votes_nonstationary, vote.valid_tests), (2, 1, 3));

        let vote = tally(&[outcome(Some(false)), outcome(Some(true)), outcome(Some(false))]);
        assert_eq!(vote.conclusion, VoteConclusion::NonStationary);
    }

    #[test]
    fn split_pair_is_inconclusive() {
        let vote = tally(&[outcome(Some(true)), outcome(Some(false)), outcome(None)]);
        assert_eq!(vote.valid_tests, 2);
        assert_eq!(vote.conclusion, VoteConclusion::Inconclusive);
        assert!(!vote.has_consensus);
    }

    #[test]
    fn agreeing_pair_is_consensus() {
        let vote = tally(&[outcome(Some(true)), outcome(None), outcome(Some(true))]);
        assert_eq!(vote.conclusion, VoteConclusion::Stationary);
    }

    #[test]
    fn single_valid_test_is_insufficient() {
        let vote = tally(&[outcome(Some(true)), outcome(None), outcome(None)]);
        assert_eq!(vote.conclusion, VoteConclusion::InsufficientTests);
        assert!(!vote.has_consensus);
        assert_eq!(tally(&[]).conclusion, VoteConclusion::InsufficientTests);
    }

    #[test]
    fn stationary_in_levels() {
        let engine = engine(battery([yes as Verdict; 3], yes));
        let order = engine.order_of_integration(&[0.0; 40]);
        assert_eq!(order.order, Some(0));
        assert_eq!(order.confidence, Confidence::High);
        assert_eq!(order.inconclusive_iterations, 0);
    }

    #[test]
    fn stationary_after_one_difference() {
        let engine = engine(battery([(|n: usize| Some(n < 40)) as Verdict; 3], |n| Some(n < 40)));
        let report = engine.analyze_series("x", &[0.0; 40]);
        assert_eq!(report.integration.order, Some(1));
        assert_eq!(report.integration.notation, "I(1)");
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].n_obs, 39);
    }

    #[test]
    fn kpss_disagreement_forces_another_difference() {
        // Unit-root group is satisfied in levels; KPSS only after two differences.
        let engine = engine(battery([yes as Verdict; 3], |n| Some(n <= 38)));
        let order = engine.order_of_integration(&[0.0; 40]);
        assert_eq!(order.order, Some(2));
    }

    #[test]
    fn exhausted_differencing_is_undetermined() {
        let engine = engine(battery([yes as Verdict; 3], no));
        let report = engine.analyze_series("x", &[0.0; 40]);
        assert_eq!(report.integration.notation, "I(?)");
        assert_eq!(report.integration.confidence, Confidence::Low);
        assert_eq!(report.integration.inconclusive_iterations, 0);
        assert_eq!(report.steps.len(), 6);
    }

    #[test]
    fn inconclusive_depths_are_counted() {
        let engine = engine(battery([yes as Verdict, no, fails], yes));
        let order = engine.order_of_integration(&[0.0; 40]);
        assert_eq!(order.order, None);
        assert_eq!(order.inconclusive_iterations, 6);
    }

    #[test]
    fn differencing_below_floor_stops() {
        let engine = engine(battery([no as Verdict; 3], no));
        let order = engine.order_of_integration(&[0.0; 11]);
        assert_eq!(order.order, None);
        assert_eq!(
            order.reason.as_deref(),
            Some("insufficient data after differencing")
        );
    }

    #[test]
    fn short_series_is_not_tested() {
        let engine = engine(battery([yes as Verdict; 3], yes));
        let report = engine.analyze_series("x", &[1.0, f64::NAN, 2.0, 3.0]);
        assert_eq!(report.integration.reason.as_deref(), Some("insufficient data"));
        assert!(report.steps.is_empty());
        assert_eq!(report.n_obs, 3);
    }

    #[test]
    fn white_noise_is_i0() {
        let engine = ConsensusEngine::standard(&AnalysisConfig::default());
        let order = engine.order_of_integration(&white_noise(200, 2));
        assert_eq!(order.order, Some(0));
        assert_eq!(order.confidence, Confidence::High);
    }

    #[test]
    fn random_walk_is_i1() {
        let engine = ConsensusEngine::standard(&AnalysisConfig::default());
        let order = engine.order_of_integration(&integrated(200, 1, 2));
        assert_eq!(order.order, Some(1));
        assert!(order.interpretation.contains("first differences"));
    }

    #[test]
    fn double_integration_is_i2() {
        let engine = ConsensusEngine::standard(&AnalysisConfig::default());
        let order = engine.order_of_integration(&integrated(200, 2, 2));
        assert_eq!(order.order, Some(2));
    }

    #[test]
    fn analysis_is_deterministic() {
        let engine = ConsensusEngine::standard(&AnalysisConfig::default());
        let series = integrated(150, 1, 7);
        assert_eq!(
            engine.analyze_series("x", &series),
            engine.analyze_series("x", &series)
        );
    }
}
