//! Big-data family: holdout-validated models.
//!
//! Rows are shuffled with the configured seed and split 80/20; every metric
//! reported here is measured on the held-out 20%.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::ModelCandidate;
use crate::math::stats::{error_metrics, r_squared};
use crate::models::forest::{ForestParams, RandomForest, TreeParams};
use crate::models::regression::{Observations, labels_with_intercept, ols, require_features};
use crate::models::{EstimationInput, Estimator, EstimatorError};

const TEST_FRACTION: f64 = 0.2;
const MIN_ROWS: usize = 10;

/// Shuffled `(train, test)` row positions; the test side gets `ceil(0.2 n)`.
pub fn holdout_split(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let n_test = ((n as f64 * TEST_FRACTION).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
    let train = order.split_off(n_test);
    (train, order)
}

struct Split {
    train_x: Vec<Vec<f64>>,
    train_y: Vec<f64>,
    test_x: Vec<Vec<f64>>,
    test_y: Vec<f64>,
}

fn split(obs: &Observations, seed: u64) -> Split {
    let (train, test) = holdout_split(obs.len(), seed);
    let pick_x = |ids: &[usize]| -> Vec<Vec<f64>> { ids.iter().map(|&i| obs.features[i].clone()).collect() };
    let pick_y = |ids: &[usize]| -> Vec<f64> { ids.iter().map(|&i| obs.target[i]).collect() };
    Split {
        train_x: pick_x(&train),
        train_y: pick_y(&train),
        test_x: pick_x(&test),
        test_y: pick_y(&test),
    }
}

fn score(candidate: &mut ModelCandidate, actual: &[f64], predicted: &[f64], data: &Split, seed: u64) {
    if let Some((mae, mse)) = error_metrics(actual, predicted) {
        candidate.mae = Some(mae);
        candidate.mse = Some(mse);
    }
    candidate.r_squared = r_squared(actual, predicted);
    candidate.metrics.insert("train_rows".to_string(), data.train_y.len() as f64);
    candidate.metrics.insert("test_rows".to_string(), data.test_y.len() as f64);
    candidate
        .notes
        .push(format!("metrics measured on a 20% holdout (seed {seed})"));
}

/// Bagged regression trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomForestRegressor;

impl Estimator for RandomForestRegressor {
    fn name(&self) -> &str {
        "Random forest"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        obs.require(MIN_ROWS)?;

        let seed = input.config.seed;
        let data = split(&obs, seed);
        let params = ForestParams {
            n_trees: input.config.forest_trees,
            tree: TreeParams::default(),
        };
        let forest = RandomForest::fit(&data.train_x, &data.train_y, &params, seed);
        let predicted: Vec<f64> = data.test_x.iter().map(|row| forest.predict(row)).collect();

        let mut candidate = ModelCandidate::new(self.name(), input.target, obs.len());
        score(&mut candidate, &data.test_y, &predicted, &data, seed);
        for (feature, importance) in input.features.iter().zip(forest.feature_importances()) {
            candidate.metrics.insert(format!("importance[{feature}]"), importance);
        }
        candidate.metrics.insert("trees".to_string(), forest.n_trees() as f64);
        Ok(candidate)
    }
}

/// OLS fit on the training rows, scored on the holdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldoutOls;

impl Estimator for HoldoutOls {
    fn name(&self) -> &str {
        "OLS (holdout)"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        obs.require(MIN_ROWS.max(input.features.len() + 5))?;

        let seed = input.config.seed;
        let data = split(&obs, seed);
        let (fit, _) = ols(&data.train_x, &data.train_y, true)?;
        let predicted: Vec<f64> = data
            .test_x
            .iter()
            .map(|row| fit.beta[0] + row.iter().enumerate().map(|(j, v)| fit.beta[j + 1] * v).sum::<f64>())
            .collect();

        let mut candidate = ModelCandidate::new(self.name(), input.target, obs.len());
        score(&mut candidate, &data.test_y, &predicted, &data, seed);
        for (i, name) in labels_with_intercept(input.features).into_iter().enumerate() {
            candidate.coefficients.insert(name, fit.beta[i]);
        }
        Ok(candidate)
    }
}
