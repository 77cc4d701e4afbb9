//! Small-sample time-series family: Granger causality, ARDL(1,1) and an
//! Engle-Granger error correction model.
//!
//! All three treat the complete rows of the dataset as one ordered series.

use crate::domain::ModelCandidate;
use crate::math::stats::{error_metrics, r_squared};
use crate::models::regression::{
    Observations, describe_fit, f_p_value, labels_with_intercept, ols, require_features, t_p_value,
};
use crate::models::{EstimationInput, Estimator, EstimatorError};
use crate::stationarity::{AugmentedDickeyFuller, StationarityTest};

/// Granger causality F tests of the first feature on the target for lags
/// `1..=granger_max_lag`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrangerCausality;

/// Lagged regressors `[s_{t-1}, ..., s_{t-p}]` for `t = start..n`.
fn lags_of(series: &[f64], p: usize, start: usize) -> Vec<Vec<f64>> {
    (start..series.len())
        .map(|t| (1..=p).map(|j| series[t - j]).collect())
        .collect()
}

impl Estimator for GrangerCausality {
    fn name(&self) -> &str {
        "Granger causality"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let cause = &input.features[0];
        let obs = Observations::collect(input.dataset, input.target, std::slice::from_ref(cause))?;
        obs.require(5)?;

        let y = &obs.target;
        let x: Vec<f64> = obs.features.iter().map(|row| row[0]).collect();
        let n = y.len();

        let mut candidate = ModelCandidate::new(format!("Granger causality ({cause} -> {})", input.target), input.target, n);
        let mut best: Option<(f64, usize)> = None;

        for p in 1..=input.config.granger_max_lag {
            // Unrestricted residual degrees of freedom.
            let Some(df_den) = n
                .checked_sub(3 * p + 1)
                .filter(|df| *df > 0)
            else {
                break;
            };
            let restricted = lags_of(y, p, p);
            let unrestricted: Vec<Vec<f64>> = restricted
                .iter()
                .zip(lags_of(&x, p, p))
                .map(|(ry, rx)| ry.iter().chain(&rx).copied().collect())
                .collect();
            let target = &y[p..];

            let (Ok((fit_r, _)), Ok((fit_u, _))) = (ols(&restricted, target, true), ols(&unrestricted, target, true))
            else {
                continue;
            };
            if fit_u.ssr <= 0.0 {
                continue;
            }
            let f = ((fit_r.ssr - fit_u.ssr) / p as f64) / (fit_u.ssr / df_den as f64);
            let Some(p_value) = f_p_value(f.max(0.0), p, df_den) else {
                continue;
            };
            candidate.metrics.insert(format!("f_statistic[lag {p}]"), f);
            candidate.metrics.insert(format!("p_value[lag {p}]"), p_value);
            if best.is_none_or(|(best_p, _)| p_value < best_p) {
                best = Some((p_value, p));
            }
        }

        let Some((min_p, best_lag)) = best else {
            return Err(EstimatorError::InsufficientData {
                n_obs: n,
                required: 5,
            });
        };
        candidate.metrics.insert("min_p_value".to_string(), min_p);
        candidate.metrics.insert("best_lag".to_string(), best_lag as f64);
        candidate.notes.push(if min_p < input.config.significance_level {
            format!("{cause} Granger-causes {} at lag {best_lag}", input.target)
        } else {
            format!("no evidence that {cause} Granger-causes {}", input.target)
        });
        if input.order_of(input.target).is_some_and(|d| d > 0) || input.order_of(cause).is_some_and(|d| d > 0) {
            candidate
                .notes
                .push("series are not stationary in levels; F tests may be spurious".to_string());
        }
        Ok(candidate)
    }
}

/// `y_t = c + a y_{t-1} + Σ_f (b0_f x_{f,t} + b1_f x_{f,t-1})`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributedLag;

impl Estimator for DistributedLag {
    fn name(&self) -> &str {
        "ARDL(1,1)"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        let k = 2 + 2 * input.features.len();
        obs.require(k + 3)?;

        let rows: Vec<Vec<f64>> = (1..obs.len())
            .map(|t| {
                let mut row = vec![obs.target[t - 1]];
                for f in 0..input.features.len() {
                    row.push(obs.features[t][f]);
                    row.push(obs.features[t - 1][f]);
                }
                row
            })
            .collect();

        let mut names = vec![format!("{}(t-1)", input.target)];
        for feature in input.features {
            names.push(feature.clone());
            names.push(format!("{feature}(t-1)"));
        }

        let (fit, y) = ols(&rows, &obs.target[1..], true)?;
        let mut candidate = ModelCandidate::new(self.name(), input.target, rows.len());
        describe_fit(&mut candidate, &fit, &y, &labels_with_intercept(&names));

        // Long-run multiplier of each feature: (b0 + b1) / (1 - a).
        let a = fit.beta[1];
        if (1.0 - a).abs() > 1e-8 {
            for (f, feature) in input.features.iter().enumerate() {
                let b = fit.beta[2 + 2 * f] + fit.beta[3 + 2 * f];
                candidate.metrics.insert(format!("long_run[{feature}]"), b / (1.0 - a));
            }
        }
        Ok(candidate)
    }
}

/// Two-step Engle-Granger error correction model between the target and the
/// first feature. Runs only when both are known to be I(1).
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorCorrection;

impl Estimator for ErrorCorrection {
    fn name(&self) -> &str {
        "Error correction (Engle-Granger)"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let feature = &input.features[0];
        if input.integration.is_none() {
            return Err(EstimatorError::NotApplicable(
                "orders of integration were not analysed".to_string(),
            ));
        }
        let (target_order, feature_order) = (input.order_of(input.target), input.order_of(feature));
        if target_order != Some(1) || feature_order != Some(1) {
            return Err(EstimatorError::NotApplicable(format!(
                "needs I(1) target and feature, got {} = {} and {feature} = {}",
                input.target,
                describe_order(target_order),
                describe_order(feature_order)
            )));
        }

        let obs = Observations::collect(input.dataset, input.target, std::slice::from_ref(feature))?;
        obs.require(8)?;
        let y = &obs.target;
        let x: Vec<f64> = obs.features.iter().map(|row| row[0]).collect();

        // Step 1: long-run (cointegrating) regression in levels.
        let (long_run, _) = ols(&obs.features, y, true)?;
        let ec = long_run.residuals.as_slice();

        // Step 2: Δy_t = c + g Δx_t + alpha ec_{t-1}.
        let rows: Vec<Vec<f64>> = (1..y.len()).map(|t| vec![x[t] - x[t - 1], ec[t - 1]]).collect();
        let dy: Vec<f64> = (1..y.len()).map(|t| y[t] - y[t - 1]).collect();
        let (short_run, _) = ols(&rows, &dy, true)?;

        // Levels forecast: y_{t-1} + predicted change.
        let predicted: Vec<f64> = (1..y.len()).map(|t| y[t - 1] + short_run.fitted[t - 1]).collect();
        let actual = &y[1..];

        let mut candidate = ModelCandidate::new(self.name(), input.target, rows.len());
        if let Some((mae, mse)) = error_metrics(actual, &predicted) {
            candidate.mae = Some(mae);
            candidate.mse = Some(mse);
        }
        candidate.r_squared = r_squared(actual, &predicted);

        let alpha = short_run.beta[2];
        candidate.coefficients.insert("const".to_string(), short_run.beta[0]);
        candidate.coefficients.insert(format!("d({feature})"), short_run.beta[1]);
        candidate.coefficients.insert("ec(t-1)".to_string(), alpha);
        candidate.metrics.insert("adjustment_speed".to_string(), alpha);
        if let Some(p) = t_p_value(short_run.t_value(2), short_run.df_resid()) {
            candidate.metrics.insert("adjustment_p_value".to_string(), p);
        }
        candidate.metrics.insert(format!("long_run[{feature}]"), long_run.beta[1]);

        match AugmentedDickeyFuller.compute(ec) {
            Ok(stat) => {
                candidate.metrics.insert("residual_adf_statistic".to_string(), stat.statistic);
            }
            Err(err) => candidate.notes.push(format!("residual unit-root test failed: {err}")),
        }
        if alpha >= 0.0 {
            candidate
                .notes
                .push("non-negative adjustment speed: no error correction toward equilibrium".to_string());
        }
        Ok(candidate)
    }
}

fn describe_order(order: Option<usize>) -> String {
    order.map_or_else(|| "I(?)".to_string(), |d| format!("I({d})"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::classify::ResolvedRoles;
    use crate::data::{Column, Dataset};
    use crate::domain::{AnalysisConfig, IntegrationOrder};
    use crate::data::sample::{integrated, white_noise};

    /// `x` is a random walk; `y_t = 0.8 x_{t-1} + small noise`.
    fn lead_lag(n: usize) -> Dataset {
        let x = integrated(n, 1, 3);
        let e = white_noise(n, 4);
        let mut y = vec![0.0; n];
        for t in 1..n {
            y[t] = 0.8 * x[t - 1] + 0.1 * e[t];
        }
        Dataset::from_columns(vec![Column::numeric("x", x), Column::numeric("y", y)]).unwrap()
    }

    fn run(
        estimator: &dyn Estimator,
        ds: &Dataset,
        integration: Option<&BTreeMap<String, IntegrationOrder>>,
    ) -> Result<ModelCandidate, EstimatorError> {
        let roles = ResolvedRoles::default();
        let config = AnalysisConfig::default();
        let features = vec!["x".to_string()];
        estimator.estimate(&EstimationInput {
            dataset: ds,
            target: "y",
            features: &features,
            roles: &roles,
            integration,
            config: &config,
        })
    }

    #[test]
    fn granger_detects_lagged_dependence() {
        let candidate = run(&GrangerCausality, &lead_lag(120), None).unwrap();
        assert!(candidate.metrics["p_value[lag 1]"] < 1e-6);
        assert_eq!(candidate.mae, None);
        assert!(candidate.notes[0].contains("Granger-causes"));
    }

    #[test]
    fn granger_needs_observations() {
        let ds = Dataset::from_columns(vec![
            Column::numeric("x", vec![1.0, 2.0, 3.0]),
            Column::numeric("y", vec![2.0, 1.0, 3.0]),
        ])
        .unwrap();
        assert!(matches!(
            run(&GrangerCausality, &ds, None),
            Err(EstimatorError::InsufficientData { .. })
        ));
    }

    #[test]
    fn ardl_fits_lead_lag_relation() {
        let candidate = run(&DistributedLag, &lead_lag(120), None).unwrap();
        assert!((candidate.coefficients["x(t-1)"] - 0.8).abs() < 0.05);
        assert!(candidate.r_squared.unwrap() > 0.99);
    }

    #[test]
    fn ecm_requires_integration_orders() {
        let ds = lead_lag(120);
        assert!(matches!(
            run(&ErrorCorrection, &ds, None),
            Err(EstimatorError::NotApplicable(_))
        ));

        let mut orders = BTreeMap::new();
        orders.insert("x".to_string(), IntegrationOrder::found(1, 0));
        orders.insert("y".to_string(), IntegrationOrder::found(0, 0));
        assert!(matches!(
            run(&ErrorCorrection, &ds, Some(&orders)),
            Err(EstimatorError::NotApplicable(_))
        ));
    }

    #[test]
    fn ecm_on_cointegrated_pair() {
        let ds = lead_lag(120);
        let mut orders = BTreeMap::new();
        orders.insert("x".to_string(), IntegrationOrder::found(1, 0));
        orders.insert("y".to_string(), IntegrationOrder::found(1, 0));

        let candidate = run(&ErrorCorrection, &ds, Some(&orders)).unwrap();
        assert!(candidate.metrics["adjustment_speed"] < 0.0);
        assert!((candidate.metrics["long_run[x]"] - 0.8).abs() < 0.05);
        assert!(candidate.mae.is_some());
    }
}
