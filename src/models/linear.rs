//! Linear family: ordinary least squares with an intercept.

use crate::domain::ModelCandidate;
use crate::models::diagnostics::residual_diagnostics;
use crate::models::regression::{Observations, describe_fit, f_p_value, labels_with_intercept, ols, require_features};
use crate::models::{EstimationInput, Estimator, EstimatorError};

#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinaryLeastSquares;

impl Estimator for OrdinaryLeastSquares {
    fn name(&self) -> &str {
        "OLS"
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        let k = input.features.len() + 1;
        obs.require(k + 2)?;

        let (fit, y) = ols(&obs.features, &obs.target, true)?;
        let mut candidate = ModelCandidate::new(self.name(), input.target, obs.len());
        describe_fit(&mut candidate, &fit, &y, &labels_with_intercept(input.features));

        // Overall F test against the intercept-only model.
        if let Some(r2) = candidate.r_squared {
            let df_num = k - 1;
            let df_den = fit.df_resid();
            if r2 < 1.0 {
                let f = (r2 / df_num as f64) / ((1.0 - r2) / df_den as f64);
                candidate.metrics.insert("f_statistic".to_string(), f);
                if let Some(p) = f_p_value(f, df_num, df_den) {
                    candidate.metrics.insert("f_p_value".to_string(), p);
                }
            }
        }
        if let Some(diagnostics) = residual_diagnostics(&obs.features, fit.residuals.as_slice()) {
            diagnostics.attach(&mut candidate, input.config.significance_level);
        }
        Ok(candidate)
    }
}
