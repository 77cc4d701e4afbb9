//! Non-linear family: polynomial regression on standardized features.

use crate::domain::ModelCandidate;
use crate::math::stats::{mean, sample_std};
use crate::models::regression::{Observations, describe_fit, ols, require_features};
use crate::models::{EstimationInput, Estimator, EstimatorError};

/// `y = b0 + Σ_f Σ_{p=1..degree} b_{f,p} z_f^p` with `z_f` the standardized feature.
#[derive(Debug, Clone)]
pub struct PolynomialRegression {
    degree: u32,
    name: String,
}

impl PolynomialRegression {
    pub fn new(degree: u32) -> Self {
        Self {
            degree,
            name: format!("Polynomial (degree {degree})"),
        }
    }
}

impl Estimator for PolynomialRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn estimate(&self, input: &EstimationInput<'_>) -> Result<ModelCandidate, EstimatorError> {
        require_features(input.features)?;
        let obs = Observations::collect(input.dataset, input.target, input.features)?;
        let k = input.features.len() * self.degree as usize + 1;
        obs.require(k + 2)?;

        // Column-wise standardization keeps high powers well conditioned.
        let mut scales = Vec::with_capacity(input.features.len());
        for f in 0..input.features.len() {
            let column: Vec<f64> = obs.features.iter().map(|row| row[f]).collect();
            let m = mean(&column).unwrap_or(0.0);
            let s = sample_std(&column).filter(|s| *s > 0.0).ok_or_else(|| {
                EstimatorError::Numerical(format!("feature `{}` is constant", input.features[f]))
            })?;
            scales.push((m, s));
        }

        let expanded: Vec<Vec<f64>> = obs
            .features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&scales)
                    .flat_map(|(v, (m, s))| {
                        let z = (v - m) / s;
                        (1..=self.degree).map(move |p| z.powi(p as i32))
                    })
                    .collect()
            })
            .collect();

        let mut names = vec!["const".to_string()];
        for feature in input.features {
            for p in 1..=self.degree {
                names.push(if p == 1 {
                    format!("z({feature})")
                } else {
                    format!("z({feature})^{p}")
                });
            }
        }

        let (fit, y) = ols(&expanded, &obs.target, true)?;
        let mut candidate = ModelCandidate::new(self.name(), input.target, obs.len());
        describe_fit(&mut candidate, &fit, &y, &names);
        candidate
            .notes
            .push("features standardized to zero mean and unit variance before expansion".to_string());
        Ok(candidate)
    }
}
