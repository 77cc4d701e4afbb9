//! Shared plumbing for regression-type estimators.

use nalgebra::DVector;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::data::Dataset;
use crate::domain::ModelCandidate;
use crate::math::ols::{OlsFit, design_matrix, fit_ols};
use crate::math::stats::error_metrics;
use crate::models::EstimatorError;

/// Rows of `dataset` where the target and every feature are present.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    /// Row numbers in the dataset.
    pub rows: Vec<usize>,
    pub target: Vec<f64>,
    /// Row-major feature values, one inner vector per kept row.
    pub features: Vec<Vec<f64>>,
}

impl Observations {
    pub fn collect(dataset: &Dataset, target: &str, features: &[String]) -> Result<Self, EstimatorError> {
        let numeric = |name: &str| {
            dataset
                .column(name)
                .and_then(|c| c.as_numeric())
                .ok_or_else(|| EstimatorError::NotApplicable(format!("`{name}` is not a numeric column")))
        };
        let y = numeric(target)?;
        let xs = features
            .iter()
            .map(|f| numeric(f.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut obs = Observations {
            rows: Vec::new(),
            target: Vec::new(),
            features: Vec::new(),
        };
        for row in 0..dataset.row_count() {
            let Some(yv) = y[row] else { continue };
            let Some(xv) = xs.iter().map(|x| x[row]).collect::<Option<Vec<f64>>>() else {
                continue;
            };
            obs.rows.push(row);
            obs.target.push(yv);
            obs.features.push(xv);
        }
        Ok(obs)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn require(&self, required: usize) -> Result<(), EstimatorError> {
        if self.len() < required {
            return Err(EstimatorError::InsufficientData {
                n_obs: self.len(),
                required,
            });
        }
        Ok(())
    }
}

pub fn require_features(features: &[String]) -> Result<(), EstimatorError> {
    if features.is_empty() {
        return Err(EstimatorError::NotApplicable("no feature columns".to_string()));
    }
    Ok(())
}

/// Fit OLS, mapping a rank-deficient design to an estimator error.
pub fn ols(rows: &[Vec<f64>], y: &[f64], intercept: bool) -> Result<(OlsFit, DVector<f64>), EstimatorError> {
    let x = design_matrix(rows, intercept);
    let y = DVector::from_column_slice(y);
    let fit = fit_ols(&x, &y)
        .ok_or_else(|| EstimatorError::Numerical("singular or underdetermined design".to_string()))?;
    Ok((fit, y))
}

/// Two-sided p-value of a t statistic.
pub fn t_p_value(t: f64, df: usize) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, df as f64).ok()?;
    Some(2.0 * (1.0 - dist.cdf(t.abs())))
}

/// Upper-tail p-value of an F statistic.
pub fn f_p_value(f: f64, df_num: usize, df_den: usize) -> Option<f64> {
    let dist = FisherSnedecor::new(df_num as f64, df_den as f64).ok()?;
    Some(1.0 - dist.cdf(f))
}

/// Fill in-sample error metrics, R² and per-coefficient estimates.
///
/// `names` labels the columns of the design, intercept included.
pub fn describe_fit(candidate: &mut ModelCandidate, fit: &OlsFit, y: &DVector<f64>, names: &[String]) {
    if let Some((mae, mse)) = error_metrics(y.as_slice(), fit.fitted.as_slice()) {
        candidate.mae = Some(mae);
        candidate.mse = Some(mse);
    }
    candidate.r_squared = fit.r_squared(y);
    if let Some(adj) = fit.adjusted_r_squared(y) {
        candidate.metrics.insert("adj_r_squared".to_string(), adj);
    }
    candidate.metrics.insert("aic".to_string(), fit.aic());

    for (i, name) in names.iter().enumerate() {
        candidate.coefficients.insert(name.clone(), fit.beta[i]);
        if let Some(p) = t_p_value(fit.t_value(i), fit.df_resid()) {
            candidate.metrics.insert(format!("p_value[{name}]"), p);
        }
    }
}

/// Coefficient labels: `const` followed by the feature names.
pub fn labels_with_intercept(features: &[String]) -> Vec<String> {
    std::iter::once("const".to_string())
        .chain(features.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    #[test]
    fn observations_skip_incomplete_rows() {
        let ds = Dataset::from_columns(vec![
            Column::numeric_opt("y", vec![Some(1.0), Some(2.0), None, Some(4.0)]),
            Column::numeric_opt("x", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
        ])
        .unwrap();
        let obs = Observations::collect(&ds, "y", &["x".to_string()]).unwrap();
        assert_eq!(obs.rows, vec![0, 3]);
        assert_eq!(obs.features, vec![vec![1.0], vec![4.0]]);
    }

    #[test]
    fn text_target_is_not_applicable() {
        let ds = Dataset::from_columns(vec![Column::text("y", vec!["a"])]).unwrap();
        assert!(matches!(
            Observations::collect(&ds, "y", &[]),
            Err(EstimatorError::NotApplicable(_))
        ));
    }

    #[test]
    fn p_values_are_in_unit_interval() {
        let p = t_p_value(2.0, 30).unwrap();
        assert!(p > 0.04 && p < 0.06);
        let p = f_p_value(4.0, 2, 50).unwrap();
        assert!(p > 0.01 && p < 0.05);
    }
}
