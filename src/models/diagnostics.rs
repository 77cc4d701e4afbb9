//! Residual diagnostics for least-squares fits.
//!
//! - homoscedasticity: Breusch-Pagan, Koenker's studentized form `n R²` from
//!   the regression of squared residuals on the design, chi-squared with one
//!   degree of freedom per feature
//! - no autocorrelation: Durbin-Watson and the lag-1 residual correlation
//! - normality: Jarque-Bera, chi-squared with two degrees of freedom

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::domain::ModelCandidate;
use crate::math::stats::pearson;
use crate::models::regression::ols;

/// Lag-1 residual correlation at or above this flags autocorrelation.
pub const AUTOCORRELATION_LIMIT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualDiagnostics {
    pub breusch_pagan: f64,
    pub breusch_pagan_p_value: Option<f64>,
    pub durbin_watson: f64,
    pub residual_autocorrelation: Option<f64>,
    pub jarque_bera: f64,
    pub jarque_bera_p_value: Option<f64>,
}

fn chi_squared_p_value(stat: f64, df: usize) -> Option<f64> {
    let dist = ChiSquared::new(df as f64).ok()?;
    Some(1.0 - dist.cdf(stat))
}

fn breusch_pagan(rows: &[Vec<f64>], residuals: &[f64]) -> Option<(f64, Option<f64>)> {
    let df = rows.first()?.len();
    let squared: Vec<f64> = residuals.iter().map(|e| e * e).collect();
    let (fit, y) = ols(rows, &squared, true).ok()?;
    // Exact fits leave constant squared residuals: nothing to explain.
    let r2 = fit.r_squared(&y).unwrap_or(0.0);
    let stat = residuals.len() as f64 * r2;
    Some((stat, chi_squared_p_value(stat, df)))
}

fn jarque_bera(residuals: &[f64]) -> (f64, Option<f64>) {
    let n = residuals.len() as f64;
    let m = residuals.iter().sum::<f64>() / n;
    let moment = |p: i32| residuals.iter().map(|e| (e - m).powi(p)).sum::<f64>() / n;
    let m2 = moment(2);
    if m2 <= 0.0 {
        return (0.0, Some(1.0));
    }
    let skew = moment(3) / m2.powf(1.5);
    let kurtosis = moment(4) / (m2 * m2);
    let stat = n / 6.0 * (skew * skew + (kurtosis - 3.0).powi(2) / 4.0);
    (stat, chi_squared_p_value(stat, 2))
}

/// Run every check on the residuals of a fit on `rows` (features only, no
/// intercept column). `None` when there are fewer than three residuals.
pub fn residual_diagnostics(rows: &[Vec<f64>], residuals: &[f64]) -> Option<ResidualDiagnostics> {
    if residuals.len() < 3 || rows.len() != residuals.len() {
        return None;
    }
    let (breusch_pagan, breusch_pagan_p_value) = breusch_pagan(rows, residuals)?;
    let ssr: f64 = residuals.iter().map(|e| e * e).sum();
    let durbin_watson = if ssr > 0.0 {
        residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum::<f64>() / ssr
    } else {
        2.0
    };
    let n = residuals.len();
    let residual_autocorrelation = pearson(&residuals[1..], &residuals[..n - 1]);
    let (jarque_bera, jarque_bera_p_value) = jarque_bera(residuals);

    Some(ResidualDiagnostics {
        breusch_pagan,
        breusch_pagan_p_value,
        durbin_watson,
        residual_autocorrelation,
        jarque_bera,
        jarque_bera_p_value,
    })
}

impl ResidualDiagnostics {
    /// Record the statistics as metrics and add a note per failed check.
    pub fn attach(&self, candidate: &mut ModelCandidate, significance: f64) {
        let metrics = &mut candidate.metrics;
        metrics.insert("breusch_pagan".to_string(), self.breusch_pagan);
        metrics.insert("durbin_watson".to_string(), self.durbin_watson);
        metrics.insert("jarque_bera".to_string(), self.jarque_bera);
        if let Some(p) = self.breusch_pagan_p_value {
            metrics.insert("breusch_pagan_p_value".to_string(), p);
        }
        if let Some(r) = self.residual_autocorrelation {
            metrics.insert("residual_autocorrelation".to_string(), r);
        }
        if let Some(p) = self.jarque_bera_p_value {
            metrics.insert("jarque_bera_p_value".to_string(), p);
        }

        if self.breusch_pagan_p_value.is_some_and(|p| p < significance) {
            candidate.notes.push("residuals are heteroscedastic (Breusch-Pagan)".to_string());
        }
        if self
            .residual_autocorrelation
            .is_some_and(|r| r.abs() >= AUTOCORRELATION_LIMIT)
        {
            candidate.notes.push("residuals are autocorrelated".to_string());
        }
        if self.jarque_bera_p_value.is_some_and(|p| p < significance) {
            candidate.notes.push("residuals are not normal (Jarque-Bera)".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{integrated, white_noise};

    fn rows(x: &[f64]) -> Vec<Vec<f64>> {
        x.iter().map(|v| vec![*v]).collect()
    }

    /// Residuals of `y = 1 + 2x + e` fitted by OLS.
    fn residuals(x: &[f64], e: &[f64]) -> Vec<f64> {
        let y: Vec<f64> = x.iter().zip(e).map(|(a, b)| 1.0 + 2.0 * a + b).collect();
        let (fit, _) = ols(&rows(x), &y, true).unwrap();
        fit.residuals.as_slice().to_vec()
    }

    fn noted(d: &ResidualDiagnostics) -> Vec<String> {
        let mut candidate = ModelCandidate::new("OLS", "y", 200);
        d.attach(&mut candidate, 0.05);
        assert!(candidate.metrics.contains_key("durbin_watson"));
        candidate.notes
    }

    #[test]
    fn well_behaved_errors_pass_every_check() {
        let x = white_noise(200, 5);
        let e: Vec<f64> = white_noise(200, 6).iter().map(|v| 0.5 * v).collect();
        let d = residual_diagnostics(&rows(&x), &residuals(&x, &e)).unwrap();

        assert!((d.breusch_pagan - 0.5757).abs() < 1e-3);
        assert!((d.breusch_pagan_p_value.unwrap() - 0.448).abs() < 1e-3);
        assert!((d.durbin_watson - 1.9712).abs() < 1e-3);
        assert!((d.jarque_bera - 2.815).abs() < 1e-3);
        assert!(noted(&d).is_empty());
    }

    #[test]
    fn spread_growing_with_x_is_heteroscedastic() {
        let x: Vec<f64> = (0..200).map(|i| 1.0 + 9.0 * i as f64 / 199.0).collect();
        let e: Vec<f64> = white_noise(200, 6)
            .iter()
            .zip(&x)
            .map(|(v, a)| 0.5 * a * v)
            .collect();
        let d = residual_diagnostics(&rows(&x), &residuals(&x, &e)).unwrap();

        assert!((d.breusch_pagan - 41.31).abs() < 1e-2);
        assert!(d.breusch_pagan_p_value.unwrap() < 1e-8);
        assert_eq!(noted(&d), vec!["residuals are heteroscedastic (Breusch-Pagan)"]);
    }

    #[test]
    fn random_walk_errors_are_autocorrelated() {
        let x = white_noise(200, 5);
        let e: Vec<f64> = integrated(200, 1, 6).iter().map(|v| 0.5 * v).collect();
        let d = residual_diagnostics(&rows(&x), &residuals(&x, &e)).unwrap();

        assert!(d.durbin_watson < 0.2);
        assert!(d.residual_autocorrelation.unwrap() > 0.9);
        assert!(noted(&d).contains(&"residuals are autocorrelated".to_string()));
    }

    #[test]
    fn skewed_errors_are_not_normal() {
        let x = white_noise(200, 5);
        let e: Vec<f64> = white_noise(200, 6).iter().map(|v| 0.5 * v * v).collect();
        let d = residual_diagnostics(&rows(&x), &residuals(&x, &e)).unwrap();

        assert!((d.jarque_bera - 188.68).abs() < 1e-1);
        assert_eq!(noted(&d), vec!["residuals are not normal (Jarque-Bera)"]);
    }

    #[test]
    fn too_few_residuals() {
        assert!(residual_diagnostics(&[vec![1.0], vec![2.0]], &[0.1, -0.1]).is_none());
    }
}
