//! Ordinary least squares.
//!
//! Every regression in the crate (unit-root test regressions, OLS-family
//! estimators, tree-free baselines) goes through this module:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - The coefficients come from an SVD solve so that tall design matrices work
//!   (nalgebra's `QR::solve` only handles square systems).
//! - Standard errors need `(X'X)^{-1}`; if that inverse does not exist the fit is
//!   rejected rather than reported with meaningless standard errors.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// A fitted OLS regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    pub fitted: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// `ssr / (n - k)`.
    pub sigma2: f64,
    pub std_errors: DVector<f64>,
    pub n_obs: usize,
    pub n_params: usize,
}

impl OlsFit {
    pub fn t_value(&self, i: usize) -> f64 {
        self.beta[i] / self.std_errors[i]
    }

    pub fn df_resid(&self) -> usize {
        self.n_obs - self.n_params
    }

    /// Centered R²; `None` when `y` is constant.
    pub fn r_squared(&self, y: &DVector<f64>) -> Option<f64> {
        let mean = y.mean();
        let sst: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
        (sst > 0.0).then(|| 1.0 - self.ssr / sst)
    }

    pub fn adjusted_r_squared(&self, y: &DVector<f64>) -> Option<f64> {
        let r2 = self.r_squared(y)?;
        if self.n_obs <= self.n_params {
            return None;
        }
        let n = self.n_obs as f64;
        let k = self.n_params as f64;
        // k counts the intercept.
        Some(1.0 - (1.0 - r2) * (n - 1.0) / (n - k))
    }

    /// Gaussian log-likelihood evaluated at the ML variance `ssr / n`.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.n_obs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.n_params as f64
    }
}

/// Fit `y = X β + e` with classical (homoskedastic) standard errors.
///
/// Returns `None` when there are no residual degrees of freedom, when the
/// design is rank deficient, or when the solve produces non-finite values.
pub fn fit_ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let (n, k) = x.shape();
    if n != y.len() || k == 0 || n <= k {
        return None;
    }

    // Collinear designs have no unique solution.
    let singular = x.clone().svd(false, false).singular_values;
    let max_sv = singular.max();
    if max_sv <= 0.0 || singular.min() <= max_sv * 1e-10 {
        return None;
    }

    let beta = solve_least_squares(x, y)?;
    let fitted = x * &beta;
    let residuals = y - &fitted;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (n - k) as f64;

    let xtx_inv = (x.transpose() * x).try_inverse()?;
    let std_errors = DVector::from_iterator(k, (0..k).map(|i| (sigma2 * xtx_inv[(i, i)]).sqrt()));
    if !std_errors.iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(OlsFit {
        beta,
        fitted,
        residuals,
        ssr,
        sigma2,
        std_errors,
        n_obs: n,
        n_params: k,
    })
}

/// Design matrix from row vectors, optionally prefixed with an intercept column.
pub fn design_matrix(rows: &[Vec<f64>], intercept: bool) -> DMatrix<f64> {
    let k = rows.first().map_or(0, Vec::len) + usize::from(intercept);
    DMatrix::from_fn(rows.len(), k, |r, c| {
        if intercept {
            if c == 0 { 1.0 } else { rows[r][c - 1] }
        } else {
            rows[r][c]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_ols_reports_standard_errors() {
        // y = 1 + 2x + e with e alternating ±0.1.
        let xs: Vec<f64> = (0..10).map(f64::from).collect();
        let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![x]).collect();
        let y = DVector::from_iterator(
            10,
            xs.iter()
                .enumerate()
                .map(|(i, &x)| 1.0 + 2.0 * x + if i % 2 == 0 { 0.1 } else { -0.1 }),
        );
        let x = design_matrix(&rows, true);

        let fit = fit_ols(&x, &y).unwrap();
        assert!((fit.beta[1] - 2.0).abs() < 0.05);
        assert!(fit.std_errors[1] > 0.0);
        assert!(fit.t_value(1) > 100.0);
        assert_eq!(fit.df_resid(), 8);
        assert!(fit.r_squared(&y).unwrap() > 0.999);
    }

    #[test]
    fn fit_ols_rejects_collinear_design() {
        let rows: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let x = design_matrix(&rows, true);
        let y = DVector::from_iterator(6, (0..6).map(|i| i as f64));
        assert!(fit_ols(&x, &y).is_none());
    }

    #[test]
    fn fit_ols_needs_residual_degrees_of_freedom() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(fit_ols(&x, &y).is_none());
    }
}
