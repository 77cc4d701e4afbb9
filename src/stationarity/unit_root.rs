//! Unit-root tests: augmented Dickey-Fuller, Dickey-Fuller, Phillips-Perron.
//!
//! All three use a constant-only deterministic term and MacKinnon p-values.

use nalgebra::DVector;

use crate::math::ols::{OlsFit, design_matrix, fit_ols};
use crate::math::stats::diff;
use crate::stationarity::mackinnon;
use crate::stationarity::{StationarityTest, TestError, TestFamily, TestStatistic, check_series};

/// Schwert's rule `ceil(12 (n / 100)^{1/4})`.
pub(crate) fn schwert_lags(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Rows `t = start..n-1` of `Δy_{t+1} = a + b y_t + Σ_{j=1}^{p} c_j Δy_{t+1-j}`.
///
/// `dy[t] = y[t+1] - y[t]`, so `dy[t]` is regressed on `y[t]` and
/// `dy[t-1], ..., dy[t-p]`. Column 1 is the level coefficient.
fn adf_regression(y: &[f64], dy: &[f64], lags: usize, start: usize) -> Option<OlsFit> {
    let rows: Vec<Vec<f64>> = (start..dy.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lags + 1);
            row.push(y[t]);
            row.extend((1..=lags).map(|j| dy[t - j]));
            row
        })
        .collect();
    let target = DVector::from_iterator(dy.len() - start, dy[start..].iter().copied());
    fit_ols(&design_matrix(&rows, true), &target)
}

fn tau_statistic(fit: &OlsFit, lags: usize) -> Result<TestStatistic, TestError> {
    let tau = fit.t_value(1);
    if !tau.is_finite() {
        return Err(TestError::Numerical("non-finite test statistic".to_string()));
    }
    Ok(TestStatistic {
        statistic: tau,
        p_value: mackinnon::p_value(tau),
        lags,
        n_obs: fit.n_obs,
        critical_values: mackinnon::critical_values(fit.n_obs),
    })
}

/// Augmented Dickey-Fuller with the lag order chosen by AIC.
///
/// Candidate lags `0..=maxlag` are compared on the common sample that the
/// largest lag allows; the winner is refit on its full sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentedDickeyFuller;

impl AugmentedDickeyFuller {
    /// `min(schwert, n/2 - 2)`, or `None` when the sample is too short.
    pub fn max_lag(n: usize) -> Option<usize> {
        let cap = (n / 2).checked_sub(2)?;
        Some(schwert_lags(n).min(cap))
    }

    fn select_lag(y: &[f64], dy: &[f64], max_lag: usize) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for lag in 0..=max_lag {
            let Some(fit) = adf_regression(y, dy, lag, max_lag) else {
                continue;
            };
            let aic = fit.aic();
            // Strict comparison keeps the smaller lag on ties.
            if best.is_none_or(|(best_aic, _)| aic < best_aic) {
                best = Some((aic, lag));
            }
        }
        best.map(|(_, lag)| lag)
    }
}

impl StationarityTest for AugmentedDickeyFuller {
    fn name(&self) -> &str {
        "ADF"
    }

    fn family(&self) -> TestFamily {
        TestFamily::UnitRoot
    }

    fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError> {
        check_series(series, 4)?;
        let max_lag = Self::max_lag(series.len()).ok_or(TestError::InsufficientData {
            n_obs: series.len(),
            required: 4,
        })?;
        let dy = diff(series);

        let lag = Self::select_lag(series, &dy, max_lag)
            .ok_or_else(|| TestError::Numerical("no lag order could be fitted".to_string()))?;
        let fit = adf_regression(series, &dy, lag, lag)
            .ok_or_else(|| TestError::Numerical("singular test regression".to_string()))?;
        tau_statistic(&fit, lag)
    }
}

/// Dickey-Fuller: the ADF regression without lagged differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct DickeyFuller;

impl StationarityTest for DickeyFuller {
    fn name(&self) -> &str {
        "DF"
    }

    fn family(&self) -> TestFamily {
        TestFamily::UnitRoot
    }

    fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError> {
        check_series(series, 4)?;
        let dy = diff(series);
        let fit = adf_regression(series, &dy, 0, 0)
            .ok_or_else(|| TestError::Numerical("singular test regression".to_string()))?;
        tau_statistic(&fit, 0)
    }
}

/// Phillips-Perron Z-tau with a Bartlett-kernel long-run variance.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhillipsPerron;

/// Newey-West long-run variance of (already mean-zero) residuals.
fn long_run_variance(u: &[f64], lags: usize) -> f64 {
    let n = u.len() as f64;
    let autocov = |j: usize| u[j..].iter().zip(u).map(|(a, b)| a * b).sum::<f64>() / n;
    let mut lam2 = autocov(0);
    for j in 1..=lags.min(u.len().saturating_sub(1)) {
        let weight = 1.0 - j as f64 / (lags as f64 + 1.0);
        lam2 += 2.0 * weight * autocov(j);
    }
    lam2
}

impl StationarityTest for PhillipsPerron {
    fn name(&self) -> &str {
        "PP"
    }

    fn family(&self) -> TestFamily {
        TestFamily::UnitRoot
    }

    fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError> {
        check_series(series, 4)?;
        let lags = schwert_lags(series.len());

        // y_t = rho y_{t-1} + c; column 0 is rho.
        let rows: Vec<Vec<f64>> = series[..series.len() - 1].iter().map(|&v| vec![v, 1.0]).collect();
        let target = DVector::from_iterator(series.len() - 1, series[1..].iter().copied());
        let fit = fit_ols(&design_matrix(&rows, false), &target)
            .ok_or_else(|| TestError::Numerical("singular test regression".to_string()))?;

        let n = fit.n_obs;
        let k = fit.n_params;
        if n + k - 1 <= lags {
            return Err(TestError::InsufficientData {
                n_obs: series.len(),
                required: lags + 3 - k,
            });
        }

        let u = fit.residuals.as_slice();
        let lam2 = long_run_variance(u, lags);
        if lam2 <= 0.0 {
            return Err(TestError::Numerical("non-positive long-run variance".to_string()));
        }
        let lam = lam2.sqrt();
        let n_f = n as f64;
        let s2 = fit.ssr / (n - k) as f64;
        let s = s2.sqrt();
        let gamma0 = s2 * (n - k) as f64 / n_f;
        let sigma = fit.std_errors[0];
        let rho = fit.beta[0];

        let z_tau = gamma0.sqrt() / lam * ((rho - 1.0) / sigma)
            - 0.5 * ((lam2 - gamma0) / lam) * (n_f * sigma / s);
        if !z_tau.is_finite() {
            return Err(TestError::Numerical("non-finite test statistic".to_string()));
        }

        Ok(TestStatistic {
            statistic: z_tau,
            p_value: mackinnon::p_value(z_tau),
            lags,
            n_obs: n,
            critical_values: mackinnon::critical_values(n),
        })
    }
}
