//! KPSS level-stationarity test (Kwiatkowski, Phillips, Schmidt and Shin).
//!
//! The bandwidth is chosen automatically (Hobijn, Franses and Ooms, 1998)
//! and the p-value is interpolated from the tabulated critical values, so it
//! is clamped to `[0.01, 0.10]`.

use std::collections::BTreeMap;

use crate::stationarity::{StationarityTest, TestError, TestFamily, TestStatistic, check_series};

const CRITICAL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const P_VALUES: [f64; 4] = [0.10, 0.05, 0.025, 0.01];
const LEVELS: [&str; 4] = ["10%", "5%", "2.5%", "1%"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Kpss;

fn lagged_product(resid: &[f64], lag: usize) -> f64 {
    resid[lag..].iter().zip(resid).map(|(a, b)| a * b).sum()
}

/// Automatic Bartlett bandwidth.
pub fn auto_lags(resid: &[f64]) -> usize {
    let n = resid.len();
    let n_f = n as f64;
    let cov_lags = (n_f.powf(2.0 / 9.0) as usize).min(n.saturating_sub(1));

    let mut s0 = resid.iter().map(|r| r * r).sum::<f64>() / n_f;
    let mut s1 = 0.0;
    for i in 1..=cov_lags {
        let prod = lagged_product(resid, i) / (n_f / 2.0);
        s0 += prod;
        s1 += i as f64 * prod;
    }
    let s_hat = s1 / s0;
    let gamma = 1.1447 * (s_hat * s_hat).powf(1.0 / 3.0);
    let lags = gamma * n_f.powf(1.0 / 3.0);
    if lags.is_finite() && lags > 0.0 {
        (lags as usize).min(n.saturating_sub(1))
    } else {
        0
    }
}

/// Interpolated p-value, clamped to the table's range.
pub fn p_value(statistic: f64) -> f64 {
    if statistic <= CRITICAL[0] {
        return P_VALUES[0];
    }
    for i in 0..CRITICAL.len() - 1 {
        if statistic <= CRITICAL[i + 1] {
            let w = (statistic - CRITICAL[i]) / (CRITICAL[i + 1] - CRITICAL[i]);
            return P_VALUES[i] + w * (P_VALUES[i + 1] - P_VALUES[i]);
        }
    }
    P_VALUES[CRITICAL.len() - 1]
}

impl StationarityTest for Kpss {
    fn name(&self) -> &str {
        "KPSS"
    }

    fn family(&self) -> TestFamily {
        TestFamily::Stationarity
    }

    fn compute(&self, series: &[f64]) -> Result<TestStatistic, TestError> {
        check_series(series, 3)?;
        let n = series.len();
        let n_f = n as f64;
        let mean = series.iter().sum::<f64>() / n_f;
        let resid: Vec<f64> = series.iter().map(|v| v - mean).collect();

        let lags = auto_lags(&resid);

        let mut partial = 0.0;
        let mut eta = 0.0;
        for r in &resid {
            partial += r;
            eta += partial * partial;
        }
        eta /= n_f * n_f;

        let mut s = resid.iter().map(|r| r * r).sum::<f64>();
        for i in 1..=lags {
            s += 2.0 * lagged_product(&resid, i) * (1.0 - i as f64 / (lags as f64 + 1.0));
        }
        s /= n_f;
        if s <= 0.0 || !s.is_finite() {
            return Err(TestError::Numerical("non-positive long-run variance".to_string()));
        }

        let statistic = eta / s;
        let critical_values: BTreeMap<String, f64> = LEVELS
            .iter()
            .zip(CRITICAL)
            .map(|(level, crit)| (level.to_string(), crit))
            .collect();

        Ok(TestStatistic {
            statistic,
            p_value: p_value(statistic),
            lags,
            n_obs: n,
            critical_values,
        })
    }
}
