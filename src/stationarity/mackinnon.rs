//! MacKinnon approximate p-values and critical values for Dickey-Fuller type
//! t-statistics, constant-only regression with a single series.
//!
//! p-values follow MacKinnon (1994); finite-sample critical values follow
//! MacKinnon (2010).

use std::collections::BTreeMap;

use statrs::function::erf::erfc;

/// Above this the p-value is 1.
const TAU_MAX: f64 = 2.74;
/// Below this the p-value is 0.
const TAU_MIN: f64 = -18.83;
/// Switch point between the small-p and large-p polynomials.
const TAU_STAR: f64 = -1.61;
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// `(level, [b0, b1, b2, b3])` with `crit = b0 + b1/n + b2/n^2 + b3/n^3`.
const CRITICAL_2010: [(&str, [f64; 4]); 3] = [
    ("1%", [-3.43035, -6.5393, -16.786, -79.433]),
    ("5%", [-2.86154, -2.8903, -4.234, -40.04]),
    ("10%", [-2.56677, -1.5384, -2.809, 0.0]),
];

fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Horner evaluation with ascending coefficients.
fn poly(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Approximate p-value of a tau statistic.
pub fn p_value(tau: f64) -> f64 {
    if tau > TAU_MAX {
        1.0
    } else if tau < TAU_MIN {
        0.0
    } else if tau <= TAU_STAR {
        standard_normal_cdf(poly(&SMALL_P, tau))
    } else {
        standard_normal_cdf(poly(&LARGE_P, tau))
    }
}

/// 1%, 5% and 10% critical values for `n_obs` observations.
pub fn critical_values(n_obs: usize) -> BTreeMap<String, f64> {
    let inv = 1.0 / n_obs.max(1) as f64;
    CRITICAL_2010
        .iter()
        .map(|(level, b)| (level.to_string(), poly(b, inv)))
        .collect()
}
