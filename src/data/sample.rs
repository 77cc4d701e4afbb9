//! Seeded synthetic series and datasets.
//!
//! Used to exercise the classifiers and the consensus engine on data whose
//! structure is known by construction (white noise is I(0), a random walk is
//! I(1), and so on). Every generator is deterministic for a given seed.
//! The series generators are public for the integration tests; the dataset
//! builders exist for unit tests only.

#[cfg(test)]
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

#[cfg(test)]
use crate::data::dataset::{Column, Dataset};
#[cfg(test)]
use crate::error::AppError;

/// `n` i.i.d. standard normal draws.
pub fn white_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
}

/// White noise cumulated `order` times, i.e. an I(`order`) series.
pub fn integrated(n: usize, order: usize, seed: u64) -> Vec<f64> {
    let mut series = white_noise(n, seed);
    for _ in 0..order {
        let mut acc = 0.0;
        for v in series.iter_mut() {
            acc += *v;
            *v = acc;
        }
    }
    series
}

/// Daily timestamps starting at 2020-01-01.
#[cfg(test)]
pub fn daily_dates(n: usize) -> Vec<NaiveDateTime> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    (0..n)
        .map(|i| start + Duration::days(i as i64))
        .collect()
}

/// Time-series dataset with a `date` column and one I(`order`) column per entry.
#[cfg(test)]
pub fn time_series_dataset(
    n: usize,
    orders: &[(&str, usize)],
    seed: u64,
) -> Result<Dataset, AppError> {
    let mut columns = vec![Column::datetime("date", daily_dates(n))];
    for (i, (name, order)) in orders.iter().enumerate() {
        columns.push(Column::numeric(
            *name,
            integrated(n, *order, seed.wrapping_add(i as u64)),
        ));
    }
    Dataset::from_columns(columns)
}

/// Cross-section `x`, `y` with `y = slope * x + noise`, `x ~ U(0, 10)`.
#[cfg(test)]
pub fn linear_relation(n: usize, slope: f64, noise_sd: f64, seed: u64) -> Result<Dataset, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&x| slope * x + noise_sd * rng.sample::<f64, _>(StandardNormal))
        .collect();
    Dataset::from_columns(vec![Column::numeric("x", x), Column::numeric("y", y)])
}

/// Cross-section `x`, `y` with `y = exp(x) + noise`, `x ~ U(0, 10)`.
#[cfg(test)]
pub fn exponential_relation(n: usize, noise_sd: f64, seed: u64) -> Result<Dataset, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..10.0)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&x| x.exp() + noise_sd * rng.sample::<f64, _>(StandardNormal))
        .collect();
    Dataset::from_columns(vec![Column::numeric("x", x), Column::numeric("y", y)])
}

/// Cross-section `x`, `y` with `y = x^3 + noise`, `x ~ N(0, x_sd^2)`.
#[cfg(test)]
pub fn cubic_relation(n: usize, x_sd: f64, noise_sd: f64, seed: u64) -> Result<Dataset, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| x_sd * rng.sample::<f64, _>(StandardNormal)).collect();
    let y: Vec<f64> = x
        .iter()
        .map(|&x| x.powi(3) + noise_sd * rng.sample::<f64, _>(StandardNormal))
        .collect();
    Dataset::from_columns(vec![Column::numeric("x", x), Column::numeric("y", y)])
}

/// Panel `firm_id, year, x, revenue` with every firm observed every year.
///
/// `revenue = 2 + 1.5 * x + firm effect + noise`.
#[cfg(test)]
pub fn balanced_panel(firms: usize, years: usize, seed: u64) -> Result<Dataset, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut firm_ids = Vec::with_capacity(firms * years);
    let mut year_col = Vec::with_capacity(firms * years);
    let mut x_col = Vec::with_capacity(firms * years);
    let mut revenue = Vec::with_capacity(firms * years);

    for firm in 0..firms {
        let effect = 3.0 * rng.sample::<f64, _>(StandardNormal);
        for year in 0..years {
            let x = rng.gen_range(0.0..10.0);
            firm_ids.push(format!("F{:03}", firm + 1));
            year_col.push(2000.0 + year as f64);
            x_col.push(x);
            revenue.push(2.0 + 1.5 * x + effect + 0.5 * rng.sample::<f64, _>(StandardNormal));
        }
    }

    Dataset::from_columns(vec![
        Column::text("firm_id", firm_ids),
        Column::numeric("year", year_col),
        Column::numeric("x", x_col),
        Column::numeric("revenue", revenue),
    ])
}
