//! Linear vs non-linear relationship detection.
//!
//! A monotone but curved relationship keeps a high rank (Spearman)
//! correlation while its Pearson correlation drops. The mean absolute gap
//! between the two over all numeric column pairs is the non-linearity score.

use serde::Serialize;
use tracing::debug;

use crate::data::Dataset;
use crate::math::stats::{pearson, spearman};

/// Minimum complete observations for a pair to be scored.
const MIN_PAIR_OBS: usize = 3;

/// Pearson and Spearman correlation of one column pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairLinearity {
    pub first: String,
    pub second: String,
    pub pearson: f64,
    pub spearman: f64,
    pub difference: f64,
    pub is_linear: bool,
}

/// Every scorable pair of numeric columns (strict upper triangle, dataset order).
///
/// Rows missing either value are skipped per pair. Pairs with fewer than
/// three complete rows or a constant side are left out.
pub fn pairwise_linearity(dataset: &Dataset, threshold: f64) -> Vec<PairLinearity> {
    let cutoff = 1.0 - threshold;
    let columns: Vec<_> = dataset
        .numeric_columns()
        .filter_map(|c| c.as_numeric().map(|cells| (c.name.as_str(), cells)))
        .collect();

    let mut pairs = Vec::new();
    for (i, (first, a)) in columns.iter().enumerate() {
        for (second, b) in &columns[i + 1..] {
            let (x, y): (Vec<f64>, Vec<f64>) = a
                .iter()
                .zip(b.iter())
                .filter_map(|(u, v)| Some(((*u)?, (*v)?)))
                .unzip();
            if x.len() < MIN_PAIR_OBS {
                continue;
            }
            let (Some(p), Some(s)) = (pearson(&x, &y), spearman(&x, &y)) else {
                continue;
            };
            let difference = (p - s).abs();
            pairs.push(PairLinearity {
                first: first.to_string(),
                second: second.to_string(),
                pearson: p,
                spearman: s,
                difference,
                is_linear: difference < cutoff,
            });
        }
    }
    pairs
}

/// Whether the numeric columns of `dataset` relate linearly.
///
/// Fewer than two numeric columns, or no scorable pair, counts as linear.
/// Otherwise the mean Pearson/Spearman gap must stay below `1 - threshold`.
pub fn is_linear(dataset: &Dataset, threshold: f64) -> bool {
    let pairs = pairwise_linearity(dataset, threshold);
    if pairs.is_empty() {
        return true;
    }
    let mean_gap = pairs.iter().map(|p| p.difference).sum::<f64>() / pairs.len() as f64;
    debug!(pairs = pairs.len(), mean_gap, "linearity score");
    mean_gap < 1.0 - threshold
}
