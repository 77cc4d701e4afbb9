//! Linear trend detection.

use serde::Serialize;

use crate::math::stats::{linear_slope, sample_std};

/// Normalised slopes at or below this magnitude count as no trend.
const TREND_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub has_trend: bool,
    pub slope: Option<f64>,
    /// Slope per step divided by the sample standard deviation.
    pub normalized_slope: Option<f64>,
    pub direction: Option<TrendDirection>,
    pub error: Option<String>,
}

/// Least-squares slope against the observation number.
///
/// Non-finite values are dropped first; fewer than two observations yield no
/// trend with an error note.
pub fn detect_trend(series: &[f64]) -> TrendReport {
    let clean: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    let Some(slope) = linear_slope(&clean) else {
        return TrendReport {
            has_trend: false,
            slope: None,
            normalized_slope: None,
            direction: None,
            error: Some("insufficient data".to_string()),
        };
    };

    let normalized = match sample_std(&clean) {
        Some(std) if std > 0.0 => slope / std,
        _ => 0.0,
    };
    TrendReport {
        has_trend: normalized.abs() > TREND_THRESHOLD,
        slope: Some(slope),
        normalized_slope: Some(normalized),
        direction: Some(if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }),
        error: None,
    }
}
