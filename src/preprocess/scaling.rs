//! Z-score standardization of feature columns.

use serde::Serialize;
use tracing::debug;

use crate::data::{Column, ColumnData, Dataset};
use crate::error::AppError;
use crate::math::stats::{mean, sample_std};

/// Location and scale removed from one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledColumn {
    pub column: String,
    pub mean: f64,
    /// `None` when the column was only centred (constant or a single value).
    pub std: Option<f64>,
}

/// Standardize the named numeric columns with the sample standard deviation.
///
/// Missing cells stay missing. Columns that are absent, non-numeric or
/// entirely missing are left alone and not reported.
pub fn standardize(dataset: &Dataset, columns: &[String]) -> Result<(Dataset, Vec<ScaledColumn>), AppError> {
    let mut scaled = Vec::new();
    let out: Vec<Column> = dataset
        .columns()
        .iter()
        .map(|column| {
            let Some(cells) = column.as_numeric().filter(|_| columns.contains(&column.name)) else {
                return column.clone();
            };
            let present: Vec<f64> = cells.iter().flatten().copied().collect();
            let Some(m) = mean(&present) else {
                return column.clone();
            };
            let std = sample_std(&present).filter(|s| *s > 0.0);
            let divisor = std.unwrap_or(1.0);
            debug!(column = %column.name, mean = m, ?std, "standardized");
            scaled.push(ScaledColumn {
                column: column.name.clone(),
                mean: m,
                std,
            });
            Column::new(
                column.name.clone(),
                ColumnData::Numeric(cells.iter().map(|c| c.map(|v| (v - m) / divisor)).collect()),
            )
        })
        .collect();
    Ok((dataset.with_columns(out)?, scaled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_get_zero_mean_unit_variance() {
        let ds = Dataset::from_columns(vec![
            Column::numeric_opt("x", vec![Some(2.0), None, Some(4.0), Some(6.0)]),
            Column::numeric("c", vec![5.0, 5.0, 5.0, 5.0]),
            Column::numeric("y", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let (out, scaled) = standardize(&ds, &["x".to_string(), "c".to_string()]).unwrap();

        let x = out.column("x").unwrap().as_numeric().unwrap();
        assert_eq!(x, &[Some(-1.0), None, Some(0.0), Some(1.0)]);
        assert_eq!(out.numeric_series("c").unwrap(), vec![0.0; 4]);
        assert_eq!(out.numeric_series("y").unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            scaled,
            vec![
                ScaledColumn {
                    column: "x".to_string(),
                    mean: 4.0,
                    std: Some(2.0)
                },
                ScaledColumn {
                    column: "c".to_string(),
                    mean: 5.0,
                    std: None
                },
            ]
        );
    }

    #[test]
    fn text_columns_are_skipped() {
        let ds = Dataset::from_columns(vec![Column::text("name", vec!["a", "b"])]).unwrap();
        let (out, scaled) = standardize(&ds, &["name".to_string()]).unwrap();
        assert!(scaled.is_empty());
        assert_eq!(out, ds);
    }
}
