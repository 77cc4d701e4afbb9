//! Missing-data handling ahead of estimation.
//!
//! Automatic strategy, column by column:
//! - more than `drop_threshold` of the cells missing: drop the column
//! - numeric: fill gaps with the median of the present values
//! - text and date/time: fill gaps with the most frequent value
//!
//! Entity/time role columns are left untouched, and the requested target is
//! never dropped (only filled).

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::ResolvedRoles;
use crate::data::{Column, ColumnData, Dataset};
use crate::error::{AppError, EXIT_INSUFFICIENT};

/// What happened to one column with gaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MissingAction {
    Dropped { missing_fraction: f64 },
    Median { value: f64, filled: usize },
    Mode { value: String, filled: usize },
    /// Nothing present to fill from.
    Unfilled { missing: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTreatment {
    pub column: String,
    #[serde(flatten)]
    pub action: MissingAction,
}

/// Median of the present values; even counts average the middle pair.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    Some(if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    })
}

/// Most frequent present value; ties go to the smallest.
pub fn mode<T: Ord + Clone>(values: &[Option<T>]) -> Option<T> {
    let mut counts: BTreeMap<&T, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v).or_default() += 1;
    }
    let mut best: Option<(&T, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, n)| count > n) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone())
}

fn fill<T: Clone>(values: &[Option<T>], with: &T) -> Vec<Option<T>> {
    values
        .iter()
        .map(|v| Some(v.clone().unwrap_or_else(|| with.clone())))
        .collect()
}

fn impute(column: &Column) -> (Column, MissingAction) {
    let missing = column.missing_count();
    let (data, action) = match &column.data {
        ColumnData::Numeric(values) => match median(values) {
            Some(m) => (
                ColumnData::Numeric(fill(values, &m)),
                MissingAction::Median { value: m, filled: missing },
            ),
            None => (column.data.clone(), MissingAction::Unfilled { missing }),
        },
        ColumnData::Text(values) => match mode(values) {
            Some(m) => (
                ColumnData::Text(fill(values, &m)),
                MissingAction::Mode { value: m, filled: missing },
            ),
            None => (column.data.clone(), MissingAction::Unfilled { missing }),
        },
        ColumnData::DateTime(values) => match mode(values) {
            Some(m) => (
                ColumnData::DateTime(fill(values, &m)),
                MissingAction::Mode {
                    value: m.to_string(),
                    filled: missing,
                },
            ),
            None => (column.data.clone(), MissingAction::Unfilled { missing }),
        },
    };
    (Column::new(column.name.clone(), data), action)
}

/// Apply the automatic strategy. Columns without gaps pass through unchanged
/// and are not reported.
pub fn handle_missing(
    dataset: &Dataset,
    roles: &ResolvedRoles,
    keep: Option<&str>,
    drop_threshold: f64,
) -> Result<(Dataset, Vec<ColumnTreatment>), AppError> {
    let rows = dataset.row_count() as f64;
    let mut columns = Vec::with_capacity(dataset.column_count());
    let mut treatments = Vec::new();

    for column in dataset.columns() {
        let missing = column.missing_count();
        if missing == 0 || roles.is_role_column(&column.name) {
            columns.push(column.clone());
            continue;
        }

        let missing_fraction = missing as f64 / rows;
        let action = if missing_fraction > drop_threshold && keep != Some(column.name.as_str()) {
            MissingAction::Dropped { missing_fraction }
        } else {
            let (filled, action) = impute(column);
            columns.push(filled);
            action
        };
        debug!(column = %column.name, ?action, "missing data");
        treatments.push(ColumnTreatment {
            column: column.name.clone(),
            action,
        });
    }

    if columns.is_empty() {
        return Err(AppError::new(
            EXIT_INSUFFICIENT,
            "Every column exceeds the missing-data threshold.",
        ));
    }
    if !treatments.is_empty() {
        info!(columns = treatments.len(), "handled missing data");
    }
    Ok((dataset.with_columns(columns)?, treatments))
}
