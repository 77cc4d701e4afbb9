//! Dataset metadata: structure, size, linearity and missing data in one record.

use std::collections::BTreeMap;

use tracing::info;

use crate::classify::linearity::is_linear;
use crate::classify::roles::ResolvedRoles;
use crate::classify::structure::{balance_from_roles, layout_from_roles};
use crate::data::Dataset;
use crate::domain::{AnalysisConfig, Metadata, SizeCategory};
use crate::error::AppError;

/// Classify `dataset`.
///
/// The dataset itself is validated on construction, so the only failure
/// left here is an invalid configuration.
pub fn detect(dataset: &Dataset, config: &AnalysisConfig) -> Result<Metadata, AppError> {
    config.validate()?;

    let roles = ResolvedRoles::resolve(dataset);
    let layout = layout_from_roles(dataset, &roles);
    let panel_balance = balance_from_roles(dataset, layout, &roles);
    let row_count = dataset.row_count();

    let missing_by_column: BTreeMap<String, usize> = dataset
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.missing_count()))
        .filter(|(_, missing)| *missing > 0)
        .collect();
    let missing_cells = dataset.missing_cells();

    let metadata = Metadata {
        layout,
        panel_balance,
        size_category: SizeCategory::from_rows(row_count, config.big_data_row_threshold),
        row_count,
        column_count: dataset.column_count(),
        is_linear: is_linear(dataset, config.linearity_threshold),
        missing_fraction: missing_cells as f64 / dataset.total_cells() as f64,
        has_missing: missing_cells > 0,
        missing_by_column,
        entity_column: roles.entity,
        time_column: roles.time,
    };

    info!(
        layout = metadata.layout.label(),
        panel = metadata.panel_balance.label(),
        size = metadata.size_category.label(),
        linear = metadata.is_linear,
        "classified dataset"
    );
    Ok(metadata)
}

/// Human-readable summary block.
pub fn summary(metadata: &Metadata) -> String {
    let mut out = String::new();
    out.push_str(&format!("Data Type: {}\n", metadata.layout.label()));
    out.push_str(&format!("Panel Type: {}\n", metadata.panel_balance.label()));
    out.push_str(&format!(
        "Size Category: {} ({} rows, {} columns)\n",
        metadata.size_category.label(),
        metadata.row_count,
        metadata.column_count
    ));
    out.push_str(&format!(
        "Linearity: {}\n",
        if metadata.is_linear { "Linear" } else { "Non-linear" }
    ));
    out.push_str(&format!(
        "Missing Data: {:.2}%\n",
        metadata.missing_fraction * 100.0
    ));
    if let (Some(entity), Some(time)) = (&metadata.entity_column, &metadata.time_column) {
        out.push_str(&format!("Panel Keys: {entity} x {time}\n"));
    } else if let Some(time) = &metadata.time_column {
        out.push_str(&format!("Time Column: {time}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::data::sample::balanced_panel;
    use crate::domain::{Layout, PanelBalance};

    #[test]
    fn detects_balanced_panel() {
        let ds = balanced_panel(4, 5, 11).unwrap();
        let metadata = detect(&ds, &AnalysisConfig::default()).unwrap();

        assert_eq!(metadata.layout, Layout::Panel);
        assert_eq!(metadata.panel_balance, PanelBalance::Fixed);
        assert_eq!(metadata.size_category, SizeCategory::Small);
        assert_eq!(metadata.row_count, 20);
        assert!(metadata.panel_roles_resolved());
        assert!(!metadata.has_missing);
    }

    #[test]
    fn size_threshold_is_configurable() {
        let ds = balanced_panel(2, 5, 1).unwrap();
        let config = AnalysisConfig {
            big_data_row_threshold: 10,
            ..AnalysisConfig::default()
        };
        assert_eq!(detect(&ds, &config).unwrap().size_category, SizeCategory::Big);
    }

    #[test]
    fn missing_statistics() {
        let ds = Dataset::from_columns(vec![
            Column::numeric_opt("a", vec![Some(1.0), None, Some(3.0), Some(4.0)]),
            Column::numeric("b", vec![1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();
        let metadata = detect(&ds, &AnalysisConfig::default()).unwrap();

        assert!(metadata.has_missing);
        assert!((metadata.missing_fraction - 0.125).abs() < 1e-12);
        assert_eq!(metadata.missing_by_column.get("a"), Some(&1));
        assert!(!metadata.missing_by_column.contains_key("b"));
        assert!(summary(&metadata).contains("Missing Data: 12.50%"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let ds = balanced_panel(2, 2, 1).unwrap();
        let config = AnalysisConfig {
            linearity_threshold: 2.0,
            ..AnalysisConfig::default()
        };
        assert_eq!(detect(&ds, &config).unwrap_err().exit_code(), 2);
    }
}
