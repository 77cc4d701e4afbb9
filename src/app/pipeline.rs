//! Shared analysis pipeline used by every subcommand.
//!
//! dataset -> metadata -> (per-column order of integration) -> preprocessing
//! -> estimator family -> fitted candidates -> best candidate
//!
//! Each stage is a plain function over immutable inputs; the CLI only
//! decides which stages to run and how to present the result.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::classify::ResolvedRoles;
use crate::data::Dataset;
use crate::domain::{AnalysisConfig, IntegrationOrder, Layout, Metadata, SizeCategory};
use crate::error::{AppError, EXIT_INSUFFICIENT};
use crate::models::{EstimationInput, ModelSelection, ModelingPlan, run_family, select_family};
use crate::preprocess::{PreprocessReport, handle_missing, standardize};
use crate::stationarity::{ConsensusEngine, SeriesReport, analyze_columns};

/// All computed outputs of a single run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub metadata: Metadata,
    pub roles: ResolvedRoles,
    /// Stationarity analysis per column (empty when not run).
    pub integration: BTreeMap<String, SeriesReport>,
    pub plan: Option<ModelingPlan>,
    /// Changes made to the data before estimation (`analyze` only).
    pub preprocessing: Option<PreprocessReport>,
    pub selection: Option<ModelSelection>,
    pub config: AnalysisConfig,
}

impl RunOutput {
    /// Orders of integration keyed by column.
    pub fn integration_orders(&self) -> BTreeMap<String, IntegrationOrder> {
        integration_orders(&self.integration)
    }
}

/// Metadata only.
pub fn classify(dataset: &Dataset, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let metadata = crate::classify::detect(dataset, config)?;
    Ok(RunOutput {
        metadata,
        roles: ResolvedRoles::resolve(dataset),
        integration: BTreeMap::new(),
        plan: None,
        preprocessing: None,
        selection: None,
        config: config.clone(),
    })
}

/// Metadata plus the order of integration of every numeric non-role column,
/// whatever the layout.
pub fn integrate(dataset: &Dataset, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let mut run = classify(dataset, config)?;
    let columns = analysis_columns(dataset, &run.roles);
    if columns.is_empty() {
        return Err(AppError::new(
            EXIT_INSUFFICIENT,
            "No numeric column available for stationarity analysis.",
        ));
    }
    run.integration = analyze_columns(&ConsensusEngine::standard(config), dataset, &columns);
    Ok(run)
}

/// Full run: classification, stationarity (time-series and panel layouts
/// only), preprocessing, then estimator selection.
///
/// Stationarity sees the data as loaded. The estimators see the data after
/// missing-value handling and, for big datasets, standardized features.
pub fn analyze(dataset: &Dataset, config: &AnalysisConfig) -> Result<RunOutput, AppError> {
    let mut run = classify(dataset, config)?;
    let (cleaned, missing) = handle_missing(
        dataset,
        &run.roles,
        config.target.as_deref(),
        config.missing_drop_threshold,
    )?;
    let plan = ModelingPlan::resolve(&cleaned, &run.roles, config.target.as_deref())?;

    if matches!(run.metadata.layout, Layout::TimeSeries | Layout::Panel) {
        let columns = analysis_columns(dataset, &run.roles);
        info!(columns = columns.len(), "running stationarity analysis");
        run.integration = analyze_columns(&ConsensusEngine::standard(config), dataset, &columns);
    }

    let (prepared, scaling) = if run.metadata.size_category == SizeCategory::Big {
        info!(features = plan.features.len(), "standardizing features");
        standardize(&cleaned, &plan.features)?
    } else {
        (cleaned, Vec::new())
    };

    let family = select_family(&run.metadata);
    info!(family = %family.display_name(), target = %plan.target, "selected estimator family");

    let orders = integration_orders(&run.integration);
    let input = EstimationInput {
        dataset: &prepared,
        target: &plan.target,
        features: &plan.features,
        roles: &run.roles,
        integration: (!orders.is_empty()).then_some(&orders),
        config,
    };
    let selection = run_family(family, &input);
    if let Some(best) = selection.best_candidate() {
        info!(model = %best.name, mae = ?best.mae, "best candidate");
    }

    run.plan = Some(plan);
    run.preprocessing = Some(PreprocessReport { missing, scaling });
    run.selection = Some(selection);
    Ok(run)
}

/// Numeric columns that are not entity/time roles, in dataset order.
pub fn analysis_columns(dataset: &Dataset, roles: &ResolvedRoles) -> Vec<String> {
    dataset
        .numeric_columns()
        .filter(|c| !roles.is_role_column(&c.name))
        .map(|c| c.name.clone())
        .collect()
}

fn integration_orders(reports: &BTreeMap<String, SeriesReport>) -> BTreeMap<String, IntegrationOrder> {
    reports
        .iter()
        .map(|(name, report)| (name.clone(), report.integration.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::data::sample::{balanced_panel, linear_relation, time_series_dataset};
    use crate::domain::{EstimatorFamily, PanelBalance};
    use crate::preprocess::MissingAction;

    #[test]
    fn classify_skips_later_stages() {
        let ds = linear_relation(50, 2.0, 0.1, 1).unwrap();
        let run = classify(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(run.metadata.layout, Layout::CrossSection);
        assert!(run.integration.is_empty());
        assert!(run.selection.is_none());
        assert!(run.preprocessing.is_none());
    }

    #[test]
    fn cross_section_analysis_skips_stationarity() {
        let ds = linear_relation(80, 2.0, 0.1, 2).unwrap();
        let run = analyze(&ds, &AnalysisConfig::default()).unwrap();
        assert!(run.integration.is_empty());
        let selection = run.selection.unwrap();
        assert_eq!(selection.family, EstimatorFamily::Linear);
        assert_eq!(selection.target, "y");
        assert_eq!(selection.best_candidate().unwrap().name, "OLS");
    }

    #[test]
    fn time_series_analysis_tests_every_value_column() {
        let ds = time_series_dataset(120, &[("a", 0), ("b", 1)], 3).unwrap();
        let run = analyze(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(run.metadata.layout, Layout::TimeSeries);
        assert_eq!(
            run.integration.keys().cloned().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(run.selection.unwrap().family, EstimatorFamily::SmallTimeSeries);
    }

    #[test]
    fn panel_analysis_excludes_role_columns() {
        let ds = balanced_panel(5, 8, 4).unwrap();
        let run = analyze(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(run.metadata.panel_balance, PanelBalance::Fixed);
        assert!(!run.integration.contains_key("year"));
        let selection = run.selection.unwrap();
        assert_eq!(selection.family, EstimatorFamily::Panel(PanelBalance::Fixed));
        assert_eq!(selection.target, "revenue");
    }

    #[test]
    fn analysis_fills_and_drops_gaps_before_estimation() {
        let n = 40;
        let x: Vec<Option<f64>> = (0..n).map(|i| (i % 10 != 3).then_some(i as f64)).collect();
        let y: Vec<f64> = (0..n).map(|i| 2.0 * i as f64 + (1.3 * i as f64).sin()).collect();
        let sparse: Vec<Option<f64>> = (0..n).map(|i| (i % 4 == 0).then_some(1.0)).collect();
        let ds = Dataset::from_columns(vec![
            Column::numeric_opt("x", x),
            Column::numeric_opt("sparse", sparse),
            Column::numeric("y", y),
        ])
        .unwrap();

        let run = analyze(&ds, &AnalysisConfig::default()).unwrap();
        assert_eq!(run.plan.as_ref().unwrap().features, vec!["x".to_string()]);
        let report = run.preprocessing.unwrap();
        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.missing[0].column, "x");
        assert!(matches!(report.missing[0].action, MissingAction::Median { filled: 4, .. }));
        assert!(matches!(report.missing[1].action, MissingAction::Dropped { .. }));
        assert!(report.scaling.is_empty());

        let best = run.selection.unwrap();
        let ols = best.candidates.iter().find(|c| c.name == "OLS").unwrap();
        assert_eq!(ols.n_obs, n);
        assert!(ols.metrics.contains_key("breusch_pagan_p_value"));
    }

    #[test]
    fn big_data_features_are_standardized() {
        let ds = linear_relation(300, 2.0, 0.5, 6).unwrap();
        let config = AnalysisConfig {
            big_data_row_threshold: 100,
            ..AnalysisConfig::default()
        };
        let run = analyze(&ds, &config).unwrap();
        let scaling = run.preprocessing.unwrap().scaling;
        assert_eq!(scaling.len(), 1);
        assert_eq!(scaling[0].column, "x");
        assert!(scaling[0].std.unwrap() > 2.0);
    }

    #[test]
    fn integrate_needs_a_numeric_column() {
        let ds = Dataset::from_columns(vec![Column::text("name", vec!["a", "b"])]).unwrap();
        let err = integrate(&ds, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INSUFFICIENT);
    }
}
