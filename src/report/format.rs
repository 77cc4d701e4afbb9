//! Terminal formatting of a run.

use std::collections::BTreeMap;

use crate::app::pipeline::RunOutput;
use crate::domain::ModelCandidate;
use crate::io::ingest::RowError;
use crate::models::ModelSelection;
use crate::preprocess::{MissingAction, PreprocessReport};
use crate::stationarity::SeriesReport;

/// Full text report for a run.
pub fn format_run_summary(run: &RunOutput, source: &str, row_errors: &[RowError]) -> String {
    let mut out = String::new();

    out.push_str("=== autostat - dataset analysis ===\n");
    out.push_str(&format!("Source: {source}\n"));
    if !row_errors.is_empty() {
        out.push_str(&format!("Skipped records: {}\n", row_errors.len()));
        for err in row_errors.iter().take(5) {
            out.push_str(&format!("  line {}: {}\n", err.line, err.message));
        }
    }
    out.push('\n');
    out.push_str(&crate::classify::summary(&run.metadata));

    if !run.integration.is_empty() {
        out.push('\n');
        out.push_str(&format_integration(&run.integration));
    }
    if let Some(report) = run.preprocessing.as_ref().filter(|r| !r.is_empty()) {
        out.push('\n');
        out.push_str(&format_preprocessing(report));
    }
    if let Some(selection) = &run.selection {
        out.push('\n');
        out.push_str(&format_selection(selection));
    }

    out
}

/// Order-of-integration table, one row per analysed column.
pub fn format_integration(reports: &BTreeMap<String, SeriesReport>) -> String {
    let mut out = String::new();
    out.push_str("Order of integration:\n");
    out.push_str(
        format!(
            "{:<20} {:>6} {:>6} {:<10} {:<12} {:<10}\n",
            "column", "n", "order", "confidence", "inconclusive", "trend"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<20} {:-<6} {:-<6} {:-<10} {:-<12} {:-<10}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for report in reports.values() {
        let integration = &report.integration;
        let trend = match (report.trend.has_trend, report.trend.direction) {
            (true, Some(direction)) => format!("{direction:?}").to_lowercase(),
            _ => "none".to_string(),
        };
        out.push_str(
            format!(
                "{:<20} {:>6} {:>6} {:<10} {:>12} {:<10}\n",
                truncate(&report.column, 20),
                report.n_obs,
                integration.notation,
                format!("{:?}", integration.confidence).to_lowercase(),
                integration.inconclusive_iterations,
                trend,
            )
            .trim_end(),
        );
        out.push('\n');
        if let Some(reason) = &integration.reason {
            out.push_str(&format!("  note: {reason}\n"));
        }
    }

    out
}

/// Missing-data treatments and standardized columns.
pub fn format_preprocessing(report: &PreprocessReport) -> String {
    let mut out = String::new();
    out.push_str("Preprocessing:\n");
    for treatment in &report.missing {
        let what = match &treatment.action {
            MissingAction::Dropped { missing_fraction } => {
                format!("dropped ({:.1}% missing)", missing_fraction * 100.0)
            }
            MissingAction::Median { value, filled } => format!("{filled} filled with median {value:.4}"),
            MissingAction::Mode { value, filled } => format!("{filled} filled with mode `{value}`"),
            MissingAction::Unfilled { missing } => format!("{missing} left missing"),
        };
        out.push_str(&format!("  {:<20} {what}\n", truncate(&treatment.column, 20)));
    }
    if !report.scaling.is_empty() {
        let names: Vec<&str> = report.scaling.iter().map(|s| s.column.as_str()).collect();
        out.push_str(&format!("  standardized: {}\n", names.join(", ")));
    }
    out
}

/// Candidates of the chosen estimator family, best first marked with `*`.
pub fn format_selection(selection: &ModelSelection) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Estimator family: {}\n",
        selection.family.display_name()
    ));
    out.push_str(&format!("Target: {}\n", selection.target));
    if !selection.features.is_empty() {
        out.push_str(&format!("Features: {}\n", selection.features.join(", ")));
    }

    out.push_str("\nModel diagnostics:\n");
    for (i, candidate) in selection.candidates.iter().enumerate() {
        let chosen = if selection.best == Some(i) { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<32} MAE={} MSE={} R2={} n={}\n",
            truncate(&candidate.name, 32),
            fmt_opt(candidate.mae),
            fmt_opt(candidate.mse),
            fmt_opt(candidate.r_squared),
            candidate.n_obs,
        ));
    }
    for skipped in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", skipped.name, skipped.reason));
    }

    match selection.best_candidate() {
        Some(best) => {
            out.push_str("\nChosen model:\n");
            out.push_str(&format_candidate(best));
        }
        None => out.push_str("\nNo estimator produced a candidate.\n"),
    }

    out
}

fn format_candidate(candidate: &ModelCandidate) -> String {
    let mut out = String::new();
    out.push_str(&format!("- {}\n", candidate.name));
    for (name, value) in &candidate.coefficients {
        out.push_str(&format!("  {name:<24} {value:>14.6}\n"));
    }
    if let Some(dw) = candidate.metrics.get("durbin_watson") {
        let metric = |key: &str| fmt_opt(candidate.metrics.get(key).copied());
        out.push_str(&format!(
            "  residuals: Breusch-Pagan p={} Durbin-Watson={dw:.4} Jarque-Bera p={}\n",
            metric("breusch_pagan_p_value"),
            metric("jarque_bera_p_value"),
        ));
    }
    for note in &candidate.notes {
        out.push_str(&format!("  {note}\n"));
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.4}")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstimatorFamily, IntegrationOrder};
    use crate::models::SkippedEstimator;
    use crate::preprocess::{ColumnTreatment, ScaledColumn};
    use crate::stationarity::detect_trend;

    fn candidate(name: &str, mae: f64) -> ModelCandidate {
        let mut c = ModelCandidate::new(name, "y", 20);
        c.mae = Some(mae);
        c.coefficients.insert("x".to_string(), 1.5);
        c
    }

    #[test]
    fn selection_marks_best_and_lists_skipped() {
        let selection = ModelSelection {
            family: EstimatorFamily::Linear,
            target: "y".to_string(),
            features: vec!["x".to_string()],
            candidates: vec![candidate("A", 2.0), candidate("B", 1.0)],
            skipped: vec![SkippedEstimator {
                name: "C".to_string(),
                reason: "not applicable: no features".to_string(),
            }],
            best: Some(1),
        };
        let text = format_selection(&selection);
        assert!(text.contains("Estimator family: linear"));
        assert!(text.contains("* B"));
        assert!(text.contains("  A"));
        assert!(text.contains("(skipped C) not applicable"));
        assert!(text.contains("- B"));
        assert!(text.contains("MSE=-"));
    }

    #[test]
    fn preprocessing_lists_each_treatment() {
        let report = PreprocessReport {
            missing: vec![
                ColumnTreatment {
                    column: "sparse".to_string(),
                    action: MissingAction::Dropped { missing_fraction: 0.75 },
                },
                ColumnTreatment {
                    column: "x".to_string(),
                    action: MissingAction::Median { value: 2.0, filled: 3 },
                },
            ],
            scaling: vec![ScaledColumn {
                column: "x".to_string(),
                mean: 4.0,
                std: Some(2.0),
            }],
        };
        let text = format_preprocessing(&report);
        assert!(text.contains("dropped (75.0% missing)"));
        assert!(text.contains("3 filled with median 2.0000"));
        assert!(text.contains("standardized: x"));
    }

    #[test]
    fn chosen_model_shows_residual_checks() {
        let mut c = candidate("OLS", 1.0);
        c.metrics.insert("durbin_watson".to_string(), 1.97);
        c.metrics.insert("breusch_pagan_p_value".to_string(), 0.448);
        let text = format_candidate(&c);
        assert!(text.contains("Durbin-Watson=1.9700"));
        assert!(text.contains("Breusch-Pagan p=0.4480"));
        assert!(text.contains("Jarque-Bera p=-"));
    }

    #[test]
    fn integration_table_shows_notation_and_reason() {
        let mut reports = BTreeMap::new();
        reports.insert(
            "gdp".to_string(),
            SeriesReport {
                column: "gdp".to_string(),
                n_obs: 4,
                integration: IntegrationOrder::undetermined("insufficient data", 0),
                steps: Vec::new(),
                trend: detect_trend(&[1.0, 1.0, 1.0, 1.0]),
            },
        );
        let text = format_integration(&reports);
        assert!(text.contains("gdp"));
        assert!(text.contains("I(?)"));
        assert!(text.contains("note: insufficient data"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
