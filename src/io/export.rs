//! Export run results.
//!
//! JSON carries the whole serialised run; the CSV holds one row per analysed
//! column so the orders of integration are easy to consume in spreadsheets.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::{AppError, EXIT_INTERNAL};
use crate::stationarity::SeriesReport;

/// Write any serialisable value as pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_INTERNAL,
            format!("Failed to create export JSON '{}': {e}", path.display()),
        )
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to write export JSON: {e}")))
}

/// Write one row per analysed column.
pub fn write_integration_csv<'a, I>(path: &Path, reports: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = &'a SeriesReport>,
{
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_INTERNAL,
            format!("Failed to create export CSV '{}': {e}", path.display()),
        )
    })?;
    let mut writer = csv::Writer::from_writer(file);
    let map_err = |e: csv::Error| AppError::new(EXIT_INTERNAL, format!("Failed to write export CSV: {e}"));

    writer
        .write_record([
            "column",
            "n_obs",
            "order",
            "notation",
            "confidence",
            "inconclusive_iterations",
            "has_trend",
            "reason",
        ])
        .map_err(map_err)?;

    for report in reports {
        let integration = &report.integration;
        writer
            .write_record([
                report.column.clone(),
                report.n_obs.to_string(),
                integration.order.map(|d| d.to_string()).unwrap_or_default(),
                integration.notation.clone(),
                format!("{:?}", integration.confidence).to_lowercase(),
                integration.inconclusive_iterations.to_string(),
                report.trend.has_trend.to_string(),
                integration.reason.clone().unwrap_or_default(),
            ])
            .map_err(map_err)?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INTERNAL, format!("Failed to flush export CSV: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntegrationOrder;
    use crate::stationarity::detect_trend;

    fn report(column: &str, integration: IntegrationOrder) -> SeriesReport {
        SeriesReport {
            column: column.to_string(),
            n_obs: 3,
            integration,
            steps: Vec::new(),
            trend: detect_trend(&[1.0, 2.0, 3.0]),
        }
    }

    #[test]
    fn integration_csv_has_one_row_per_column() {
        let dir = std::env::temp_dir().join(format!("autostat-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("orders.csv");

        let reports = [
            report("a", IntegrationOrder::found(1, 0)),
            report("b", IntegrationOrder::undetermined("insufficient data", 0)),
        ];
        write_integration_csv(&path, &reports).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("column,n_obs,order"));
        assert!(lines[1].starts_with("a,3,1,I(1),high,0,"));
        assert!(lines[2].starts_with("b,3,,I(?),low,0,"));
        assert!(lines[2].ends_with("insufficient data"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn json_export_reports_unwritable_paths() {
        let path = Path::new("/nonexistent-dir/for/sure/run.json");
        let err = write_json(path, &vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INTERNAL);
    }
}
