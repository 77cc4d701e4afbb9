//! CSV ingestion.
//!
//! Reads a CSV with a header row into a typed [`Dataset`]. Column types are
//! inferred from the cells: numeric when every non-missing cell parses as
//! `f64`, date-time when every non-missing cell parses with one of the
//! accepted date formats, text otherwise.
//!
//! Records whose field count differs from the header are reported as
//! [`RowError`]s and skipped; they never abort the load.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::data::{Column, ColumnData, Dataset, RowIndex};
use crate::error::{AppError, EXIT_INPUT};

/// A skipped CSV record (1-based line number, header is line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub row_errors: Vec<RowError>,
    /// Data records seen, including the skipped ones.
    pub rows_read: usize,
}

const MISSING_MARKERS: [&str; 4] = ["", "na", "nan", "null"];

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Load a CSV file.
///
/// `index_column`, when given, names a date-time column that becomes the
/// dataset's row index (and is removed from the columns).
pub fn load_csv(path: &Path, index_column: Option<&str>) -> Result<IngestedData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open CSV '{}': {e}", path.display()),
        )
    })?;
    let ingested = read_csv(file, index_column)?;
    info!(
        path = %path.display(),
        rows = ingested.dataset.row_count(),
        columns = ingested.dataset.column_count(),
        skipped = ingested.row_errors.len(),
        "loaded dataset"
    );
    Ok(ingested)
}

/// Parse CSV content from any reader.
pub fn read_csv<R: Read>(reader: R, index_column: Option<&str>) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::malformed_input(format!("failed to read CSV headers: {e}")))?
        .clone();
    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_header_name(h, i))
        .collect();
    if names.is_empty() {
        return Err(AppError::malformed_input("CSV has no header row"));
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        if record.len() != names.len() {
            row_errors.push(RowError {
                line,
                message: format!(
                    "expected {} fields, found {}",
                    names.len(),
                    record.len()
                ),
            });
            continue;
        }
        for (column, raw) in cells.iter_mut().zip(record.iter()) {
            column.push(clean_cell(raw));
        }
    }

    for err in &row_errors {
        warn!(line = err.line, message = %err.message, "skipped CSV record");
    }
    if cells.first().is_none_or(|c| c.is_empty()) {
        return Err(AppError::malformed_input(format!(
            "no valid rows found in CSV ({} records read, {} skipped)",
            rows_read,
            row_errors.len()
        )));
    }

    let mut columns: Vec<Column> = names
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| infer_column(name, raw))
        .collect();
    for column in &columns {
        debug!(column = %column.name, kind = ?column.kind(), "inferred column type");
    }

    let index = match index_column {
        Some(name) => Some(take_index(&mut columns, name)?),
        None => None,
    };

    let dataset = Dataset::new(columns, index)?;
    Ok(IngestedData {
        dataset,
        row_errors,
        rows_read,
    })
}

/// Trimmed header with the UTF-8 BOM removed; blank headers get a positional name.
fn normalize_header_name(raw: &str, position: usize) -> String {
    let name = raw.trim().trim_start_matches('\u{feff}').trim();
    if name.is_empty() {
        format!("column_{position}")
    } else {
        name.to_string()
    }
}

fn clean_cell(raw: &str) -> Option<String> {
    let value = raw.trim();
    let lowered = value.to_ascii_lowercase();
    if MISSING_MARKERS.contains(&lowered.as_str()) {
        None
    } else {
        Some(value.to_string())
    }
}

fn infer_column(name: String, raw: Vec<Option<String>>) -> Column {
    if let Some(values) = parse_all(&raw, parse_number) {
        return Column::numeric_opt(name, values);
    }
    if let Some(values) = parse_all(&raw, parse_datetime) {
        return Column::new(name, ColumnData::DateTime(values));
    }
    Column::new(name, ColumnData::Text(raw))
}

/// Parse every present cell with `parse`; `None` if any of them fails.
///
/// A column with no present cells at all is treated as numeric.
fn parse_all<T>(raw: &[Option<String>], parse: fn(&str) -> Option<T>) -> Option<Vec<Option<T>>> {
    raw.iter()
        .map(|cell| match cell {
            Some(s) => parse(s).map(Some),
            None => Some(None),
        })
        .collect()
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn take_index(columns: &mut Vec<Column>, name: &str) -> Result<RowIndex, AppError> {
    let Some(pos) = columns.iter().position(|c| c.name == name) else {
        return Err(AppError::malformed_input(format!(
            "index column `{name}` not found"
        )));
    };
    let column = columns.remove(pos);
    let ColumnData::DateTime(values) = column.data else {
        return Err(AppError::malformed_input(format!(
            "index column `{name}` is not a date/time column"
        )));
    };
    let stamps: Option<Vec<NaiveDateTime>> = values.into_iter().collect();
    stamps
        .map(RowIndex::DateTime)
        .ok_or_else(|| AppError::malformed_input(format!("index column `{name}` has missing values")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;

    fn load(text: &str, index: Option<&str>) -> Result<IngestedData, AppError> {
        read_csv(text.as_bytes(), index)
    }

    #[test]
    fn infers_column_types() {
        let csv = "\u{feff}date,firm,sales\n\
                   2024-01-01,A,1.5\n\
                   2024-01-02,B,NA\n\
                   2024-01-03,C,3\n";
        let ingested = load(csv, None).unwrap();
        let ds = &ingested.dataset;

        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.column("date").unwrap().kind(), ColumnKind::DateTime);
        assert_eq!(ds.column("firm").unwrap().kind(), ColumnKind::Text);
        assert_eq!(ds.column("sales").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.numeric_series("sales").unwrap(), vec![1.5, 3.0]);
        assert_eq!(ds.missing_cells(), 1);
    }

    #[test]
    fn accepts_several_date_formats() {
        assert!(parse_datetime("2024-03-01").is_some());
        assert!(parse_datetime("2024-03-01 12:30:00").is_some());
        assert!(parse_datetime("2024-03-01T12:30:00").is_some());
        assert!(parse_datetime("01/03/2024").is_some());
        assert!(parse_datetime("2024/03/01").is_some());
        assert!(parse_datetime("March 1st").is_none());
    }

    #[test]
    fn mixed_cells_fall_back_to_text() {
        let ingested = load("id,value\n1,2024-01-01\n2,7\n", None).unwrap();
        assert_eq!(
            ingested.dataset.column("value").unwrap().kind(),
            ColumnKind::Text
        );
    }

    #[test]
    fn ragged_records_become_row_errors() {
        let ingested = load("a,b\n1,2\n3\n4,5\n", None).unwrap();
        assert_eq!(ingested.rows_read, 3);
        assert_eq!(ingested.dataset.row_count(), 2);
        assert_eq!(ingested.row_errors.len(), 1);
        assert_eq!(ingested.row_errors[0].line, 3);
    }

    #[test]
    fn blank_headers_get_positional_names() {
        let ingested = load("a,,c\n1,2,3\n", None).unwrap();
        assert!(ingested.dataset.column("column_1").is_some());
    }

    #[test]
    fn index_column_becomes_row_index() {
        let csv = "date,x\n2024-01-01,1\n2024-01-02,2\n";
        let ingested = load(csv, Some("date")).unwrap();
        let ds = &ingested.dataset;
        assert!(ds.has_datetime_index());
        assert_eq!(ds.column_count(), 1);
        assert!(ds.column("date").is_none());
    }

    #[test]
    fn index_column_must_be_complete_datetime() {
        let err = load("date,x\n2024-01-01,1\n,2\n", Some("date")).unwrap_err();
        assert!(err.message().contains("missing"));

        let err = load("date,x\nfoo,1\nbar,2\n", Some("date")).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);

        let err = load("date,x\n2024-01-01,1\n", Some("when")).unwrap_err();
        assert!(err.message().contains("not found"));
    }

    #[test]
    fn header_only_file_is_malformed() {
        let err = load("a,b\n", None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.message().starts_with("Malformed input: no valid rows"));
    }
}
