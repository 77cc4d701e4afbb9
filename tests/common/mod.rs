//! Shared helpers for the integration tests.

#![allow(dead_code)]

pub use autostat::data::sample::{integrated, white_noise};
use autostat::io::{IngestedData, read_csv};

/// CSV text with a header row; every column must have `rows` entries.
pub fn csv_text(header: &[&str], columns: &[Vec<String>]) -> String {
    let rows = columns.first().map_or(0, Vec::len);
    let mut out = header.join(",");
    out.push('\n');
    for row in 0..rows {
        let cells: Vec<&str> = columns.iter().map(|c| c[row].as_str()).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

pub fn numbers(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Daily ISO dates from 2021-01-01.
pub fn dates(n: usize) -> Vec<String> {
    let start = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    (0..n)
        .map(|i| (start + chrono::Duration::days(i as i64)).format("%Y-%m-%d").to_string())
        .collect()
}

pub fn ingest(text: &str, index: Option<&str>) -> IngestedData {
    read_csv(text.as_bytes(), index).unwrap()
}
