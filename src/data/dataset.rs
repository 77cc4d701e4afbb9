//! In-memory tabular dataset.
//!
//! A `Dataset` is an ordered list of typed columns of equal length plus an
//! optional row index. It is validated once on construction and treated as
//! read-only afterwards; analyses that transform a series (differencing, row
//! filtering) work on copies.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::AppError;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
    DateTime,
}

/// Cell storage; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Numeric column without gaps. Non-finite values are stored as missing.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(
            name,
            ColumnData::Numeric(
                values
                    .into_iter()
                    .map(|v| v.is_finite().then_some(v))
                    .collect(),
            ),
        )
    }

    pub fn numeric_opt(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(
            name,
            ColumnData::Numeric(
                values
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()))
                    .collect(),
            ),
        )
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|s| Some(s.into())).collect()),
        )
    }

    pub fn datetime(name: impl Into<String>, values: Vec<NaiveDateTime>) -> Self {
        Self::new(
            name,
            ColumnData::DateTime(values.into_iter().map(Some).collect()),
        )
    }

    pub fn kind(&self) -> ColumnKind {
        match &self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::DateTime(_) => ColumnKind::DateTime,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn is_datetime(&self) -> bool {
        self.kind() == ColumnKind::DateTime
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::DateTime(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Numeric cells, or `None` for non-numeric columns.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Grouping key of a cell (used for entity/time roles). `None` if missing.
    pub fn key_at(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(|x| x.to_string()),
            ColumnData::Text(v) => v.get(row).cloned().flatten(),
            ColumnData::DateTime(v) => v.get(row).copied().flatten().map(|d| d.to_string()),
        }
    }
}

/// Optional ordered row index.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIndex {
    /// One timestamp per row.
    DateTime(Vec<NaiveDateTime>),
    /// Entity identifier plus time label per row.
    EntityTime {
        entities: Vec<String>,
        times: Vec<String>,
    },
}

impl RowIndex {
    fn len(&self) -> usize {
        match self {
            RowIndex::DateTime(v) => v.len(),
            RowIndex::EntityTime { entities, times } => entities.len().min(times.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    index: Option<RowIndex>,
    rows: usize,
}

impl Dataset {
    /// Validate and build a dataset.
    ///
    /// Rejects datasets without columns or rows, ragged columns, duplicate
    /// column names and an index whose length differs from the row count.
    pub fn new(columns: Vec<Column>, index: Option<RowIndex>) -> Result<Self, AppError> {
        let Some(first) = columns.first() else {
            return Err(AppError::malformed_input("dataset has no columns"));
        };
        let rows = first.len();
        if rows == 0 {
            return Err(AppError::malformed_input("dataset has no rows"));
        }
        for column in &columns {
            if column.len() != rows {
                return Err(AppError::malformed_input(format!(
                    "column `{}` has {} rows, expected {rows}",
                    column.name,
                    column.len()
                )));
            }
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(AppError::malformed_input(format!(
                    "duplicate column name `{}`",
                    column.name
                )));
            }
        }
        if let Some(index) = &index {
            if let RowIndex::EntityTime { entities, times } = index {
                if entities.len() != times.len() {
                    return Err(AppError::malformed_input(
                        "entity and time index levels differ in length",
                    ));
                }
            }
            if index.len() != rows {
                return Err(AppError::malformed_input(format!(
                    "row index has {} entries, expected {rows}",
                    index.len()
                )));
            }
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self, AppError> {
        Self::new(columns, None)
    }

    /// A dataset with the same row index and replacement columns.
    pub fn with_columns(&self, columns: Vec<Column>) -> Result<Self, AppError> {
        Self::new(columns, self.index.clone())
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self) -> Option<&RowIndex> {
        self.index.as_ref()
    }

    pub fn has_datetime_index(&self) -> bool {
        matches!(self.index, Some(RowIndex::DateTime(_)))
    }

    /// Numeric columns in dataset order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    /// Non-missing values of a numeric column, in row order.
    pub fn numeric_series(&self, name: &str) -> Option<Vec<f64>> {
        let cells = self.column(name)?.as_numeric()?;
        Some(cells.iter().flatten().copied().collect())
    }

    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    pub fn total_cells(&self) -> usize {
        self.rows * self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_ragged_datasets() {
        assert_eq!(Dataset::from_columns(vec![]).unwrap_err().exit_code(), 2);
        assert_eq!(
            Dataset::from_columns(vec![Column::numeric("x", vec![])])
                .unwrap_err()
                .exit_code(),
            2
        );

        let ragged = Dataset::from_columns(vec![
            Column::numeric("x", vec![1.0, 2.0]),
            Column::numeric("y", vec![1.0]),
        ]);
        assert!(ragged.unwrap_err().message().contains("column `y`"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Dataset::from_columns(vec![
            Column::numeric("x", vec![1.0]),
            Column::numeric("x", vec![2.0]),
        ])
        .unwrap_err();
        assert!(err.message().contains("duplicate"));
    }

    #[test]
    fn numeric_series_drops_missing_cells() {
        let ds = Dataset::from_columns(vec![Column::numeric_opt(
            "x",
            vec![Some(1.0), None, Some(f64::NAN), Some(4.0)],
        )])
        .unwrap();

        assert_eq!(ds.numeric_series("x").unwrap(), vec![1.0, 4.0]);
        assert_eq!(ds.missing_cells(), 2);
        assert_eq!(ds.total_cells(), 4);
    }

    #[test]
    fn key_at_formats_cells() {
        let col = Column::numeric("year", vec![2020.0, 2021.5]);
        assert_eq!(col.key_at(0).as_deref(), Some("2020"));
        assert_eq!(col.key_at(1).as_deref(), Some("2021.5"));
        assert_eq!(col.key_at(5), None);
    }
}
