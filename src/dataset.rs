//! Tabular dataset: ordered, uniquely named, position-aligned columns
//!
//! A dataset is created by ingestion or manual entry, replaced wholesale on
//! the next load, edited in place by the manual-entry operations below, and
//! dropped on logout.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder written into text cells of a newly added row
pub const NEW_ROW_TEXT: &str = "new_sample";

/// Errors from structural edits to a dataset
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Column name must not be empty")]
    EmptyName,

    #[error("Column '{0}' already exists")]
    DuplicateName(String),

    #[error("Column '{0}' does not exist")]
    UnknownColumn(String),

    #[error("Column '{name}' has {actual} rows, expected {expected}")]
    RowCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row {row} is out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("Value '{value}' does not fit numeric column '{column}'")]
    TypeMismatch { column: String, value: String },
}

/// Values of a single column; `None` is a missing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// Numeric values with missing and non-finite entries removed
    pub fn present_values(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Numeric(v) => Some(
                v.iter()
                    .flatten()
                    .copied()
                    .filter(|x| x.is_finite())
                    .collect(),
            ),
            ColumnData::Text(_) => None,
        }
    }
}

/// Ordered collection of uniquely named columns of equal length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dataset from columns, enforcing unique names and equal lengths
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut dataset = Self::new();
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    /// Starter table offered for manual entry
    pub fn manual_template() -> Self {
        let groups = (1..=5).map(|i| Some(format!("Sample{i}"))).collect();
        let a = [10.2, 10.5, 10.4, 10.3, 10.6].map(Some).to_vec();
        let b = [11.3, 11.1, 11.2, 11.0, 11.4].map(Some).to_vec();
        Self {
            columns: vec![
                Column::text("Grup", groups),
                Column::numeric("A", a),
                Column::numeric("B", b),
            ],
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of numeric columns, in dataset order
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.data.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Values of a numeric column with missing entries dropped
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, EngineError> {
        let column = self
            .column(name)
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))?;
        column
            .present_values()
            .ok_or_else(|| EngineError::NonNumericColumn(name.to_string()))
    }

    /// Row-aligned pairs of two numeric columns, keeping rows where both
    /// cells are present
    pub fn paired_values(&self, x: &str, y: &str) -> Result<Vec<(f64, f64)>, EngineError> {
        let raw = |name: &str| -> Result<&Vec<Option<f64>>, EngineError> {
            match &self
                .column(name)
                .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))?
                .data
            {
                ColumnData::Numeric(v) => Ok(v),
                ColumnData::Text(_) => Err(EngineError::NonNumericColumn(name.to_string())),
            }
        };
        let xs = raw(x)?;
        let ys = raw(y)?;
        Ok(xs
            .iter()
            .zip(ys)
            .filter_map(|(a, b)| match (a, b) {
                (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                _ => None,
            })
            .collect())
    }

    fn push_column(&mut self, column: Column) -> Result<(), DatasetError> {
        if column.name.trim().is_empty() {
            return Err(DatasetError::EmptyName);
        }
        if self.column(&column.name).is_some() {
            return Err(DatasetError::DuplicateName(column.name));
        }
        if !self.columns.is_empty() && column.data.len() != self.row_count() {
            return Err(DatasetError::RowCountMismatch {
                name: column.name,
                expected: self.row_count(),
                actual: column.data.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append a row: text cells get [`NEW_ROW_TEXT`], numeric cells 0
    pub fn add_row(&mut self) {
        for column in &mut self.columns {
            match &mut column.data {
                ColumnData::Numeric(v) => v.push(Some(0.0)),
                ColumnData::Text(v) => v.push(Some(NEW_ROW_TEXT.to_string())),
            }
        }
    }

    /// Append a numeric column filled with zeros
    pub fn add_column(&mut self, name: &str) -> Result<(), DatasetError> {
        let rows = self.row_count();
        self.push_column(Column::numeric(name.trim(), vec![Some(0.0); rows]))
    }

    /// Rename a column; the new name must be non-empty and unused
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<(), DatasetError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(DatasetError::EmptyName);
        }
        if self.column(new).is_some() {
            return Err(DatasetError::DuplicateName(new.to_string()));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == old)
            .ok_or_else(|| DatasetError::UnknownColumn(old.to_string()))?;
        column.name = new.to_string();
        Ok(())
    }

    /// Edit one cell. An empty string clears it.
    pub fn set_value(
        &mut self,
        column: &str,
        row: usize,
        value: &str,
    ) -> Result<(), DatasetError> {
        let rows = self.row_count();
        if row >= rows {
            return Err(DatasetError::RowOutOfRange { row, rows });
        }
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| DatasetError::UnknownColumn(column.to_string()))?;
        let value = value.trim();
        match &mut col.data {
            ColumnData::Numeric(v) => {
                v[row] = if value.is_empty() {
                    None
                } else {
                    let parsed = value
                        .parse::<f64>()
                        .ok()
                        .filter(|x| x.is_finite())
                        .ok_or_else(|| DatasetError::TypeMismatch {
                            column: column.to_string(),
                            value: value.to_string(),
                        })?;
                    Some(parsed)
                };
            }
            ColumnData::Text(v) => {
                v[row] = (!value.is_empty()).then(|| value.to_string());
            }
        }
        Ok(())
    }
}
