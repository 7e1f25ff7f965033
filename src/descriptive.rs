//! Descriptive statistics: per-column summary and correlation matrix

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use crate::numeric::{mean, pearson, percentile, sample_std, sorted};
use serde::{Deserialize, Serialize};

/// Summary row for one numeric column (missing values dropped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); NaN for a single value
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn from_values(column: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let data = sorted(values);
        Some(Self {
            column: column.to_string(),
            count: data.len(),
            mean: mean(&data),
            std: if data.len() < 2 { f64::NAN } else { sample_std(&data) },
            min: data[0],
            q25: percentile(&data, 0.25),
            median: percentile(&data, 0.5),
            q75: percentile(&data, 0.75),
            max: data[data.len() - 1],
        })
    }
}

/// Summary of every numeric column, in dataset order. Columns with no
/// present values are skipped.
pub fn describe(dataset: &Dataset) -> Vec<ColumnSummary> {
    dataset
        .numeric_column_names()
        .into_iter()
        .filter_map(|name| {
            let values = dataset.numeric_values(name).ok()?;
            ColumnSummary::from_values(name, &values)
        })
        .collect()
}

pub fn summary_report(summaries: &[ColumnSummary]) -> String {
    let mut report = format!(
        "{:<16} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summaries {
        report.push_str(&format!(
            "{:<16} {:>6} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}\n",
            s.column, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        ));
    }
    report
}

/// Square Pearson correlation matrix. Cells are `None` when a pair has
/// fewer than two complete rows or either side is constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == row)?;
        let j = self.columns.iter().position(|c| c == col)?;
        self.values[i][j]
    }

    pub fn to_report_string(&self) -> String {
        let mut report = format!("{:<16}", "");
        for c in &self.columns {
            report.push_str(&format!(" {c:>12}"));
        }
        report.push('\n');
        for (name, row) in self.columns.iter().zip(&self.values) {
            report.push_str(&format!("{name:<16}"));
            for cell in row {
                match cell {
                    Some(r) => report.push_str(&format!(" {r:>12.4}")),
                    None => report.push_str(&format!(" {:>12}", "-")),
                }
            }
            report.push('\n');
        }
        report
    }
}

/// Pairwise correlation over the given columns, or all numeric columns
/// when `columns` is empty. Each pair uses rows where both are present.
pub fn correlation_matrix(dataset: &Dataset, columns: &[&str]) -> Result<CorrelationMatrix> {
    let names: Vec<&str> = if columns.is_empty() {
        dataset.numeric_column_names()
    } else {
        columns.to_vec()
    };
    if names.len() < 2 {
        return Err(EngineError::InsufficientColumns {
            procedure: "Correlation matrix",
            required: 2,
            actual: names.len(),
        });
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(EngineError::DuplicateColumn(name.to_string()));
        }
        dataset.numeric_values(name)?;
    }

    let k = names.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let pairs = dataset.paired_values(names[i], names[j])?;
            let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let r = if i == j {
                // diagonal is 1 whenever the column varies
                pearson(&x, &y).map(|_| 1.0)
            } else {
                pearson(&x, &y)
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    tracing::debug!(columns = k, "correlation matrix computed");

    Ok(CorrelationMatrix {
        columns: names.into_iter().map(String::from).collect(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn dataset() -> Dataset {
        Dataset::from_columns(vec![
            Column::text("label", vec![Some("a".into()); 5]),
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
            Column::numeric("y", vec![Some(2.0), Some(4.0), None, Some(8.0), Some(10.0)]),
            Column::numeric("z", vec![Some(5.0), Some(4.0), Some(3.0), Some(2.0), Some(1.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_describe_skips_text_columns() {
        let summaries = describe(&dataset());
        let names: Vec<&str> = summaries.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_describe_quartiles() {
        let summaries = describe(&dataset());
        let x = &summaries[0];
        assert_eq!(x.count, 5);
        assert_eq!(x.mean, 3.0);
        assert!((x.std - 2.5f64.sqrt()).abs() < 1e-12);
        assert_eq!((x.min, x.q25, x.median, x.q75, x.max), (1.0, 2.0, 3.0, 4.0, 5.0));

        // y drops the missing cell: [2, 4, 8, 10]
        let y = &summaries[1];
        assert_eq!(y.count, 4);
        assert_eq!(y.q25, 3.5);
        assert_eq!(y.median, 6.0);
        assert_eq!(y.q75, 8.5);
    }

    #[test]
    fn test_single_value_std_is_nan() {
        let s = ColumnSummary::from_values("x", &[4.0]).unwrap();
        assert!(s.std.is_nan());
        assert_eq!(s.median, 4.0);
        assert!(ColumnSummary::from_values("x", &[]).is_none());
    }

    #[test]
    fn test_correlation_matrix_pairwise_complete() {
        let m = correlation_matrix(&dataset(), &[]).unwrap();
        assert_eq!(m.columns, vec!["x", "y", "z"]);
        assert!((m.get("x", "y").unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get("x", "z").unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.get("z", "z"), Some(1.0));
        assert_eq!(m.get("y", "x"), m.get("x", "y"));
    }

    #[test]
    fn test_correlation_matrix_errors() {
        let ds = dataset();
        assert!(matches!(
            correlation_matrix(&ds, &["x"]),
            Err(EngineError::InsufficientColumns { .. })
        ));
        assert_eq!(
            correlation_matrix(&ds, &["x", "x"]),
            Err(EngineError::DuplicateColumn("x".into()))
        );
        assert_eq!(
            correlation_matrix(&ds, &["x", "label"]),
            Err(EngineError::NonNumericColumn("label".into()))
        );
    }

    #[test]
    fn test_constant_column_has_no_correlation() {
        let ds = Dataset::from_columns(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("c", vec![Some(7.0), Some(7.0), Some(7.0)]),
        ])
        .unwrap();
        let m = correlation_matrix(&ds, &[]).unwrap();
        assert_eq!(m.get("x", "c"), None);
        assert_eq!(m.get("c", "c"), None);
        assert!(m.to_report_string().contains('-'));
    }
}
