//! Chart series
//!
//! Charts are handed to the rendering boundary as numeric series; nothing
//! here draws. Every builder checks its feature flag first and fails with
//! `FeatureDisabled` when an administrator has switched the plot off.
//!
//! Histograms, boxplots and scatters also come in a combined form covering
//! several columns at once: one panel per column, or a scatter matrix.

use crate::dataset::Dataset;
use crate::descriptive::{correlation_matrix, CorrelationMatrix};
use crate::error::{EngineError, Result};
use crate::features::{Feature, FeatureGate};
use crate::numeric::{mean, normal_ppf, percentile, sample_std, sorted};
use serde::{Deserialize, Serialize};

/// Boxplot whisker reach, in interquartile ranges
pub const WHISKER_IQR: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub bins: Vec<HistogramBin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boxplot {
    pub column: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub x_column: String,
    pub y_column: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QqPlot {
    pub column: String,
    /// (theoretical quantile, ordered observation)
    pub points: Vec<(f64, f64)>,
    pub slope: f64,
    pub intercept: f64,
}

/// Scatter matrix: per-column histograms on the diagonal, one scatter per
/// ordered pair of distinct columns off it (row-major)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairGrid {
    pub columns: Vec<String>,
    pub diagonal: Vec<Histogram>,
    pub scatters: Vec<Scatter>,
}

/// Several charts of one kind drawn together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panels {
    pub panels: Vec<Chart>,
}

/// One of the chart kinds, for callers that render generically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Chart {
    Histogram(Histogram),
    Boxplot(Boxplot),
    Scatter(Scatter),
    Qq(QqPlot),
    Heatmap(CorrelationMatrix),
    Combined(Panels),
    PairGrid(PairGrid),
}

impl Chart {
    pub fn to_report_string(&self) -> String {
        match self {
            Chart::Histogram(h) => {
                let mut out = format!("Histogram of '{}'\n", h.column);
                for bin in &h.bins {
                    out.push_str(&format!(
                        "  [{:>12.4}, {:>12.4})  {:>6}\n",
                        bin.lower, bin.upper, bin.count
                    ));
                }
                out
            }
            Chart::Boxplot(b) => format!(
                "Boxplot of '{}'\n  whiskers: {:.4} .. {:.4}\n  \
                 quartiles: {:.4} / {:.4} / {:.4}\n  outliers: {:?}\n",
                b.column, b.lower_whisker, b.upper_whisker, b.q1, b.median, b.q3, b.outliers
            ),
            Chart::Scatter(s) => {
                let mut out = format!("Scatter of '{}' vs '{}'\n", s.y_column, s.x_column);
                for (x, y) in &s.points {
                    out.push_str(&format!("  {x:>12.4}  {y:>12.4}\n"));
                }
                out
            }
            Chart::Qq(q) => {
                let mut out = format!(
                    "Q-Q plot of '{}' (line: {:.4} + {:.4}·z)\n",
                    q.column, q.intercept, q.slope
                );
                for (z, x) in &q.points {
                    out.push_str(&format!("  {z:>10.4}  {x:>12.4}\n"));
                }
                out
            }
            Chart::Heatmap(m) => m.to_report_string(),
            Chart::Combined(p) => p
                .panels
                .iter()
                .map(Chart::to_report_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Chart::PairGrid(g) => {
                let mut out = format!("Scatter matrix of {}\n", g.columns.join(", "));
                for h in &g.diagonal {
                    out.push('\n');
                    out.push_str(&Chart::Histogram(h.clone()).to_report_string());
                }
                for s in &g.scatters {
                    out.push('\n');
                    out.push_str(&Chart::Scatter(s.clone()).to_report_string());
                }
                out
            }
        }
    }
}

fn non_empty(dataset: &Dataset, column: &str) -> Result<Vec<f64>> {
    let values = dataset.numeric_values(column)?;
    if values.is_empty() {
        return Err(EngineError::EmptyColumn(column.to_string()));
    }
    Ok(values)
}

/// Columns for a combined chart: the given ones, or every numeric column
fn combined_columns<'a>(
    dataset: &'a Dataset,
    columns: &[&'a str],
    chart: &'static str,
    required: usize,
) -> Result<Vec<&'a str>> {
    let names = if columns.is_empty() {
        dataset.numeric_column_names()
    } else {
        columns.to_vec()
    };
    if names.len() < required {
        return Err(EngineError::InsufficientColumns {
            procedure: chart,
            required,
            actual: names.len(),
        });
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(EngineError::DuplicateColumn(name.to_string()));
        }
    }
    Ok(names)
}

/// Equal-width histogram. The last bin is closed on the right; a constant
/// column is spread over [v − 0.5, v + 0.5].
pub fn histogram(
    gate: &FeatureGate,
    dataset: &Dataset,
    column: &str,
    bins: usize,
) -> Result<Histogram> {
    gate.require(Feature::Histogram)?;
    histogram_series(dataset, column, bins)
}

/// One histogram per column, drawn together
pub fn histograms(
    gate: &FeatureGate,
    dataset: &Dataset,
    columns: &[&str],
    bins: usize,
) -> Result<Panels> {
    gate.require(Feature::Histogram)?;
    let panels = combined_columns(dataset, columns, "Combined histogram", 1)?
        .into_iter()
        .map(|column| histogram_series(dataset, column, bins).map(Chart::Histogram))
        .collect::<Result<_>>()?;
    Ok(Panels { panels })
}

fn histogram_series(dataset: &Dataset, column: &str, bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(EngineError::InvalidParameter {
            name: "bins",
            value: bins.to_string(),
            constraint: "must be at least 1",
        });
    }
    let values = non_empty(dataset, column)?;

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram {
        column: column.to_string(),
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lo + width * i as f64,
                upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
                count,
            })
            .collect(),
    })
}

/// Quartiles, whiskers at the furthest points within 1.5·IQR, and the
/// points beyond them
pub fn boxplot(gate: &FeatureGate, dataset: &Dataset, column: &str) -> Result<Boxplot> {
    gate.require(Feature::Boxplot)?;
    boxplot_series(dataset, column)
}

/// Side-by-side boxplots on a shared axis
pub fn boxplots(gate: &FeatureGate, dataset: &Dataset, columns: &[&str]) -> Result<Panels> {
    gate.require(Feature::Boxplot)?;
    let panels = combined_columns(dataset, columns, "Combined boxplot", 1)?
        .into_iter()
        .map(|column| boxplot_series(dataset, column).map(Chart::Boxplot))
        .collect::<Result<_>>()?;
    Ok(Panels { panels })
}

fn boxplot_series(dataset: &Dataset, column: &str) -> Result<Boxplot> {
    let data = sorted(&non_empty(dataset, column)?);

    let q1 = percentile(&data, 0.25);
    let median = percentile(&data, 0.5);
    let q3 = percentile(&data, 0.75);
    let iqr = q3 - q1;
    let low_fence = q1 - WHISKER_IQR * iqr;
    let high_fence = q3 + WHISKER_IQR * iqr;

    let inside: Vec<f64> = data
        .iter()
        .copied()
        .filter(|&v| v >= low_fence && v <= high_fence)
        .collect();
    let outliers: Vec<f64> = data
        .iter()
        .copied()
        .filter(|&v| v < low_fence || v > high_fence)
        .collect();

    Ok(Boxplot {
        column: column.to_string(),
        q1,
        median,
        q3,
        // quartiles lie inside the fences, so `inside` is never empty
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers,
    })
}

/// Row-aligned pairs where both cells are present
pub fn scatter(gate: &FeatureGate, dataset: &Dataset, x: &str, y: &str) -> Result<Scatter> {
    gate.require(Feature::ScatterPlot)?;
    scatter_series(dataset, x, y)
}

/// Scatter matrix over the given columns (all numeric when empty). The
/// diagonal histograms belong to the scatter feature, not the histogram one.
pub fn pair_grid(
    gate: &FeatureGate,
    dataset: &Dataset,
    columns: &[&str],
    bins: usize,
) -> Result<PairGrid> {
    gate.require(Feature::ScatterPlot)?;
    let names = combined_columns(dataset, columns, "Scatter matrix", 2)?;

    let diagonal = names
        .iter()
        .map(|column| histogram_series(dataset, column, bins))
        .collect::<Result<_>>()?;
    let mut scatters = Vec::with_capacity(names.len() * (names.len() - 1));
    for y in &names {
        for x in &names {
            if x != y {
                scatters.push(scatter_series(dataset, x, y)?);
            }
        }
    }

    Ok(PairGrid {
        columns: names.into_iter().map(String::from).collect(),
        diagonal,
        scatters,
    })
}

fn scatter_series(dataset: &Dataset, x: &str, y: &str) -> Result<Scatter> {
    let points = dataset.paired_values(x, y)?;
    if points.is_empty() {
        return Err(EngineError::InsufficientData {
            context: format!("Scatter of '{y}' vs '{x}'"),
            required: 1,
            actual: 0,
        });
    }
    Ok(Scatter {
        x_column: x.to_string(),
        y_column: y.to_string(),
        points,
    })
}

/// Normal Q-Q points at plotting positions i/(n+1), with the reference
/// line x̄ + s·z
///
/// Shown alongside normality tests, so it is gated by the normality flag.
pub fn qq_plot(gate: &FeatureGate, dataset: &Dataset, column: &str) -> Result<QqPlot> {
    gate.require(Feature::NormalityTest)?;
    let data = sorted(&non_empty(dataset, column)?);
    let n = data.len() as f64;

    let points = data
        .iter()
        .enumerate()
        .map(|(i, &x)| (normal_ppf((i + 1) as f64 / (n + 1.0)), x))
        .collect();

    Ok(QqPlot {
        column: column.to_string(),
        points,
        slope: sample_std(&data),
        intercept: mean(&data),
    })
}

/// Correlation heatmap over the given columns (all numeric when empty)
pub fn heatmap(
    gate: &FeatureGate,
    dataset: &Dataset,
    columns: &[&str],
) -> Result<CorrelationMatrix> {
    gate.require(Feature::Heatmap)?;
    correlation_matrix(dataset, columns)
}
