//! Column transformations
//!
//! Each method maps a column (missing values already dropped) to a series
//! of the same length. Results are returned for display and are never
//! written back into the dataset.

use crate::error::{EngineError, Result};
use crate::numeric::{mean, minimize_bounded, population_variance, sample_std};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Initial search interval for the Box-Cox λ
pub const BOX_COX_LAMBDA_BOUNDS: (f64, f64) = (-5.0, 5.0);
/// The interval doubles while λ lands on an edge, up to ±this
pub const BOX_COX_LAMBDA_LIMIT: f64 = 100.0;
const BOX_COX_XTOL: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformMethod {
    MinMax,
    Standardize,
    Log,
    BoxCox,
}

impl TransformMethod {
    pub const ALL: [TransformMethod; 4] = [
        TransformMethod::MinMax,
        TransformMethod::Standardize,
        TransformMethod::Log,
        TransformMethod::BoxCox,
    ];

    pub fn id(self) -> &'static str {
        match self {
            TransformMethod::MinMax => "min-max",
            TransformMethod::Standardize => "standardize",
            TransformMethod::Log => "log",
            TransformMethod::BoxCox => "box-cox",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransformMethod::MinMax => "Min-Max Scaling",
            TransformMethod::Standardize => "Standardize (Z-score)",
            TransformMethod::Log => "Log Transform",
            TransformMethod::BoxCox => "Box-Cox Transform",
        }
    }

    fn needs_positive(self) -> bool {
        matches!(self, TransformMethod::Log | TransformMethod::BoxCox)
    }
}

impl fmt::Display for TransformMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TransformMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min-max" | "minmax" => Ok(TransformMethod::MinMax),
            "standardize" | "z-score" | "zscore" => Ok(TransformMethod::Standardize),
            "log" => Ok(TransformMethod::Log),
            "box-cox" | "boxcox" => Ok(TransformMethod::BoxCox),
            _ => Err(EngineError::UnknownMethod(s.to_string())),
        }
    }
}

/// Original and transformed values side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedSeries {
    pub method: TransformMethod,
    pub column: String,
    pub original: Vec<f64>,
    pub transformed: Vec<f64>,
    /// Fitted λ, Box-Cox only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
}

impl TransformedSeries {
    pub fn to_report_string(&self) -> String {
        let mut report = format!("{} of '{}'\n", self.method, self.column);
        if let Some(lambda) = self.lambda {
            report.push_str(&format!("  lambda: {lambda:.6}\n"));
        }
        report.push_str(&format!("  {:>14}  {:>14}\n", "original", "transformed"));
        for (o, t) in self.original.iter().zip(&self.transformed) {
            report.push_str(&format!("  {o:>14.6}  {t:>14.6}\n"));
        }
        report
    }
}

/// Transform a column's present values
pub fn transform(
    method: TransformMethod,
    column: &str,
    values: &[f64],
) -> Result<TransformedSeries> {
    if values.is_empty() {
        return Err(EngineError::EmptyColumn(column.to_string()));
    }

    // Domain check precedes any computation
    if method.needs_positive() {
        let count = values.iter().filter(|&&v| v <= 0.0).count();
        if count > 0 {
            tracing::warn!(method = method.id(), column, count, "non-positive values");
            return Err(EngineError::NonPositiveValues {
                method: method.label(),
                column: column.to_string(),
                count,
            });
        }
    }

    let (transformed, lambda) = match method {
        TransformMethod::MinMax => (min_max(column, values)?, None),
        TransformMethod::Standardize => (standardize(column, values)?, None),
        TransformMethod::Log => (values.iter().map(|v| v.ln()).collect(), None),
        TransformMethod::BoxCox => {
            let lambda = box_cox_lambda(column, values)?;
            tracing::debug!(column, lambda, "Box-Cox lambda");
            (
                values.iter().map(|&v| box_cox(v, lambda)).collect(),
                Some(lambda),
            )
        }
    };

    Ok(TransformedSeries {
        method,
        column: column.to_string(),
        original: values.to_vec(),
        transformed,
        lambda,
    })
}

fn min_max(column: &str, values: &[f64]) -> Result<Vec<f64>> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return Err(EngineError::ZeroRange(column.to_string()));
    }
    Ok(values.iter().map(|v| (v - min) / range).collect())
}

fn standardize(column: &str, values: &[f64]) -> Result<Vec<f64>> {
    let std = sample_std(values);
    if std == 0.0 {
        return Err(EngineError::ZeroStandardDeviation(column.to_string()));
    }
    let m = mean(values);
    Ok(values.iter().map(|v| (v - m) / std).collect())
}

/// (x^λ − 1)/λ, or ln x at λ = 0
pub fn box_cox(x: f64, lambda: f64) -> f64 {
    if lambda == 0.0 {
        x.ln()
    } else {
        (lambda * x.ln()).exp_m1() / lambda
    }
}

/// Box-Cox profile log-likelihood at λ
fn box_cox_llf(values: &[f64], log_sum: f64, lambda: f64) -> f64 {
    let y: Vec<f64> = values.iter().map(|&v| box_cox(v, lambda)).collect();
    let n = values.len() as f64;
    (lambda - 1.0) * log_sum - n / 2.0 * population_variance(&y).ln()
}

/// λ maximizing the Box-Cox log-likelihood. The bracket starts at
/// [`BOX_COX_LAMBDA_BOUNDS`] and widens until the optimum is interior.
fn box_cox_lambda(column: &str, values: &[f64]) -> Result<f64> {
    let first = values[0];
    if values.iter().all(|&v| v == first) {
        return Err(EngineError::ConstantData(
            column.to_string(),
            TransformMethod::BoxCox.label(),
        ));
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    let (mut lower, mut upper) = BOX_COX_LAMBDA_BOUNDS;
    let lambda = loop {
        let lambda = minimize_bounded(
            |lambda| -box_cox_llf(values, log_sum, lambda),
            lower,
            upper,
            BOX_COX_XTOL,
        );
        let edge = 1e-6 * (upper - lower);
        let interior = lambda - lower > edge && upper - lambda > edge;
        if interior || upper >= BOX_COX_LAMBDA_LIMIT {
            break lambda;
        }
        lower = (lower * 2.0).max(-BOX_COX_LAMBDA_LIMIT);
        upper = (upper * 2.0).min(BOX_COX_LAMBDA_LIMIT);
        tracing::debug!(column, lower, upper, "Box-Cox lambda on bracket edge, widening");
    };
    if lambda.is_finite() {
        Ok(lambda)
    } else {
        Err(EngineError::Numeric(format!(
            "Box-Cox lambda search diverged on column '{column}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN: [f64; 10] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];

    #[test]
    fn test_min_max_endpoints_exact() {
        let r = transform(TransformMethod::MinMax, "x", &[4.0, 2.0, 10.0, 6.0]).unwrap();
        assert_eq!(r.transformed, vec![0.25, 0.0, 1.0, 0.5]);
        assert_eq!(r.original, vec![4.0, 2.0, 10.0, 6.0]);
        assert!(r.lambda.is_none());
    }

    #[test]
    fn test_min_max_constant_column() {
        assert_eq!(
            transform(TransformMethod::MinMax, "x", &[3.0, 3.0]),
            Err(EngineError::ZeroRange("x".into()))
        );
    }

    #[test]
    fn test_standardize_moments() {
        let r = transform(TransformMethod::Standardize, "x", &TEN).unwrap();
        assert!(mean(&r.transformed).abs() < 1e-12);
        assert!((sample_std(&r.transformed) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardize_degenerate() {
        assert_eq!(
            transform(TransformMethod::Standardize, "x", &[7.0]),
            Err(EngineError::ZeroStandardDeviation("x".into()))
        );
    }

    #[test]
    fn test_log() {
        let r = transform(TransformMethod::Log, "x", &[1.0, std::f64::consts::E]).unwrap();
        assert_eq!(r.transformed[0], 0.0);
        assert!((r.transformed[1] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_non_positive_rejected_before_compute() {
        for method in [TransformMethod::Log, TransformMethod::BoxCox] {
            assert_eq!(
                transform(method, "x", &[1.0, 0.0, -2.0, 5.0]),
                Err(EngineError::NonPositiveValues {
                    method: method.label(),
                    column: "x".into(),
                    count: 2,
                })
            );
        }
        // constant and non-positive: the domain error wins
        assert!(matches!(
            transform(TransformMethod::BoxCox, "x", &[0.0, 0.0]),
            Err(EngineError::NonPositiveValues { .. })
        ));
    }

    #[test]
    fn test_box_cox_lambda_reference() {
        let r = transform(TransformMethod::BoxCox, "x", &TEN).unwrap();
        let lambda = r.lambda.unwrap();
        assert!((lambda - 0.721_964).abs() < 1e-4);
        assert_eq!(r.transformed.len(), TEN.len());
        assert!((r.transformed[9] - box_cox(10.0, lambda)).abs() < 1e-12);
    }

    #[test]
    fn test_box_cox_geometric_series_is_log() {
        let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0];
        let r = transform(TransformMethod::BoxCox, "x", &values).unwrap();
        assert!(r.lambda.unwrap().abs() < 1e-4);
    }

    #[test]
    fn test_box_cox_lambda_beyond_initial_bracket() {
        // Left-skewed, piled up near the maximum: the optimum is near 36.85
        let values = [10.0, 10.5, 10.8, 10.9, 10.95, 10.97, 10.99, 11.0];
        let log_sum: f64 = values.iter().map(|v: &f64| v.ln()).sum();
        let lambda = box_cox_lambda("x", &values).unwrap();
        assert!((lambda - 36.853).abs() < 1e-2);
        assert!(box_cox_llf(&values, log_sum, lambda) > box_cox_llf(&values, log_sum, 5.0));
    }

    #[test]
    fn test_box_cox_lambda_beats_grid() {
        let values = [0.5, 1.2, 2.0, 3.3, 7.9, 15.0, 40.0];
        let log_sum: f64 = values.iter().map(|v: &f64| v.ln()).sum();
        let lambda = box_cox_lambda("x", &values).unwrap();
        let best = box_cox_llf(&values, log_sum, lambda);
        for step in -50..=50 {
            let candidate = step as f64 / 10.0;
            assert!(best >= box_cox_llf(&values, log_sum, candidate) - 1e-9);
        }
    }

    #[test]
    fn test_box_cox_constant() {
        assert!(matches!(
            transform(TransformMethod::BoxCox, "x", &[2.0, 2.0, 2.0]),
            Err(EngineError::ConstantData(..))
        ));
    }

    #[test]
    fn test_empty_column() {
        for method in TransformMethod::ALL {
            assert_eq!(
                transform(method, "x", &[]),
                Err(EngineError::EmptyColumn("x".into()))
            );
        }
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("z-score".parse::<TransformMethod>().unwrap(), TransformMethod::Standardize);
        assert_eq!("box-cox".parse::<TransformMethod>().unwrap(), TransformMethod::BoxCox);
        assert!("sqrt".parse::<TransformMethod>().is_err());
    }
}
