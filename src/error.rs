//! Error types for the analysis engine.
//!
//! Every rejected request maps to exactly one named variant so the caller
//! can show a specific message instead of a generic failure. Variants fall
//! into three kinds (see [`ErrorKind`]): caller-correctable preconditions,
//! degenerate data, and features switched off by an administrator.

use crate::features::Feature;
use thiserror::Error;

/// Broad classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input validation failed; the caller can fix the request
    Precondition,
    /// Data is degenerate (zero variance, zero range, empty)
    DegenerateData,
    /// The operation is hidden by the feature gate
    FeatureDisabled,
}

/// Errors returned by the test selector, normality selector and
/// transformation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown procedure '{0}'")]
    UnknownProcedure(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Column '{0}' does not exist in the dataset")]
    UnknownColumn(String),

    #[error("Column '{0}' is not numeric")]
    NonNumericColumn(String),

    #[error("{procedure} needs at least {required} numeric column(s), got {actual}")]
    InsufficientColumns {
        procedure: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Column '{0}' was selected more than once; choose distinct columns")]
    DuplicateColumn(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name} = {value}: {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        constraint: &'static str,
    },

    #[error("Significance level must lie strictly between 0 and 1, got {0}")]
    InvalidSignificanceLevel(f64),

    #[error("Column '{0}' has no values after dropping missing entries")]
    EmptyColumn(String),

    #[error("{context} needs at least {required} observations, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Paired columns differ in length after dropping missing values: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Zero variance in {0}; the test statistic is undefined")]
    ZeroVariance(String),

    #[error("Column '{0}' is constant (zero range); Min-Max scaling is undefined")]
    ZeroRange(String),

    #[error("Column '{0}' has zero standard deviation; standardization is undefined")]
    ZeroStandardDeviation(String),

    #[error(
        "{method} requires strictly positive values; column '{column}' has {count} value(s) <= 0"
    )]
    NonPositiveValues {
        method: &'static str,
        column: String,
        count: usize,
    },

    #[error("All paired differences are zero; the signed-rank test is undefined")]
    AllDifferencesZero,

    #[error("Column '{0}' is constant; {1} is undefined")]
    ConstantData(String, &'static str),

    #[error("Feature '{0}' is disabled by the administrator")]
    FeatureDisabled(Feature),

    #[error("Numerical failure: {0}")]
    Numeric(String),
}

impl EngineError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyColumn(_)
            | EngineError::ZeroVariance(_)
            | EngineError::ZeroRange(_)
            | EngineError::ZeroStandardDeviation(_)
            | EngineError::AllDifferencesZero
            | EngineError::ConstantData(..)
            | EngineError::Numeric(_) => ErrorKind::DegenerateData,
            EngineError::FeatureDisabled(_) => ErrorKind::FeatureDisabled,
            _ => ErrorKind::Precondition,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
