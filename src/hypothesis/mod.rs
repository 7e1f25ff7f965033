// Hypothesis test selection, computation and decision
//
// A request names a procedure, the columns it reads and any scalar
// parameters. Dispatch goes through a static table (see `dispatch`): each
// entry validates the request into `Operands`, then computes a `Statistic`.
// The decision against alpha is made in exactly one place (`verdict`).
//
// Every procedure is two-sided.

mod dispatch;
mod parametric;
mod rank;
mod verdict;

pub use dispatch::{procedure_spec, ProcedureSpec, PROCEDURES};
pub use verdict::{Decision, TestResult};

use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed catalog of hypothesis tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Procedure {
    OneSampleT,
    TwoSampleT,
    PairedT,
    OneSampleZ,
    OneProportionZ,
    TwoProportionZ,
    FTest,
    Anova,
    MannWhitney,
    Wilcoxon,
}

impl Procedure {
    /// Stable identifier used on the command line and in JSON
    pub fn id(self) -> &'static str {
        match self {
            Procedure::OneSampleT => "one-sample-t",
            Procedure::TwoSampleT => "two-sample-t",
            Procedure::PairedT => "paired-t",
            Procedure::OneSampleZ => "one-sample-z",
            Procedure::OneProportionZ => "one-proportion-z",
            Procedure::TwoProportionZ => "two-proportion-z",
            Procedure::FTest => "f-test",
            Procedure::Anova => "anova",
            Procedure::MannWhitney => "mann-whitney",
            Procedure::Wilcoxon => "wilcoxon",
        }
    }

    /// Human-readable name
    pub fn label(self) -> &'static str {
        match self {
            Procedure::OneSampleT => "One-sample t-test",
            Procedure::TwoSampleT => "Two-sample t-test (Welch)",
            Procedure::PairedT => "Paired t-test",
            Procedure::OneSampleZ => "One-sample z-test",
            Procedure::OneProportionZ => "One-proportion z-test",
            Procedure::TwoProportionZ => "Two-proportion z-test",
            Procedure::FTest => "F-test for equal variances",
            Procedure::Anova => "One-way ANOVA",
            Procedure::MannWhitney => "Mann-Whitney U test",
            Procedure::Wilcoxon => "Wilcoxon signed-rank test",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Procedure {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PROCEDURES
            .iter()
            .map(|spec| spec.procedure)
            .find(|p| p.id() == wanted)
            .ok_or_else(|| EngineError::UnknownProcedure(s.to_string()))
    }
}

/// Scalar parameters; which ones are required depends on the procedure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestParams {
    /// Hypothesized mean μ₀
    pub mu0: Option<f64>,
    /// Known population standard deviation σ
    pub sigma: Option<f64>,
    /// Successes in the one-proportion test
    pub x: Option<u64>,
    /// Trials in the one-proportion test
    pub n: Option<u64>,
    /// Hypothesized proportion p₀
    pub p0: Option<f64>,
    /// Successes in the first two-proportion sample
    pub x1: Option<u64>,
    /// Trials in the first two-proportion sample
    pub n1: Option<u64>,
    /// Successes in the second two-proportion sample
    pub x2: Option<u64>,
    /// Trials in the second two-proportion sample
    pub n2: Option<u64>,
}

impl TestParams {
    pub(crate) fn require_f64(value: Option<f64>, name: &'static str) -> Result<f64> {
        let v = value.ok_or(EngineError::MissingParameter(name))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(EngineError::InvalidParameter {
                name,
                value: v.to_string(),
                constraint: "must be a finite number",
            })
        }
    }

    pub(crate) fn require_count(value: Option<u64>, name: &'static str) -> Result<u64> {
        value.ok_or(EngineError::MissingParameter(name))
    }
}

/// An immutable request producing exactly one result or one error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRequest {
    pub procedure: Procedure,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub params: TestParams,
    pub alpha: f64,
}

impl TestRequest {
    pub fn new(procedure: Procedure, columns: &[&str], alpha: f64) -> Self {
        Self {
            procedure,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            params: TestParams::default(),
            alpha,
        }
    }

    pub fn with_params(mut self, params: TestParams) -> Self {
        self.params = params;
        self
    }
}

/// One column's values with missing entries dropped
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub column: String,
    pub values: Vec<f64>,
}

/// Validated inputs handed from a precondition check to its compute step
#[derive(Debug, Clone, PartialEq)]
pub enum Operands {
    /// Count-based procedures read parameters only
    Counts,
    One(Sample),
    Two(Sample, Sample),
    Groups(Vec<Sample>),
}

impl Operands {
    pub(crate) fn one(&self) -> Result<&Sample> {
        match self {
            Operands::One(s) => Ok(s),
            other => Err(shape_mismatch("one sample", other)),
        }
    }

    pub(crate) fn two(&self) -> Result<(&Sample, &Sample)> {
        match self {
            Operands::Two(a, b) => Ok((a, b)),
            other => Err(shape_mismatch("two samples", other)),
        }
    }

    pub(crate) fn groups(&self) -> Result<&[Sample]> {
        match self {
            Operands::Groups(g) => Ok(g),
            other => Err(shape_mismatch("sample groups", other)),
        }
    }
}

fn shape_mismatch(expected: &str, got: &Operands) -> EngineError {
    EngineError::Numeric(format!("expected {expected}, got {got:?}"))
}

/// Degrees of freedom reported with a statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DegreesOfFreedom {
    Single(f64),
    Pair { numerator: f64, denominator: f64 },
}

impl fmt::Display for DegreesOfFreedom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegreesOfFreedom::Single(df) => write!(f, "{}", trim_float(*df)),
            DegreesOfFreedom::Pair {
                numerator,
                denominator,
            } => write!(f, "({}, {})", trim_float(*numerator), trim_float(*denominator)),
        }
    }
}

fn trim_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

/// Output of a compute step, before the decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistic {
    pub value: f64,
    pub df: Option<DegreesOfFreedom>,
    pub p_value: f64,
}

/// Reject alpha outside the open interval (0, 1)
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha.is_finite() && alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidSignificanceLevel(alpha))
    }
}

/// Run one hypothesis test against a dataset
///
/// # Example
/// ```
/// use statdesk::dataset::Dataset;
/// use statdesk::hypothesis::{run_test, Decision, Procedure, TestRequest};
///
/// let data = Dataset::manual_template();
/// let request = TestRequest::new(Procedure::TwoSampleT, &["A", "B"], 0.05);
/// let result = run_test(&data, &request).unwrap();
/// assert_eq!(result.decision, Decision::Reject);
/// ```
pub fn run_test(dataset: &Dataset, request: &TestRequest) -> Result<TestResult> {
    validate_alpha(request.alpha)?;
    let spec = procedure_spec(request.procedure)?;

    tracing::debug!(
        procedure = spec.procedure.id(),
        columns = ?request.columns,
        alpha = request.alpha,
        "dispatching hypothesis test"
    );

    let operands = (spec.check)(dataset, request).inspect_err(|e| {
        tracing::warn!(procedure = spec.procedure.id(), error = %e, "request rejected");
    })?;
    let statistic = (spec.compute)(&operands, &request.params)?;

    Ok(TestResult::new(spec.procedure, statistic, request.alpha))
}

#[cfg(test)]
mod tests;
