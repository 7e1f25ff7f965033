// Procedure table: precondition check + compute step per procedure
//
// The table doubles as the catalog listed to callers, so its order is the
// display order.

use super::parametric;
use super::rank;
use super::{Operands, Procedure, Sample, Statistic, TestParams, TestRequest};
use crate::dataset::Dataset;
use crate::error::{EngineError, Result};
use std::collections::HashSet;

pub type CheckFn = fn(&Dataset, &TestRequest) -> Result<Operands>;
pub type ComputeFn = fn(&Operands, &TestParams) -> Result<Statistic>;

/// One row of the dispatch table
pub struct ProcedureSpec {
    pub procedure: Procedure,
    /// Column selection the procedure expects, for listings
    pub inputs: &'static str,
    pub check: CheckFn,
    pub compute: ComputeFn,
}

pub static PROCEDURES: &[ProcedureSpec] = &[
    ProcedureSpec {
        procedure: Procedure::OneSampleT,
        inputs: "1 numeric column, mu0",
        check: check_one_sample_t,
        compute: parametric::one_sample_t,
    },
    ProcedureSpec {
        procedure: Procedure::TwoSampleT,
        inputs: "2 numeric columns",
        check: check_two_sample_t,
        compute: parametric::welch_t,
    },
    ProcedureSpec {
        procedure: Procedure::PairedT,
        inputs: "2 numeric columns of equal length",
        check: check_paired,
        compute: parametric::paired_t,
    },
    ProcedureSpec {
        procedure: Procedure::OneSampleZ,
        inputs: "1 numeric column, mu0, sigma",
        check: check_one_sample_z,
        compute: parametric::one_sample_z,
    },
    ProcedureSpec {
        procedure: Procedure::OneProportionZ,
        inputs: "x, n, p0",
        check: check_one_proportion,
        compute: parametric::one_proportion_z,
    },
    ProcedureSpec {
        procedure: Procedure::TwoProportionZ,
        inputs: "x1, n1, x2, n2",
        check: check_two_proportion,
        compute: parametric::two_proportion_z,
    },
    ProcedureSpec {
        procedure: Procedure::FTest,
        inputs: "2 numeric columns",
        check: check_f_test,
        compute: parametric::f_test,
    },
    ProcedureSpec {
        procedure: Procedure::Anova,
        inputs: "2 or more numeric columns",
        check: check_anova,
        compute: parametric::one_way_anova,
    },
    ProcedureSpec {
        procedure: Procedure::MannWhitney,
        inputs: "2 numeric columns",
        check: check_mann_whitney,
        compute: rank::mann_whitney_u,
    },
    ProcedureSpec {
        procedure: Procedure::Wilcoxon,
        inputs: "2 numeric columns of equal length",
        check: check_paired,
        compute: rank::wilcoxon_signed_rank,
    },
];

/// Table entry for a procedure
pub fn procedure_spec(procedure: Procedure) -> Result<&'static ProcedureSpec> {
    PROCEDURES
        .iter()
        .find(|spec| spec.procedure == procedure)
        .ok_or_else(|| EngineError::UnknownProcedure(procedure.id().to_string()))
}

/// Resolve the request's column selection into samples.
///
/// `arity` is the exact number of columns, or `None` for "at least two".
fn select_columns(
    dataset: &Dataset,
    request: &TestRequest,
    arity: Option<usize>,
) -> Result<Vec<Sample>> {
    let label = request.procedure.label();
    let columns = &request.columns;
    let required = arity.unwrap_or(2);

    if columns.len() < required {
        return Err(EngineError::InsufficientColumns {
            procedure: label,
            required,
            actual: columns.len(),
        });
    }
    if let Some(exact) = arity {
        if columns.len() > exact {
            return Err(EngineError::InvalidParameter {
                name: "columns",
                value: columns.join(", "),
                constraint: if exact == 1 {
                    "select exactly one column"
                } else {
                    "select exactly two columns"
                },
            });
        }
    }

    let mut seen = HashSet::new();
    for name in columns {
        if !seen.insert(name.as_str()) {
            return Err(EngineError::DuplicateColumn(name.clone()));
        }
    }

    columns
        .iter()
        .map(|name| {
            let values = dataset.numeric_values(name)?;
            if values.is_empty() {
                return Err(EngineError::EmptyColumn(name.clone()));
            }
            Ok(Sample {
                column: name.clone(),
                values,
            })
        })
        .collect()
}

fn require_observations(sample: &Sample, procedure: Procedure, required: usize) -> Result<()> {
    if sample.values.len() < required {
        return Err(EngineError::InsufficientData {
            context: format!("{} on column '{}'", procedure.label(), sample.column),
            required,
            actual: sample.values.len(),
        });
    }
    Ok(())
}

fn take_one(mut samples: Vec<Sample>) -> Result<Sample> {
    samples
        .pop()
        .ok_or(EngineError::MissingParameter("columns"))
}

fn take_two(samples: Vec<Sample>) -> Result<(Sample, Sample)> {
    let mut it = samples.into_iter();
    match (it.next(), it.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(EngineError::MissingParameter("columns")),
    }
}

fn check_one_sample_t(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    TestParams::require_f64(request.params.mu0, "mu0")?;
    let sample = take_one(select_columns(dataset, request, Some(1))?)?;
    require_observations(&sample, request.procedure, 2)?;
    Ok(Operands::One(sample))
}

fn check_two_sample_t(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let (a, b) = take_two(select_columns(dataset, request, Some(2))?)?;
    require_observations(&a, request.procedure, 2)?;
    require_observations(&b, request.procedure, 2)?;
    Ok(Operands::Two(a, b))
}

/// Paired procedures drop missing values per column, then insist the two
/// columns still line up
fn check_paired(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let (a, b) = take_two(select_columns(dataset, request, Some(2))?)?;
    if a.values.len() != b.values.len() {
        return Err(EngineError::LengthMismatch {
            left: a.values.len(),
            right: b.values.len(),
        });
    }
    if request.procedure == Procedure::PairedT {
        require_observations(&a, request.procedure, 2)?;
    }
    Ok(Operands::Two(a, b))
}

fn check_one_sample_z(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    TestParams::require_f64(request.params.mu0, "mu0")?;
    let sigma = TestParams::require_f64(request.params.sigma, "sigma")?;
    if sigma <= 0.0 {
        return Err(EngineError::InvalidParameter {
            name: "sigma",
            value: sigma.to_string(),
            constraint: "population standard deviation must be > 0",
        });
    }
    let sample = take_one(select_columns(dataset, request, Some(1))?)?;
    Ok(Operands::One(sample))
}

fn check_proportion(x: u64, n: u64, x_name: &'static str, n_name: &'static str) -> Result<()> {
    if n == 0 {
        return Err(EngineError::InvalidParameter {
            name: n_name,
            value: n.to_string(),
            constraint: "number of trials must be at least 1",
        });
    }
    if x > n {
        return Err(EngineError::InvalidParameter {
            name: x_name,
            value: x.to_string(),
            constraint: "successes cannot exceed the number of trials",
        });
    }
    Ok(())
}

fn check_one_proportion(_dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let params = &request.params;
    let x = TestParams::require_count(params.x, "x")?;
    let n = TestParams::require_count(params.n, "n")?;
    let p0 = TestParams::require_f64(params.p0, "p0")?;
    check_proportion(x, n, "x", "n")?;
    if p0 <= 0.0 || p0 >= 1.0 {
        return Err(EngineError::InvalidParameter {
            name: "p0",
            value: p0.to_string(),
            constraint: "hypothesized proportion must lie strictly between 0 and 1",
        });
    }
    Ok(Operands::Counts)
}

fn check_two_proportion(_dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let params = &request.params;
    let x1 = TestParams::require_count(params.x1, "x1")?;
    let n1 = TestParams::require_count(params.n1, "n1")?;
    let x2 = TestParams::require_count(params.x2, "x2")?;
    let n2 = TestParams::require_count(params.n2, "n2")?;
    check_proportion(x1, n1, "x1", "n1")?;
    check_proportion(x2, n2, "x2", "n2")?;

    // x <= n on each side, so the trial sum bounds the success sum
    let trials = n1.checked_add(n2).ok_or_else(|| EngineError::InvalidParameter {
        name: "n1 + n2",
        value: format!("{n1} + {n2}"),
        constraint: "combined number of trials is too large",
    })?;
    let successes = x1 + x2;
    if successes == 0 || successes == trials {
        return Err(EngineError::InvalidParameter {
            name: "pooled proportion",
            value: format!("{successes}/{trials}"),
            constraint: "pooled proportion must lie strictly between 0 and 1",
        });
    }
    Ok(Operands::Counts)
}

fn check_f_test(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let (a, b) = take_two(select_columns(dataset, request, Some(2))?)?;
    require_observations(&a, request.procedure, 2)?;
    require_observations(&b, request.procedure, 2)?;
    Ok(Operands::Two(a, b))
}

fn check_anova(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let groups = select_columns(dataset, request, None)?;
    let total: usize = groups.iter().map(|g| g.values.len()).sum();
    let k = groups.len();
    if total < k + 1 {
        return Err(EngineError::InsufficientData {
            context: format!("{} across {k} groups", request.procedure.label()),
            required: k + 1,
            actual: total,
        });
    }
    Ok(Operands::Groups(groups))
}

fn check_mann_whitney(dataset: &Dataset, request: &TestRequest) -> Result<Operands> {
    let (a, b) = take_two(select_columns(dataset, request, Some(2))?)?;
    Ok(Operands::Two(a, b))
}
