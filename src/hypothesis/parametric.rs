// Parametric procedures: t, z, proportion, F and one-way ANOVA

use super::{DegreesOfFreedom, Operands, Sample, Statistic, TestParams};
use crate::error::{EngineError, Result};
use crate::numeric::{
    f_cdf, f_sf, mean, sample_variance, two_sided_normal_p, two_sided_t_p,
};

/// t statistic for `diff / se` with the degenerate cases folded in:
/// zero error and zero difference is t = 0, p = 1; zero error with a
/// difference is an error.
fn t_statistic(diff: f64, se: f64, df: f64, context: &str) -> Result<Statistic> {
    if se == 0.0 {
        if diff == 0.0 {
            tracing::debug!(context, "zero standard error with zero difference, t = 0");
            return Ok(Statistic {
                value: 0.0,
                df: Some(DegreesOfFreedom::Single(df)),
                p_value: 1.0,
            });
        }
        return Err(EngineError::ZeroVariance(context.to_string()));
    }
    let t = diff / se;
    Ok(Statistic {
        value: t,
        df: Some(DegreesOfFreedom::Single(df)),
        p_value: two_sided_t_p(t, df)?,
    })
}

fn one_sample(sample: &Sample, mu0: f64) -> Result<Statistic> {
    let n = sample.values.len() as f64;
    let se = (sample_variance(&sample.values) / n).sqrt();
    let diff = mean(&sample.values) - mu0;
    t_statistic(diff, se, n - 1.0, &format!("column '{}'", sample.column))
}

pub fn one_sample_t(operands: &Operands, params: &TestParams) -> Result<Statistic> {
    let mu0 = TestParams::require_f64(params.mu0, "mu0")?;
    one_sample(operands.one()?, mu0)
}

/// Welch's unequal-variance t-test with Welch–Satterthwaite df
pub fn welch_t(operands: &Operands, _params: &TestParams) -> Result<Statistic> {
    let (a, b) = operands.two()?;
    let n1 = a.values.len() as f64;
    let n2 = b.values.len() as f64;
    let q1 = sample_variance(&a.values) / n1;
    let q2 = sample_variance(&b.values) / n2;

    let se2 = q1 + q2;
    let df = if se2 > 0.0 {
        se2.powi(2) / (q1.powi(2) / (n1 - 1.0) + q2.powi(2) / (n2 - 1.0))
    } else {
        // Both columns constant: the Satterthwaite ratio is 0/0
        n1 + n2 - 2.0
    };
    let diff = mean(&a.values) - mean(&b.values);
    t_statistic(
        diff,
        se2.sqrt(),
        df,
        &format!("columns '{}' and '{}'", a.column, b.column),
    )
}

pub fn paired_t(operands: &Operands, _params: &TestParams) -> Result<Statistic> {
    let (a, b) = operands.two()?;
    let differences = Sample {
        column: format!("{} - {}", a.column, b.column),
        values: a
            .values
            .iter()
            .zip(&b.values)
            .map(|(x, y)| x - y)
            .collect(),
    };
    one_sample(&differences, 0.0)
}

pub fn one_sample_z(operands: &Operands, params: &TestParams) -> Result<Statistic> {
    let sample = operands.one()?;
    let mu0 = TestParams::require_f64(params.mu0, "mu0")?;
    let sigma = TestParams::require_f64(params.sigma, "sigma")?;
    let n = sample.values.len() as f64;
    let z = (mean(&sample.values) - mu0) / (sigma / n.sqrt());
    Ok(Statistic {
        value: z,
        df: None,
        p_value: two_sided_normal_p(z),
    })
}

pub fn one_proportion_z(_operands: &Operands, params: &TestParams) -> Result<Statistic> {
    let x = TestParams::require_count(params.x, "x")? as f64;
    let n = TestParams::require_count(params.n, "n")? as f64;
    let p0 = TestParams::require_f64(params.p0, "p0")?;

    let z = (x / n - p0) / (p0 * (1.0 - p0) / n).sqrt();
    Ok(Statistic {
        value: z,
        df: None,
        p_value: two_sided_normal_p(z),
    })
}

pub fn two_proportion_z(_operands: &Operands, params: &TestParams) -> Result<Statistic> {
    let x1 = TestParams::require_count(params.x1, "x1")? as f64;
    let n1 = TestParams::require_count(params.n1, "n1")? as f64;
    let x2 = TestParams::require_count(params.x2, "x2")? as f64;
    let n2 = TestParams::require_count(params.n2, "n2")? as f64;

    let pooled = (x1 + x2) / (n1 + n2);
    let se = (pooled * (1.0 - pooled) * (1.0 / n1 + 1.0 / n2)).sqrt();
    let z = (x1 / n1 - x2 / n2) / se;
    Ok(Statistic {
        value: z,
        df: None,
        p_value: two_sided_normal_p(z),
    })
}

/// Variance-ratio test, larger variance on top so that F >= 1
pub fn f_test(operands: &Operands, _params: &TestParams) -> Result<Statistic> {
    let (a, b) = operands.two()?;
    let var_a = sample_variance(&a.values);
    let var_b = sample_variance(&b.values);
    for (sample, var) in [(a, var_a), (b, var_b)] {
        if var == 0.0 {
            return Err(EngineError::ZeroVariance(format!("column '{}'", sample.column)));
        }
    }

    let (num, den) = if var_a >= var_b { (a, b) } else { (b, a) };
    let f = var_a.max(var_b) / var_a.min(var_b);
    let dfn = (num.values.len() - 1) as f64;
    let dfd = (den.values.len() - 1) as f64;

    let cdf = f_cdf(f, dfn, dfd)?;
    let p = (2.0 * cdf.min(1.0 - cdf)).clamp(0.0, 1.0);
    tracing::debug!(numerator = %num.column, denominator = %den.column, f, "variance ratio");

    Ok(Statistic {
        value: f,
        df: Some(DegreesOfFreedom::Pair {
            numerator: dfn,
            denominator: dfd,
        }),
        p_value: p,
    })
}

pub fn one_way_anova(operands: &Operands, _params: &TestParams) -> Result<Statistic> {
    let groups = operands.groups()?;
    let k = groups.len() as f64;
    let total: usize = groups.iter().map(|g| g.values.len()).sum();
    let n = total as f64;
    let grand_mean = groups
        .iter()
        .flat_map(|g| g.values.iter())
        .sum::<f64>()
        / n;

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let m = mean(&group.values);
        ss_between += group.values.len() as f64 * (m - grand_mean).powi(2);
        ss_within += group.values.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    }

    let df_between = k - 1.0;
    let df_within = n - k;
    let ms_within = ss_within / df_within;
    if ms_within == 0.0 {
        return Err(EngineError::ZeroVariance("within-group spread".to_string()));
    }
    let f = (ss_between / df_between) / ms_within;

    Ok(Statistic {
        value: f,
        df: Some(DegreesOfFreedom::Pair {
            numerator: df_between,
            denominator: df_within,
        }),
        p_value: f_sf(f, df_between, df_within)?,
    })
}
