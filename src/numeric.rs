//! Numeric primitives shared by every test and transform
//!
//! Moments and distribution tails come from `statrs`; ranks, percentiles
//! and the bounded minimizer are slice arithmetic in f64.

use crate::error::{EngineError, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::statistics::Statistics;

/// Arithmetic mean. Caller guarantees a non-empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.mean()
}

/// Sample variance (ddof = 1). Returns 0.0 for fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.variance()
}

/// Sample standard deviation (ddof = 1)
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.std_dev()
}

/// Population variance (ddof = 0)
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.population_variance()
}

/// Sorted copy of the data (NaN-free input assumed)
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Linear-interpolation percentile (R-7) over sorted data, `q` in [0, 1].
///
/// statrs' `OrderStatistics::quantile` is R-8; summaries and boxplots
/// report the R-7 quartiles.
pub fn percentile(sorted_data: &[f64], q: f64) -> f64 {
    if sorted_data.is_empty() {
        return f64::NAN;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = q.clamp(0.0, 1.0) * (sorted_data.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Pearson correlation coefficient. `None` when either side is constant
/// or fewer than two pairs exist.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (sx, sy) = (x.std_dev(), y.std_dev());
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    Some((x.covariance(y) / (sx * sy)).clamp(-1.0, 1.0))
}

/// Average ranks (1-based) of the values, ties sharing the mean rank.
///
/// Also returns Σ t(t² − 1) over tie groups, used by the rank-test
/// variance corrections.
pub fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j are tied; average rank = (i+1 + j) / 2
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg_rank;
        }
        let t = (j - i) as f64;
        if t > 1.0 {
            tie_term += t * (t * t - 1.0);
        }
        i = j;
    }
    (ranks, tie_term)
}

fn standard_normal() -> Normal {
    Normal::standard()
}

/// Standard normal CDF Φ(z)
pub fn normal_cdf(z: f64) -> f64 {
    standard_normal().cdf(z)
}

/// Standard normal quantile Φ⁻¹(p)
pub fn normal_ppf(p: f64) -> f64 {
    standard_normal().inverse_cdf(p)
}

/// Two-sided normal p-value `2·(1 − Φ(|z|))`
pub fn two_sided_normal_p(z: f64) -> f64 {
    (2.0 * (1.0 - normal_cdf(z.abs()))).clamp(0.0, 1.0)
}

/// Two-sided Student t p-value for statistic `t` on `df` degrees of freedom
pub fn two_sided_t_p(t: f64, df: f64) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| EngineError::Numeric(format!("t distribution (df={df}): {e}")))?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// CDF of the F distribution with (`dfn`, `dfd`) degrees of freedom
pub fn f_cdf(f: f64, dfn: f64, dfd: f64) -> Result<f64> {
    let dist = FisherSnedecor::new(dfn, dfd)
        .map_err(|e| EngineError::Numeric(format!("F distribution ({dfn}, {dfd}): {e}")))?;
    Ok(dist.cdf(f))
}

/// Upper tail of the F distribution
pub fn f_sf(f: f64, dfn: f64, dfd: f64) -> Result<f64> {
    let dist = FisherSnedecor::new(dfn, dfd)
        .map_err(|e| EngineError::Numeric(format!("F distribution ({dfn}, {dfd}): {e}")))?;
    Ok(dist.sf(f))
}

/// Upper tail of the chi-square distribution
pub fn chi2_sf(x: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df)
        .map_err(|e| EngineError::Numeric(format!("chi-square distribution (df={df}): {e}")))?;
    Ok(dist.sf(x))
}

/// Brent's bounded scalar minimizer (golden section with parabolic steps)
/// over `[lower, upper]`. Returns the abscissa of the minimum.
pub fn minimize_bounded<F>(f: F, lower: f64, upper: f64, xtol: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    const MAX_ITER: usize = 500;
    let golden = 0.5 * (3.0 - 5f64.sqrt());
    let sqrt_eps = f64::EPSILON.sqrt();
    let step_sign = |v: f64| if v < 0.0 { -1.0 } else { 1.0 };

    let (mut a, mut b) = (lower, upper);
    let mut fulc = a + golden * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat: f64 = 0.0;
    let mut e: f64 = 0.0;
    let mut fx = f(xf);
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + xtol / 3.0;
    let mut tol2 = 2.0 * tol1;

    for _ in 0..MAX_ITER {
        if (xf - xm).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        let mut golden_step = true;
        if e.abs() > tol1 {
            let r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            let previous = e;
            e = rat;

            if p.abs() < (0.5 * q * previous).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                golden_step = false;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * step_sign(xm - xf);
                }
            }
        }
        if golden_step {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden * e;
        }

        let x = xf + step_sign(rat) * rat.abs().max(tol1);
        let fu = f(x);

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + xtol / 3.0;
        tol2 = 2.0 * tol1;
    }
    xf
}
