// Anderson-Darling A² against a normal with estimated mean and std
//
// No p-value: the statistic is compared against Stephens' critical values,
// scaled for sample size.

use super::{require_len, CriticalValue, NormalityMethod, NormalityStatistic};
use crate::error::Result;
use crate::numeric::{mean, normal_cdf, sample_std, sorted};

/// Significance levels (percent) of the critical-value table
pub const AD_LEVELS: [f64; 5] = [15.0, 10.0, 5.0, 2.5, 1.0];
const AD_BASE: [f64; 5] = [0.576, 0.656, 0.787, 0.918, 1.092];

// 1 + 4/n - 25/n² is non-positive below four observations
const MIN_N: usize = 4;

// Keeps ln() finite for points far in the tails
const TAIL_CLAMP: f64 = 1e-300;

pub fn anderson_darling(column: &str, values: &[f64]) -> Result<NormalityStatistic> {
    require_len(NormalityMethod::AndersonDarling, column, values, MIN_N)?;

    let x = sorted(values);
    let n = x.len();
    let nf = n as f64;
    let m = mean(&x);
    let s = sample_std(&x);

    let z: Vec<f64> = x.iter().map(|v| (v - m) / s).collect();
    let sum: f64 = (0..n)
        .map(|i| {
            let lower = normal_cdf(z[i]).max(TAIL_CLAMP).ln();
            let upper = normal_cdf(-z[n - 1 - i]).max(TAIL_CLAMP).ln();
            (2 * i + 1) as f64 * (lower + upper)
        })
        .sum();
    let a2 = -nf - sum / nf;

    Ok(NormalityStatistic {
        value: a2,
        p_value: None,
        critical_values: critical_values(n),
    })
}

/// Critical values at [`AD_LEVELS`], rounded to three decimals
pub fn critical_values(n: usize) -> Vec<CriticalValue> {
    let nf = n as f64;
    let scale = 1.0 + 4.0 / nf - 25.0 / (nf * nf);
    AD_LEVELS
        .iter()
        .zip(AD_BASE)
        .map(|(&level, base)| CriticalValue {
            level,
            value: (base / scale * 1000.0).round() / 1000.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistic_linear_five() {
        let r = anderson_darling("x", &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((r.value - 0.143_594).abs() < 1e-5);
    }

    #[test]
    fn test_statistic_with_outlier() {
        let r = anderson_darling("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert!((r.value - 1.464_691).abs() < 1e-5);
        assert!(r.critical_values.iter().all(|cv| r.value > cv.value));
    }

    #[test]
    fn test_critical_values_scaled_and_rounded() {
        let five: Vec<f64> = critical_values(5).iter().map(|cv| cv.value).collect();
        assert_eq!(five, vec![0.72, 0.82, 0.984, 1.148, 1.365]);
        let twenty: Vec<f64> = critical_values(20).iter().map(|cv| cv.value).collect();
        assert_eq!(twenty, vec![0.506, 0.577, 0.692, 0.807, 0.96]);
    }

    #[test]
    fn test_minimum_size() {
        assert!(anderson_darling("x", &[1.0, 2.0, 3.0]).is_err());
    }
}
