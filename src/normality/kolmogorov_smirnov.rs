// One-sample Kolmogorov-Smirnov against N(mean, s)
//
// The reference normal uses the sample's own mean and ddof-1 standard
// deviation. The p-value comes from the Marsaglia-Tsang-Wang (2003)
// evaluation of the exact Kolmogorov distribution; above EXACT_MAX_N the
// matrix power gets too large and the limiting distribution with
// Stephens' small-sample adjustment is used instead.

use super::{require_len, NormalityMethod, NormalityStatistic};
use crate::error::Result;
use crate::numeric::{mean, normal_cdf, sample_std, sorted};

const MIN_N: usize = 2;
const EXACT_MAX_N: usize = 1000;

/// Rescaling step for the matrix power, as in the published algorithm
const SCALE: f64 = 1e140;
const SCALE_EXP: i32 = 140;

pub fn kolmogorov_smirnov(column: &str, values: &[f64]) -> Result<NormalityStatistic> {
    require_len(NormalityMethod::KolmogorovSmirnov, column, values, MIN_N)?;

    let x = sorted(values);
    let n = x.len();
    let nf = n as f64;
    let m = mean(&x);
    let s = sample_std(&x);

    let d = x
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let cdf = normal_cdf((v - m) / s);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0_f64, f64::max);

    let p = (1.0 - kolmogorov_cdf(n, d)).clamp(0.0, 1.0);
    Ok(NormalityStatistic {
        value: d,
        p_value: Some(p),
        critical_values: Vec::new(),
    })
}

/// P(D_n < d) for the two-sided Kolmogorov statistic
pub fn kolmogorov_cdf(n: usize, d: f64) -> f64 {
    if d <= 0.0 {
        return 0.0;
    }
    if d >= 1.0 {
        return 1.0;
    }
    let nf = n as f64;
    let s = d * d * nf;
    // Published shortcut for the far right tail
    if s > 7.24 || (s > 3.76 && n > 99) {
        return 1.0 - 2.0 * (-(2.000071 + 0.331 / nf.sqrt() + 1.409 / nf) * s).exp();
    }
    if n > EXACT_MAX_N {
        return limiting_cdf(n, d);
    }
    exact_cdf(n, d)
}

fn limiting_cdf(n: usize, d: f64) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    let mut tail = 0.0;
    let mut sign = 1.0;
    for j in 1..=100 {
        let term = (-2.0 * (j * j) as f64 * lambda * lambda).exp();
        tail += sign * term;
        if term < 1e-16 {
            break;
        }
        sign = -sign;
    }
    (1.0 - 2.0 * tail).clamp(0.0, 1.0)
}

type Matrix = Vec<Vec<f64>>;

fn exact_cdf(n: usize, d: f64) -> f64 {
    let nf = n as f64;
    let k = (nf * d) as usize + 1;
    let m = 2 * k - 1;
    let h = k as f64 - nf * d;

    let mut hm: Matrix = (0..m)
        .map(|i| (0..m).map(|j| if i + 1 >= j { 1.0 } else { 0.0 }).collect())
        .collect();
    for i in 0..m {
        hm[i][0] -= h.powi(i as i32 + 1);
        hm[m - 1][i] -= h.powi((m - i) as i32);
    }
    if 2.0 * h - 1.0 > 0.0 {
        hm[m - 1][0] += (2.0 * h - 1.0).powi(m as i32);
    }
    for (i, row) in hm.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            if i + 1 > j {
                for g in 1..=(i + 1 - j) {
                    *cell /= g as f64;
                }
            }
        }
    }

    let (q, mut exponent) = matrix_power(&hm, 0, n);
    let mut s = q[k - 1][k - 1];
    for i in 1..=n {
        s = s * i as f64 / nf;
        if s < 1.0 / SCALE {
            s *= SCALE;
            exponent -= SCALE_EXP;
        }
    }
    (s * 10f64.powi(exponent)).clamp(0.0, 1.0)
}

fn matrix_multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let m = a.len();
    let mut out = vec![vec![0.0; m]; m];
    for (i, row) in a.iter().enumerate() {
        for (l, &ail) in row.iter().enumerate() {
            if ail == 0.0 {
                continue;
            }
            for (j, bj) in b[l].iter().enumerate() {
                out[i][j] += ail * bj;
            }
        }
    }
    out
}

/// A^n with a running power-of-ten exponent to avoid overflow
fn matrix_power(a: &Matrix, exp_a: i32, n: usize) -> (Matrix, i32) {
    if n == 1 {
        return (a.clone(), exp_a);
    }
    let (half, exp_half) = matrix_power(a, exp_a, n / 2);
    let mut b = matrix_multiply(&half, &half);
    let mut exp_b = 2 * exp_half;
    if n % 2 == 1 {
        b = matrix_multiply(a, &b);
        exp_b += exp_a;
    }
    let centre = a.len() / 2;
    if b[centre][centre] > SCALE {
        for row in &mut b {
            for cell in row.iter_mut() {
                *cell /= SCALE;
            }
        }
        exp_b += SCALE_EXP;
    }
    (b, exp_b)
}
