// Shapiro-Wilk W (Royston 1995, algorithm AS R94)
//
// Coefficients from Blom scores with Royston's polynomial corrections for
// the two extreme weights; p-value from Royston's normalizing transform of
// log(1 - W). Valid for 3 <= n <= 5000.

use super::{require_len, NormalityMethod, NormalityStatistic};
use crate::error::{EngineError, Result};
use crate::numeric::{normal_cdf, normal_ppf, sample_variance, sorted};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const MIN_N: usize = 3;
const MAX_N: usize = 5000;

const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
const G: [f64; 2] = [-2.273, 0.459];

/// c[0] + c[1]·x + c[2]·x² + …
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// W statistic and p-value. Ryan-Joiner requests are answered with the
/// same computation.
pub fn shapiro_wilk(
    method: NormalityMethod,
    column: &str,
    values: &[f64],
) -> Result<NormalityStatistic> {
    require_len(method, column, values, MIN_N)?;
    if values.len() > MAX_N {
        return Err(EngineError::InvalidParameter {
            name: "n",
            value: values.len().to_string(),
            constraint: "Shapiro-Wilk supports at most 5000 observations",
        });
    }

    let x = sorted(values);
    let (w, p) = if x.len() == 3 {
        w_three(&x)
    } else {
        let a = coefficients(x.len())?;
        let w = w_statistic(&x, &a);
        (w, p_value(w, x.len()))
    };

    Ok(NormalityStatistic {
        value: w,
        p_value: Some(p.clamp(0.0, 1.0)),
        critical_values: Vec::new(),
    })
}

/// Exact distribution for three observations
fn w_three(x: &[f64]) -> (f64, f64) {
    let ss = 2.0 * sample_variance(x);
    let w = ((FRAC_1_SQRT_2 * (x[2] - x[0])).powi(2) / ss).clamp(0.75, 1.0);
    let p = 1.0 - (6.0 / PI) * w.sqrt().acos();
    (w, p)
}

/// Lower-half weights a[0..n/2], a[0] largest
fn coefficients(n: usize) -> Result<Vec<f64>> {
    let half = n / 2;
    let nf = n as f64;
    let m: Vec<f64> = (0..half)
        .map(|i| normal_ppf((i as f64 + 1.0 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let mut a = vec![0.0; half];
    a[0] = poly(&C1, rsn) - m[0] / ssumm2;

    // n <= 5 corrects one extreme weight, larger samples two
    let corrected = if n <= 5 { 1 } else { 2 };
    if corrected == 2 {
        a[1] = -m[1] / ssumm2 + poly(&C2, rsn);
    }
    let fac_sq = summ2 - 2.0 * m[..corrected].iter().map(|v| v * v).sum::<f64>();
    let rest = 1.0 - 2.0 * a[..corrected].iter().map(|v| v * v).sum::<f64>();
    if fac_sq <= 0.0 || rest <= 0.0 {
        return Err(EngineError::Numeric(format!(
            "Shapiro-Wilk coefficients undefined for n = {n}"
        )));
    }
    let fac = (fac_sq / rest).sqrt();
    for (ai, mi) in a.iter_mut().zip(&m).skip(corrected) {
        *ai = -mi / fac;
    }
    Ok(a)
}

fn w_statistic(x: &[f64], a: &[f64]) -> f64 {
    let n = x.len();
    let numerator: f64 = a
        .iter()
        .enumerate()
        .map(|(i, ai)| ai * (x[n - 1 - i] - x[i]))
        .sum();
    let ss = (n - 1) as f64 * sample_variance(x);
    (numerator.powi(2) / ss).min(1.0)
}

fn p_value(w: f64, n: usize) -> f64 {
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return 1.0;
    }
    let y = w1.ln();
    let nf = n as f64;

    let z = if n <= 11 {
        let gamma = poly(&G, nf);
        if y >= gamma {
            return 0.0;
        }
        let y2 = -(gamma - y).ln();
        (y2 - poly(&C3, nf)) / poly(&C4, nf).exp()
    } else {
        let ln_n = nf.ln();
        (y - poly(&C5, ln_n)) / poly(&C6, ln_n).exp()
    };
    1.0 - normal_cdf(z)
}
