// Normality test selection
//
// Five methods behind one entry point. Every method works on a column with
// missing values already dropped and reports whether the data looks normal
// against a fixed 0.05 threshold (not the hypothesis-test alpha).

mod anderson_darling;
mod dagostino;
mod kolmogorov_smirnov;
mod shapiro_wilk;

pub use anderson_darling::{anderson_darling, AD_LEVELS};
pub use dagostino::dagostino_k2;
pub use kolmogorov_smirnov::{kolmogorov_cdf, kolmogorov_smirnov};
pub use shapiro_wilk::shapiro_wilk;

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// p-value above which a sample is called normal
pub const NORMALITY_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalityMethod {
    ShapiroWilk,
    RyanJoiner,
    KolmogorovSmirnov,
    AndersonDarling,
    #[serde(rename = "dagostino")]
    DAgostino,
}

impl NormalityMethod {
    pub const ALL: [NormalityMethod; 5] = [
        NormalityMethod::ShapiroWilk,
        NormalityMethod::RyanJoiner,
        NormalityMethod::KolmogorovSmirnov,
        NormalityMethod::AndersonDarling,
        NormalityMethod::DAgostino,
    ];

    pub fn id(self) -> &'static str {
        match self {
            NormalityMethod::ShapiroWilk => "shapiro-wilk",
            NormalityMethod::RyanJoiner => "ryan-joiner",
            NormalityMethod::KolmogorovSmirnov => "kolmogorov-smirnov",
            NormalityMethod::AndersonDarling => "anderson-darling",
            NormalityMethod::DAgostino => "dagostino",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NormalityMethod::ShapiroWilk => "Shapiro-Wilk",
            NormalityMethod::RyanJoiner => "Ryan-Joiner",
            NormalityMethod::KolmogorovSmirnov => "Kolmogorov-Smirnov",
            NormalityMethod::AndersonDarling => "Anderson-Darling",
            NormalityMethod::DAgostino => "D'Agostino K²",
        }
    }
}

impl fmt::Display for NormalityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NormalityMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        NormalityMethod::ALL
            .into_iter()
            .find(|m| m.id() == wanted)
            .ok_or_else(|| EngineError::UnknownMethod(s.to_string()))
    }
}

/// Critical value of the Anderson-Darling statistic at a significance level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValue {
    /// Significance level in percent
    pub level: f64,
    pub value: f64,
}

/// Statistic plus either a p-value or a critical-value table
#[derive(Debug, Clone, PartialEq)]
pub struct NormalityStatistic {
    pub value: f64,
    pub p_value: Option<f64>,
    pub critical_values: Vec<CriticalValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalityResult {
    pub method: NormalityMethod,
    pub column: String,
    pub n: usize,
    pub statistic: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub critical_values: Vec<CriticalValue>,
    pub is_normal: bool,
    /// Set when the method is computed through a stand-in
    pub approximation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NormalityResult {
    pub fn to_report_string(&self) -> String {
        let mut report = format!(
            "{} normality test on '{}' (n = {})\n",
            self.method, self.column, self.n
        );
        report.push_str(&format!("  statistic: {:.4}\n", self.statistic));
        if let Some(p) = self.p_value {
            report.push_str(&format!("  p-value: {p:.4}\n"));
        }
        for cv in &self.critical_values {
            report.push_str(&format!("  critical value at {}%: {:.3}\n", cv.level, cv.value));
        }
        if let Some(note) = &self.note {
            report.push_str(&format!("  note: {note}\n"));
        }
        report.push_str(if self.is_normal {
            "  verdict: data looks normally distributed\n"
        } else {
            "  verdict: data does not look normally distributed\n"
        });
        report
    }
}

pub(crate) fn require_len(
    method: NormalityMethod,
    column: &str,
    values: &[f64],
    min: usize,
) -> Result<()> {
    if values.len() < min {
        return Err(EngineError::InsufficientData {
            context: format!("{} on column '{column}'", method.label()),
            required: min,
            actual: values.len(),
        });
    }
    Ok(())
}

/// Run a normality test on a column's present values
pub fn run_normality_test(
    method: NormalityMethod,
    column: &str,
    values: &[f64],
) -> Result<NormalityResult> {
    if values.is_empty() {
        return Err(EngineError::EmptyColumn(column.to_string()));
    }
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.len() > 1 && lo == hi {
        return Err(EngineError::ConstantData(column.to_string(), method.label()));
    }

    tracing::debug!(method = method.id(), column, n = values.len(), "normality test");

    let statistic = match method {
        NormalityMethod::ShapiroWilk | NormalityMethod::RyanJoiner => {
            shapiro_wilk(method, column, values)?
        }
        NormalityMethod::KolmogorovSmirnov => kolmogorov_smirnov(column, values)?,
        NormalityMethod::AndersonDarling => anderson_darling(column, values)?,
        NormalityMethod::DAgostino => dagostino_k2(column, values)?,
    };

    let is_normal = match statistic.p_value {
        Some(p) => p > NORMALITY_THRESHOLD,
        None => statistic
            .critical_values
            .iter()
            .all(|cv| statistic.value < cv.value),
    };

    let (approximation, note) = if method == NormalityMethod::RyanJoiner {
        (
            true,
            Some("Ryan-Joiner is approximated by the Shapiro-Wilk W statistic".to_string()),
        )
    } else {
        (false, None)
    };

    Ok(NormalityResult {
        method,
        column: column.to_string(),
        n: values.len(),
        statistic: statistic.value,
        p_value: statistic.p_value,
        critical_values: statistic.critical_values,
        is_normal,
        approximation,
        note,
    })
}
