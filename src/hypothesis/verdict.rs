// Decision rule and test result
//
// The only place a p-value is compared against alpha.

use super::{DegreesOfFreedom, Procedure, Statistic};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing a p-value against the significance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// p < alpha
    Reject,
    /// p >= alpha
    FailToReject,
}

impl Decision {
    /// Strict rule: reject only when `p < alpha`
    ///
    /// # Example
    /// ```
    /// use statdesk::hypothesis::Decision;
    ///
    /// assert_eq!(Decision::from_p_value(0.049, 0.05), Decision::Reject);
    /// assert_eq!(Decision::from_p_value(0.05, 0.05), Decision::FailToReject);
    /// ```
    pub fn from_p_value(p_value: f64, alpha: f64) -> Self {
        if p_value < alpha {
            Decision::Reject
        } else {
            Decision::FailToReject
        }
    }

    pub fn is_reject(self) -> bool {
        self == Decision::Reject
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Decision::Reject => "reject null hypothesis",
            Decision::FailToReject => "fail to reject null hypothesis",
        })
    }
}

/// Final result of a hypothesis test. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub procedure: Procedure,
    pub statistic: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub df: Option<DegreesOfFreedom>,
    pub p_value: f64,
    pub alpha: f64,
    pub decision: Decision,
}

impl TestResult {
    pub fn new(procedure: Procedure, statistic: Statistic, alpha: f64) -> Self {
        Self {
            procedure,
            statistic: statistic.value,
            df: statistic.df,
            p_value: statistic.p_value,
            alpha,
            decision: Decision::from_p_value(statistic.p_value, alpha),
        }
    }

    /// Human-readable report
    pub fn to_report_string(&self) -> String {
        let mut report = format!("{}\n", self.procedure.label());
        report.push_str(&format!("  statistic: {:.4}\n", self.statistic));
        if let Some(df) = &self.df {
            report.push_str(&format!("  df: {df}\n"));
        }
        report.push_str(&format!("  p-value: {:.4}\n", self.p_value));
        report.push_str(&format!(
            "  alpha: {} ({:.1}% confidence)\n",
            self.alpha,
            (1.0 - self.alpha) * 100.0
        ));
        report.push_str(&format!("  decision: {}\n", self.decision));
        report
    }
}
