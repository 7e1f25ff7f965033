//! Rendering boundary: every result prints as text or JSON

use crate::accounts::{Account, Status};
use crate::charts::Chart;
use crate::descriptive::{summary_report, ColumnSummary, CorrelationMatrix};
use crate::error::Result;
use crate::features::{Feature, FeatureGate};
use crate::hypothesis::{TestResult, PROCEDURES};
use crate::normality::NormalityResult;
use crate::transform::TransformedSeries;
use clap::ValueEnum;
use serde::Serialize;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON for machine parsing
    Json,
}

/// A result that knows its text layout; JSON comes from `Serialize`
pub trait Report: Serialize {
    fn to_text(&self) -> String;
}

/// Render a result in the requested format
pub fn render<R: Report + ?Sized>(
    report: &R,
    format: OutputFormat,
) -> std::result::Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => serde_json::to_string_pretty(report),
    }
}

impl Report for TestResult {
    fn to_text(&self) -> String {
        self.to_report_string()
    }
}

impl Report for NormalityResult {
    fn to_text(&self) -> String {
        self.to_report_string()
    }
}

impl Report for TransformedSeries {
    fn to_text(&self) -> String {
        self.to_report_string()
    }
}

impl Report for Chart {
    fn to_text(&self) -> String {
        self.to_report_string()
    }
}

impl Report for CorrelationMatrix {
    fn to_text(&self) -> String {
        self.to_report_string()
    }
}

impl Report for Vec<ColumnSummary> {
    fn to_text(&self) -> String {
        summary_report(self)
    }
}

/// One row of the procedure catalog
#[derive(Debug, Clone, Serialize)]
pub struct ProcedureEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub inputs: &'static str,
}

/// The dispatch table, listed for the caller. Hidden entirely while
/// hypothesis testing is disabled.
pub fn procedure_catalog(gate: &FeatureGate<'_>) -> Result<Vec<ProcedureEntry>> {
    gate.require(Feature::HypothesisTest)?;
    Ok(PROCEDURES
        .iter()
        .map(|spec| ProcedureEntry {
            id: spec.procedure.id(),
            label: spec.procedure.label(),
            inputs: spec.inputs,
        })
        .collect())
}

impl Report for Vec<ProcedureEntry> {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in self {
            out.push_str(&format!("{:<18} {:<28} {}\n", entry.id, entry.label, entry.inputs));
        }
        out
    }
}

/// Effective state of one feature flag
#[derive(Debug, Clone, Serialize)]
pub struct FeatureState {
    pub feature: Feature,
    pub name: &'static str,
    pub enabled: bool,
}

impl Report for Vec<FeatureState> {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for state in self {
            let mark = if state.enabled { "enabled" } else { "disabled" };
            out.push_str(&format!("{:<20} {}\n", state.name, mark));
        }
        out
    }
}

/// What a non-admin user may pick right now
#[derive(Debug, Clone, Serialize)]
pub struct OfferedMenu {
    pub plots: Vec<&'static str>,
    pub analyses: Vec<&'static str>,
    pub help: bool,
}

impl OfferedMenu {
    pub fn from_gate(gate: &FeatureGate<'_>) -> Self {
        Self {
            plots: gate.offered_plots().into_iter().map(Feature::name).collect(),
            analyses: gate.offered_analyses().into_iter().map(Feature::name).collect(),
            help: gate.shows_help(),
        }
    }
}

impl Report for OfferedMenu {
    fn to_text(&self) -> String {
        let list = |names: &[&str]| {
            if names.is_empty() {
                "(none)".to_string()
            } else {
                names.join(", ")
            }
        };
        format!(
            "plots:    {}\nanalyses: {}\nhelp:     {}\n",
            list(&self.plots),
            list(&self.analyses),
            if self.help { "shown" } else { "hidden" }
        )
    }
}

/// Account listing without credentials
#[derive(Debug, Clone, Serialize)]
pub struct AccountEntry {
    pub id: String,
    pub role: String,
    pub status: String,
}

impl From<&Account> for AccountEntry {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            role: account.role.to_string(),
            status: match account.status {
                Status::Pending => "pending",
                Status::Approved => "approved",
            }
            .to_string(),
        }
    }
}

impl Report for Vec<AccountEntry> {
    fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in self {
            out.push_str(&format!("{:<20} {:<6} {}\n", entry.id, entry.role, entry.status));
        }
        out
    }
}
