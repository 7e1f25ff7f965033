//! statdesk - statistical test dispatch and decision engine
//!
//! Loads tabular data (CSV or manual entry), then computes descriptive
//! statistics, chart series, normality tests, hypothesis tests and column
//! transformations. Every hypothesis test goes through one dispatch table
//! and one decision rule (`p < α` rejects). Plots and analyses are gated by
//! administrator-controlled feature flags.

pub mod accounts;
pub mod charts;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod descriptive;
pub mod error;
pub mod features;
pub mod hypothesis;
pub mod ingest;
pub mod normality;
pub mod numeric;
pub mod report;
pub mod store;
pub mod transform;
