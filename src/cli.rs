//! CLI argument parsing for statdesk

use crate::accounts::Role;
use crate::features::Feature;
use crate::hypothesis::{Procedure, TestParams};
use crate::normality::NormalityMethod;
use crate::report::OutputFormat;
use crate::transform::TransformMethod;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "statdesk")]
#[command(version)]
#[command(
    about = "Statistical test dispatch and decision engine for tabular data",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (default: ./statdesk.toml when present)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// State file holding feature flags and accounts (overrides config)
    #[arg(long = "state", value_name = "FILE", global = true)]
    pub state: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the hypothesis test catalog
    Procedures,

    /// Summary statistics for every numeric column
    Describe {
        #[command(flatten)]
        data: DataArgs,

        /// Print the correlation matrix instead of the summary (needs Heatmap)
        #[arg(long = "correlation")]
        correlation: bool,
    },

    /// Run a hypothesis test
    Test {
        /// Procedure id (see `statdesk procedures`)
        procedure: Procedure,

        #[command(flatten)]
        data: DataArgs,

        /// Columns to test, comma-separated
        #[arg(short = 'c', long = "columns", value_delimiter = ',')]
        columns: Vec<String>,

        /// Significance level (overrides config)
        #[arg(long = "alpha", value_name = "ALPHA")]
        alpha: Option<f64>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Run a normality test on one column
    Normality {
        /// shapiro-wilk, ryan-joiner, kolmogorov-smirnov, anderson-darling or dagostino
        method: NormalityMethod,

        #[command(flatten)]
        data: DataArgs,

        #[arg(short = 'c', long = "column")]
        column: String,
    },

    /// Transform one column (result is not written back)
    Transform {
        /// min-max, standardize, log or box-cox
        method: TransformMethod,

        #[command(flatten)]
        data: DataArgs,

        #[arg(short = 'c', long = "column")]
        column: String,
    },

    /// Chart series for the rendering layer
    Chart {
        kind: ChartKind,

        #[command(flatten)]
        data: DataArgs,

        /// Columns to plot, comma-separated
        #[arg(short = 'c', long = "columns", value_delimiter = ',')]
        columns: Vec<String>,

        /// Histogram bins (overrides config)
        #[arg(long = "bins")]
        bins: Option<usize>,

        /// Draw all chosen columns (default: every numeric column) in one chart;
        /// a scatter becomes a scatter matrix
        #[arg(long = "combined")]
        combined: bool,
    },

    /// Inspect or change feature flags
    Features {
        #[command(subcommand)]
        action: FeatureAction,
    },

    /// Manage accounts
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    Histogram,
    Boxplot,
    Scatter,
    Qq,
    Heatmap,
}

#[derive(Subcommand, Debug)]
pub enum FeatureAction {
    /// Show every flag with its state
    List,
    /// Show the plots and analyses currently offered to users
    Offered,
    /// Turn a feature on (admin)
    Enable {
        feature: Feature,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Turn a feature off (admin)
    Disable {
        feature: Feature,
        #[command(flatten)]
        login: LoginArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register an account; users wait for approval
    Register {
        id: String,
        #[arg(long = "password")]
        password: String,
        #[arg(long = "role", default_value = "user")]
        role: Role,
    },
    /// Approve a pending account (admin)
    Approve {
        id: String,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Change an account's role (admin)
    Role {
        id: String,
        role: Role,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Delete an account (admin)
    Delete {
        id: String,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// List accounts (admin)
    List {
        /// Only accounts awaiting approval
        #[arg(long = "pending")]
        pending: bool,
        #[command(flatten)]
        login: LoginArgs,
    },
}

/// Where the data comes from
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// CSV file; the manual-entry template is used when omitted
    #[arg(short = 'f', long = "file", value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Field delimiter (`,` `;` `tab`), overrides config
    #[arg(long = "delimiter")]
    pub delimiter: Option<String>,

    /// utf-8, latin1 or cp1252, overrides config
    #[arg(long = "encoding")]
    pub encoding: Option<String>,
}

/// Administrator credentials for privileged actions
#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long = "as", value_name = "ID")]
    pub user: String,
    #[arg(long = "password")]
    pub password: String,
}

/// Scalar test parameters
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Hypothesized mean
    #[arg(long = "mu0")]
    pub mu0: Option<f64>,
    /// Known population standard deviation
    #[arg(long = "sigma")]
    pub sigma: Option<f64>,
    /// Successes (one-proportion)
    #[arg(long = "x")]
    pub x: Option<u64>,
    /// Trials (one-proportion)
    #[arg(long = "n")]
    pub n: Option<u64>,
    /// Hypothesized proportion
    #[arg(long = "p0")]
    pub p0: Option<f64>,
    #[arg(long = "x1")]
    pub x1: Option<u64>,
    #[arg(long = "n1")]
    pub n1: Option<u64>,
    #[arg(long = "x2")]
    pub x2: Option<u64>,
    #[arg(long = "n2")]
    pub n2: Option<u64>,
}

impl From<ParamArgs> for TestParams {
    fn from(args: ParamArgs) -> Self {
        TestParams {
            mu0: args.mu0,
            sigma: args.sigma,
            x: args.x,
            n: args.n,
            p0: args.p0,
            x1: args.x1,
            n1: args.n1,
            x2: args.x2,
            n2: args.n2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_test_command() {
        let cli = Cli::try_parse_from([
            "statdesk", "--format", "json", "test", "one-sample-t", "-c", "A", "--mu0", "10",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Command::Test {
                procedure,
                columns,
                params,
                alpha,
                ..
            } => {
                assert_eq!(procedure, Procedure::OneSampleT);
                assert_eq!(columns, vec!["A"]);
                assert_eq!(params.mu0, Some(10.0));
                assert!(alpha.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_columns_split_on_comma() {
        let cli =
            Cli::try_parse_from(["statdesk", "chart", "heatmap", "--columns", "A,B,C"]).unwrap();
        match cli.command {
            Command::Chart { kind, columns, .. } => {
                assert_eq!(kind, ChartKind::Heatmap);
                assert_eq!(columns.len(), 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_procedure_rejected() {
        assert!(Cli::try_parse_from(["statdesk", "test", "chi-square"]).is_err());
    }

    #[test]
    fn test_feature_names_with_spaces() {
        let cli = Cli::try_parse_from([
            "statdesk", "features", "disable", "Scatter Plot", "--as", "root", "--password", "pw",
        ])
        .unwrap();
        match cli.command {
            Command::Features {
                action: FeatureAction::Disable { feature, login },
            } => {
                assert_eq!(feature, Feature::ScatterPlot);
                assert_eq!(login.user, "root");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
