use anyhow::{bail, Context, Result};
use clap::Parser;
use statdesk::accounts::{login, register, AccountError, AccountStore, Role, Session};
use statdesk::charts::{self, Chart};
use statdesk::cli::{ChartKind, Cli, Command, DataArgs, FeatureAction, LoginArgs, UserAction};
use statdesk::config::StatdeskConfig;
use statdesk::dataset::Dataset;
use statdesk::descriptive::{correlation_matrix, describe};
use statdesk::features::{Feature, FeatureGate, FeatureStore};
use statdesk::hypothesis::{run_test, TestRequest};
use statdesk::ingest::{parse_delimiter, read_csv_file, Encoding};
use statdesk::normality::run_normality_test;
use statdesk::report::{
    procedure_catalog, render, AccountEntry, FeatureState, OfferedMenu, OutputFormat,
};
use statdesk::store::FileStore;
use statdesk::transform::transform;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the CSV named on the command line, or the manual-entry template
fn load_dataset(data: &DataArgs, config: &StatdeskConfig) -> Result<Dataset> {
    let Some(path) = &data.file else {
        tracing::debug!("no --file given, using the manual-entry template");
        return Ok(Dataset::manual_template());
    };

    let mut options = config.csv;
    if let Some(delimiter) = &data.delimiter {
        options.delimiter = parse_delimiter(delimiter)?;
    }
    if let Some(encoding) = &data.encoding {
        options.encoding = encoding.parse::<Encoding>()?;
    }
    read_csv_file(path, options).with_context(|| format!("Failed to load {}", path.display()))
}

fn admin_session(store: &FileStore, args: &LoginArgs) -> Result<Session> {
    let session = login(store, &args.user, &args.password)?;
    if !session.is_admin() {
        return Err(AccountError::NotAuthorized.into());
    }
    Ok(session)
}

fn one_column<'a>(columns: &'a [String], kind: ChartKind) -> Result<&'a str> {
    match columns {
        [column] => Ok(column.as_str()),
        _ => bail!("{kind:?} takes exactly one column, got {}", columns.len()),
    }
}

fn set_feature(
    store: &mut FileStore,
    feature: Feature,
    enabled: bool,
    login: &LoginArgs,
) -> Result<String> {
    let session = admin_session(store, login)?;
    store.set_feature_flag(feature, enabled);
    store.save()?;
    tracing::info!(feature = %feature, enabled, by = %session.user_id, "feature toggled");
    let state = if enabled { "enabled" } else { "disabled" };
    Ok(format!("Feature '{feature}' {state}"))
}

fn run(cli: Cli) -> Result<String> {
    let config = StatdeskConfig::load(cli.config.as_deref())?;
    let state_path = cli.state.clone().unwrap_or_else(|| config.state_file.clone());
    let mut store = FileStore::open(&state_path, config.seed_admin.as_ref())?;
    let format: OutputFormat = cli.format;

    let output = match cli.command {
        Command::Procedures => render(&procedure_catalog(&FeatureGate::new(&store))?, format)?,

        Command::Describe { data, correlation } => {
            let dataset = load_dataset(&data, &config)?;
            if correlation {
                FeatureGate::new(&store).require(Feature::Heatmap)?;
                render(&correlation_matrix(&dataset, &[])?, format)?
            } else {
                render(&describe(&dataset), format)?
            }
        }

        Command::Test {
            procedure,
            data,
            columns,
            alpha,
            params,
        } => {
            FeatureGate::new(&store).require(Feature::HypothesisTest)?;
            let dataset = load_dataset(&data, &config)?;
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let request = TestRequest::new(
                procedure,
                &columns,
                alpha.unwrap_or(config.significance_level),
            )
            .with_params(params.into());
            render(&run_test(&dataset, &request)?, format)?
        }

        Command::Normality {
            method,
            data,
            column,
        } => {
            FeatureGate::new(&store).require(Feature::NormalityTest)?;
            let dataset = load_dataset(&data, &config)?;
            let values = dataset.numeric_values(&column)?;
            render(&run_normality_test(method, &column, &values)?, format)?
        }

        Command::Transform {
            method,
            data,
            column,
        } => {
            FeatureGate::new(&store).require(Feature::DataNormalization)?;
            let dataset = load_dataset(&data, &config)?;
            let values = dataset.numeric_values(&column)?;
            render(&transform(method, &column, &values)?, format)?
        }

        Command::Chart {
            kind,
            data,
            columns,
            bins,
            combined,
        } => {
            let dataset = load_dataset(&data, &config)?;
            let gate = FeatureGate::new(&store);
            let bins = bins.unwrap_or(config.charts.histogram_bins);
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            let chart = match (kind, combined) {
                (ChartKind::Histogram, true) => {
                    Chart::Combined(charts::histograms(&gate, &dataset, &names, bins)?)
                }
                (ChartKind::Boxplot, true) => {
                    Chart::Combined(charts::boxplots(&gate, &dataset, &names)?)
                }
                (ChartKind::Scatter, true) => {
                    Chart::PairGrid(charts::pair_grid(&gate, &dataset, &names, bins)?)
                }
                (ChartKind::Histogram, false) => {
                    let column = one_column(&columns, kind)?;
                    Chart::Histogram(charts::histogram(&gate, &dataset, column, bins)?)
                }
                (ChartKind::Boxplot, false) => {
                    let column = one_column(&columns, kind)?;
                    Chart::Boxplot(charts::boxplot(&gate, &dataset, column)?)
                }
                (ChartKind::Qq, false) => {
                    let column = one_column(&columns, kind)?;
                    Chart::Qq(charts::qq_plot(&gate, &dataset, column)?)
                }
                (ChartKind::Scatter, false) => match names.as_slice() {
                    [x, y] => Chart::Scatter(charts::scatter(&gate, &dataset, x, y)?),
                    _ => bail!("Scatter takes exactly two columns (x,y), got {}", names.len()),
                },
                // the heatmap always covers several columns
                (ChartKind::Heatmap, _) => {
                    Chart::Heatmap(charts::heatmap(&gate, &dataset, &names)?)
                }
                (ChartKind::Qq, true) => bail!("Q-Q plots are drawn one column at a time"),
            };
            render(&chart, format)?
        }

        Command::Features { action } => match action {
            FeatureAction::List => {
                let gate = FeatureGate::new(&store);
                let states: Vec<FeatureState> = gate
                    .snapshot()
                    .into_iter()
                    .map(|(feature, enabled)| FeatureState {
                        feature,
                        name: feature.name(),
                        enabled,
                    })
                    .collect();
                render(&states, format)?
            }
            FeatureAction::Offered => {
                render(&OfferedMenu::from_gate(&FeatureGate::new(&store)), format)?
            }
            FeatureAction::Enable { feature, login } => {
                set_feature(&mut store, feature, true, &login)?
            }
            FeatureAction::Disable { feature, login } => {
                set_feature(&mut store, feature, false, &login)?
            }
        },

        Command::Users { action } => match action {
            UserAction::Register { id, password, role } => {
                let account = register(&mut store, &id, &password, role)?;
                store.save()?;
                format!(
                    "Registered '{}' as {}{}",
                    account.id,
                    account.role,
                    if account.role == Role::User {
                        " (awaiting approval)"
                    } else {
                        ""
                    }
                )
            }
            UserAction::Approve { id, login } => {
                let session = admin_session(&store, &login)?;
                session.approve(&mut store, &id)?;
                store.save()?;
                format!("Approved '{id}'")
            }
            UserAction::Role { id, role, login } => {
                let session = admin_session(&store, &login)?;
                session.set_role(&mut store, &id, role)?;
                store.save()?;
                format!("'{id}' is now {role}")
            }
            UserAction::Delete { id, login } => {
                let session = admin_session(&store, &login)?;
                session.delete(&mut store, &id)?;
                store.save()?;
                format!("Deleted '{id}'")
            }
            UserAction::List { pending, login } => {
                let session = admin_session(&store, &login)?;
                let accounts = if pending {
                    session.pending(&store)?
                } else {
                    store.accounts()
                };
                let entries: Vec<AccountEntry> = accounts.iter().map(AccountEntry::from).collect();
                render(&entries, format)?
            }
        },
    };

    Ok(output)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    let output = run(cli)?;
    println!("{}", output.trim_end());
    Ok(())
}
