// Configuration for the analysis engine (statdesk.toml)
//
// Every field has a default, so an empty file (or no file) is valid.
// Command-line flags override what is loaded here.

use crate::ingest::CsvOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default histogram resolution
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "statdesk.toml";

/// Engine configuration
///
/// # Example
/// ```
/// use statdesk::config::StatdeskConfig;
///
/// let config = StatdeskConfig::default();
/// assert_eq!(config.significance_level, 0.05); // 95% confidence
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatdeskConfig {
    /// Significance level (alpha) for hypothesis tests
    ///
    /// - 0.05 (default): 95% confidence
    /// - 0.01: stricter, fewer false rejections
    /// - 0.10: looser
    pub significance_level: f64,

    /// TOML file holding feature flags and accounts
    pub state_file: PathBuf,

    pub csv: CsvOptions,

    pub charts: ChartConfig,

    /// Administrator created on first start when the state file is new
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub histogram_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

/// Initial approved administrator account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAdmin {
    pub id: String,
    pub credential: String,
}

impl Default for StatdeskConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            state_file: PathBuf::from("statdesk-state.toml"),
            csv: CsvOptions::default(),
            charts: ChartConfig::default(),
            seed_admin: None,
        }
    }
}

impl StatdeskConfig {
    /// 99% confidence
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            ..Self::default()
        }
    }

    /// 90% confidence
    pub fn permissive() -> Self {
        Self {
            significance_level: 0.10,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from a TOML string and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// Load `path` when given, else `statdesk.toml` if present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            ));
        }

        if self.charts.histogram_bins == 0 {
            return Err("charts.histogram_bins must be >= 1".to_string());
        }

        if let Some(admin) = &self.seed_admin {
            if admin.id.trim().is_empty() || admin.credential.is_empty() {
                return Err("seed_admin needs a non-empty id and credential".to_string());
            }
        }

        Ok(())
    }
}
