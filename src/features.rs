//! Feature gate
//!
//! A flat key → enabled map over a fixed catalog of eight features. The gate
//! decides what is *offered*: disabled plots and analyses never appear in the
//! lists handed to the caller. Keys absent from the store count as enabled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed feature catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    Histogram,
    Boxplot,
    ScatterPlot,
    Heatmap,
    NormalityTest,
    HypothesisTest,
    DataNormalization,
    Help,
}

impl Feature {
    /// Catalog in display order
    pub const ALL: [Feature; 8] = [
        Feature::Histogram,
        Feature::Boxplot,
        Feature::ScatterPlot,
        Feature::Heatmap,
        Feature::NormalityTest,
        Feature::HypothesisTest,
        Feature::DataNormalization,
        Feature::Help,
    ];

    /// Visualization features, in the order plot kinds are offered
    pub const PLOTS: [Feature; 4] = [
        Feature::Histogram,
        Feature::Boxplot,
        Feature::ScatterPlot,
        Feature::Heatmap,
    ];

    /// Analysis features, in the order analysis kinds are offered
    pub const ANALYSES: [Feature; 3] = [
        Feature::DataNormalization,
        Feature::HypothesisTest,
        Feature::NormalityTest,
    ];

    /// Store key / display name
    pub fn name(self) -> &'static str {
        match self {
            Feature::Histogram => "Histogram",
            Feature::Boxplot => "Boxplot",
            Feature::ScatterPlot => "Scatter Plot",
            Feature::Heatmap => "Heatmap",
            Feature::NormalityTest => "Normality Test",
            Feature::HypothesisTest => "Hypothesis Test",
            Feature::DataNormalization => "Data Normalization",
            Feature::Help => "Help",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Feature::ALL
            .into_iter()
            .find(|f| {
                f.name()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase()
                    == wanted
            })
            .ok_or_else(|| format!("unknown feature '{s}'"))
    }
}

/// Key-value capability holding feature flags
pub trait FeatureStore {
    /// Stored flag, `None` when the key was never written
    fn feature_flag(&self, feature: Feature) -> Option<bool>;

    /// Write a flag (administrator action)
    fn set_feature_flag(&mut self, feature: Feature, enabled: bool);
}

/// Read-only view of a [`FeatureStore`] answering "what may be offered"
pub struct FeatureGate<'a> {
    store: &'a dyn FeatureStore,
}

impl<'a> FeatureGate<'a> {
    pub fn new(store: &'a dyn FeatureStore) -> Self {
        Self { store }
    }

    /// Absent flags default to enabled
    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.store.feature_flag(feature).unwrap_or(true)
    }

    /// Fail with `FeatureDisabled` unless the feature is on
    pub fn require(&self, feature: Feature) -> crate::error::Result<()> {
        if self.is_enabled(feature) {
            Ok(())
        } else {
            tracing::warn!(feature = %feature, "gated operation requested while disabled");
            Err(crate::error::EngineError::FeatureDisabled(feature))
        }
    }

    /// Plot kinds to offer
    pub fn offered_plots(&self) -> Vec<Feature> {
        Feature::PLOTS
            .into_iter()
            .filter(|&f| self.is_enabled(f))
            .collect()
    }

    /// Analysis kinds to offer
    pub fn offered_analyses(&self) -> Vec<Feature> {
        Feature::ANALYSES
            .into_iter()
            .filter(|&f| self.is_enabled(f))
            .collect()
    }

    /// Whether the help section is shown
    pub fn shows_help(&self) -> bool {
        self.is_enabled(Feature::Help)
    }

    /// Full catalog with effective state, in display order
    pub fn snapshot(&self) -> Vec<(Feature, bool)> {
        Feature::ALL
            .into_iter()
            .map(|f| (f, self.is_enabled(f)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(HashMap<Feature, bool>);

    impl FeatureStore for MapStore {
        fn feature_flag(&self, feature: Feature) -> Option<bool> {
            self.0.get(&feature).copied()
        }

        fn set_feature_flag(&mut self, feature: Feature, enabled: bool) {
            self.0.insert(feature, enabled);
        }
    }

    #[test]
    fn test_absent_flags_default_on() {
        let store = MapStore::default();
        let gate = FeatureGate::new(&store);
        assert!(Feature::ALL.iter().all(|&f| gate.is_enabled(f)));
        assert_eq!(gate.offered_plots().len(), 4);
        assert_eq!(gate.offered_analyses().len(), 3);
        assert!(gate.shows_help());
    }

    #[test]
    fn test_disabled_features_are_hidden() {
        let mut store = MapStore::default();
        store.set_feature_flag(Feature::Heatmap, false);
        store.set_feature_flag(Feature::HypothesisTest, false);

        let gate = FeatureGate::new(&store);
        assert_eq!(
            gate.offered_plots(),
            vec![Feature::Histogram, Feature::Boxplot, Feature::ScatterPlot]
        );
        assert_eq!(
            gate.offered_analyses(),
            vec![Feature::DataNormalization, Feature::NormalityTest]
        );
        assert!(gate.require(Feature::HypothesisTest).is_err());
        assert!(gate.require(Feature::NormalityTest).is_ok());
    }

    #[test]
    fn test_parse_feature_names() {
        assert_eq!("Scatter Plot".parse::<Feature>().unwrap(), Feature::ScatterPlot);
        assert_eq!("scatter-plot".parse::<Feature>().unwrap(), Feature::ScatterPlot);
        assert_eq!("hypothesis_test".parse::<Feature>().unwrap(), Feature::HypothesisTest);
        assert!("pie chart".parse::<Feature>().is_err());
    }

    #[test]
    fn test_catalog_has_eight_unique_names() {
        let mut names: Vec<_> = Feature::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }
}
