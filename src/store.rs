//! Key-value persistence for feature flags and accounts
//!
//! [`MemoryStore`] keeps everything in process (tests, guest sessions);
//! [`FileStore`] mirrors it into a TOML state file. Writes are
//! last-writer-wins; nothing is locked.

use crate::accounts::{Account, AccountStore, Role, Status};
use crate::config::SeedAdmin;
use crate::features::{Feature, FeatureStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("State file {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serialized form of the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Feature name → enabled
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// In-process store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    features: BTreeMap<String, bool>,
    accounts: BTreeMap<String, Account>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All eight features enabled, plus the seed admin when given
    pub fn seeded(seed_admin: Option<&SeedAdmin>) -> Self {
        let mut store = Self::new();
        store.seed(seed_admin);
        store
    }

    fn seed(&mut self, seed_admin: Option<&SeedAdmin>) {
        for feature in Feature::ALL {
            self.features.entry(feature.name().to_string()).or_insert(true);
        }
        if let Some(admin) = seed_admin {
            if !self.accounts.contains_key(&admin.id) {
                tracing::info!(id = %admin.id, "seeding administrator account");
                self.accounts.insert(
                    admin.id.clone(),
                    Account {
                        id: admin.id.clone(),
                        credential: admin.credential.clone(),
                        role: Role::Admin,
                        status: Status::Approved,
                    },
                );
            }
        }
    }

    pub fn from_state(state: StoreState) -> Self {
        Self {
            features: state.features,
            accounts: state
                .accounts
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
        }
    }

    pub fn to_state(&self) -> StoreState {
        StoreState {
            features: self.features.clone(),
            accounts: self.accounts.values().cloned().collect(),
        }
    }
}

impl FeatureStore for MemoryStore {
    fn feature_flag(&self, feature: Feature) -> Option<bool> {
        self.features.get(feature.name()).copied()
    }

    fn set_feature_flag(&mut self, feature: Feature, enabled: bool) {
        tracing::info!(feature = %feature, enabled, "feature flag written");
        self.features.insert(feature.name().to_string(), enabled);
    }
}

impl AccountStore for MemoryStore {
    fn account(&self, id: &str) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn put_account(&mut self, account: Account) {
        self.accounts.insert(account.id.clone(), account);
    }

    fn remove_account(&mut self, id: &str) -> bool {
        self.accounts.remove(id).is_some()
    }

    fn accounts(&self) -> Vec<Account> {
        self.accounts.values().cloned().collect()
    }
}

/// Store backed by a TOML state file. Changes stay in memory until
/// [`FileStore::save`].
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the state file, creating seeded state in memory when it does
    /// not exist yet. Missing feature keys are filled in as enabled.
    pub fn open<P: AsRef<Path>>(
        path: P,
        seed_admin: Option<&SeedAdmin>,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut inner = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            let state: StoreState = toml::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(
                path = %path.display(),
                accounts = state.accounts.len(),
                "state loaded"
            );
            MemoryStore::from_state(state)
        } else {
            tracing::debug!(path = %path.display(), "no state file, starting fresh");
            MemoryStore::new()
        };
        inner.seed(seed_admin);
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current state back to disk
    pub fn save(&self) -> Result<(), StoreError> {
        let content = toml::to_string_pretty(&self.inner.to_state())?;
        fs::write(&self.path, content).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl FeatureStore for FileStore {
    fn feature_flag(&self, feature: Feature) -> Option<bool> {
        self.inner.feature_flag(feature)
    }

    fn set_feature_flag(&mut self, feature: Feature, enabled: bool) {
        self.inner.set_feature_flag(feature, enabled);
    }
}

impl AccountStore for FileStore {
    fn account(&self, id: &str) -> Option<Account> {
        self.inner.account(id)
    }

    fn put_account(&mut self, account: Account) {
        self.inner.put_account(account);
    }

    fn remove_account(&mut self, id: &str) -> bool {
        self.inner.remove_account(id)
    }

    fn accounts(&self) -> Vec<Account> {
        self.inner.accounts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{login, register};
    use crate::features::FeatureGate;
    use tempfile::TempDir;

    fn seed() -> SeedAdmin {
        SeedAdmin {
            id: "root".into(),
            credential: "pw".into(),
        }
    }

    #[test]
    fn test_seeded_store_enables_all_features() {
        let store = MemoryStore::seeded(None);
        for feature in Feature::ALL {
            assert_eq!(store.feature_flag(feature), Some(true));
        }
        assert!(store.accounts().is_empty());
    }

    #[test]
    fn test_seed_admin_can_log_in() {
        let store = MemoryStore::seeded(Some(&seed()));
        let session = login(&store, "root", "pw").unwrap();
        assert!(session.is_admin());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");

        let mut store = FileStore::open(&path, Some(&seed())).unwrap();
        store.set_feature_flag(Feature::Heatmap, false);
        register(&mut store, "ana", "secret", Role::User).unwrap();
        store.save().unwrap();

        let reopened = FileStore::open(&path, None).unwrap();
        assert_eq!(reopened.feature_flag(Feature::Heatmap), Some(false));
        assert_eq!(reopened.feature_flag(Feature::Histogram), Some(true));
        assert_eq!(reopened.accounts().len(), 2);
        assert_eq!(reopened.account("ana").unwrap().status, Status::Pending);

        let gate = FeatureGate::new(&reopened);
        assert!(!gate.offered_plots().contains(&Feature::Heatmap));
    }

    #[test]
    fn test_seed_does_not_overwrite_existing_flags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "[features]\n\"Help\" = false\n").unwrap();

        let store = FileStore::open(&path, None).unwrap();
        assert_eq!(store.feature_flag(Feature::Help), Some(false));
        assert_eq!(store.feature_flag(Feature::Boxplot), Some(true));
    }

    #[test]
    fn test_corrupt_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "features = [").unwrap();
        assert!(matches!(
            FileStore::open(&path, None),
            Err(StoreError::Parse { .. })
        ));
    }
}
