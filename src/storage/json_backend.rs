use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SnapshotStorage;
use crate::errors::{LedgerError, Result};
use crate::ledger::LedgerState;
use crate::utils::{app_data_dir, ensure_dir, write_atomic};

pub const DEFAULT_STORAGE_KEY: &str = "mini-wallet-storage";
pub const SNAPSHOT_VERSION: u32 = 0;

/// On-disk layout: the ledger nested under `state` beside a format version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedEnvelope {
    pub state: LedgerState,
    #[serde(default)]
    pub version: u32,
}

/// Stores the ledger as `<key>.json` inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    key: String,
}

impl JsonStorage {
    /// `root` defaults to the application data directory.
    pub fn new(root: Option<PathBuf>, key: &str) -> Result<Self> {
        let root = root.unwrap_or_else(app_data_dir);
        ensure_dir(&root)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(LedgerError::Config("storage key must not be empty".into()));
        }
        Ok(Self {
            root,
            key: key.to_string(),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, DEFAULT_STORAGE_KEY)
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(format!("{}.json", self.key))
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl SnapshotStorage for JsonStorage {
    fn load(&self) -> Result<Option<LedgerState>> {
        let path = self.path();
        if !path.exists() {
            debug!(path = %path.display(), "no persisted ledger");
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        let envelope: PersistedEnvelope = serde_json::from_str(&data)?;
        if envelope.version > SNAPSHOT_VERSION {
            return Err(LedgerError::Storage(format!(
                "ledger snapshot `{}` has unsupported version {}",
                path.display(),
                envelope.version
            )));
        }
        debug!(path = %path.display(), "loaded persisted ledger");
        Ok(Some(envelope.state))
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        let path = self.path();
        let envelope = PersistedEnvelope {
            state: state.clone(),
            version: SNAPSHOT_VERSION,
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        write_atomic(&path, &json)?;
        debug!(path = %path.display(), "saved ledger snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, SeedData};
    use rust_decimal_macros::dec;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(Some(dir.path().to_path_buf()), "wallet").unwrap();
        assert!(storage.load().unwrap().is_none());
        assert_eq!(storage.path(), dir.path().join("wallet.json"));
    }

    #[test]
    fn save_writes_versioned_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(Some(dir.path().to_path_buf()), DEFAULT_STORAGE_KEY).unwrap();
        let state = LedgerState::from_seed(SeedData::new(
            vec![Account::new("main", "Main", dec!(12.5))],
            Vec::new(),
        ));
        storage.save(&state).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(storage.path()).unwrap()).unwrap();
        assert_eq!(raw["version"], 0);
        assert_eq!(raw["state"]["accounts"][0]["balance"], 12.5);
        assert!(raw["state"]["recurringTransactions"].is_array());
        assert_eq!(storage.load().unwrap(), Some(state));
    }

    #[test]
    fn newer_versions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(Some(dir.path().to_path_buf()), "wallet").unwrap();
        fs::write(storage.path(), r#"{"state":{},"version":3}"#).unwrap();
        assert!(matches!(storage.load(), Err(LedgerError::Storage(_))));
    }

    #[test]
    fn corrupt_file_surfaces_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(Some(dir.path().to_path_buf()), "wallet").unwrap();
        fs::write(storage.path(), "{ not json").unwrap();
        assert!(matches!(storage.load(), Err(LedgerError::Serde(_))));
    }

    #[test]
    fn empty_key_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonStorage::new(Some(dir.path().to_path_buf()), " ").unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }
}
