//! Persistence adapters for whole-ledger snapshots.

pub mod json_backend;

use std::sync::{Arc, Mutex};

use tracing::error;

use crate::core::{LedgerStore, SubscriptionId};
use crate::errors::Result;
use crate::ledger::LedgerState;

pub use json_backend::{JsonStorage, PersistedEnvelope, DEFAULT_STORAGE_KEY, SNAPSHOT_VERSION};

/// Abstraction over backends able to hold one serialized ledger.
pub trait SnapshotStorage: Send + Sync {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<LedgerState>>;
    fn save(&self, state: &LedgerState) -> Result<()>;
}

/// In-process snapshot holder.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: Mutex<Option<LedgerState>>,
    saves: Mutex<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LedgerState) -> Self {
        Self {
            snapshot: Mutex::new(Some(state)),
            saves: Mutex::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        match self.saves.lock() {
            Ok(count) => *count,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> Result<Option<LedgerState>> {
        match self.snapshot.lock() {
            Ok(snapshot) => Ok(snapshot.clone()),
            Err(poisoned) => Ok(poisoned.into_inner().clone()),
        }
    }

    fn save(&self, state: &LedgerState) -> Result<()> {
        match self.snapshot.lock() {
            Ok(mut snapshot) => *snapshot = Some(state.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(state.clone()),
        }
        match self.saves.lock() {
            Ok(mut count) => *count += 1,
            Err(poisoned) => *poisoned.into_inner() += 1,
        }
        Ok(())
    }
}

/// Saves the ledger after every committed change. Failures are logged, never propagated into
/// the mutation that triggered them.
pub fn attach_autosave(store: &LedgerStore, storage: Arc<dyn SnapshotStorage>) -> SubscriptionId {
    store.subscribe(move |change| {
        if let Err(err) = storage.save(&change.state) {
            error!(action = change.action, error = %err, "failed to persist ledger snapshot");
        }
    })
}
