//! Persisted session progress and the store abstraction behind it.
//!
//! The store is an injected capability so the engine and runtime are
//! testable without a real storage backend. Writes are fire-and-forget from
//! the caller's point of view: a failed write is logged and dropped, and a
//! failed read degrades to "no stored progress".

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::{Phase, SessionKey};

/// Snapshot written opportunistically on every accepted tick and transition.
///
/// With `preserve_progress` enabled the full record is written; otherwise
/// only `remaining_secs` survives -- a reduced record that external
/// draft-saving features can still read, while the next mount starts clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProgress {
    pub remaining_secs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Key-value persistence for session progress, namespaced by [`SessionKey`].
///
/// Within one key, writes arrive in tick order and the last write wins;
/// there is no merging.
pub trait ProgressStore: Send + Sync {
    fn get(&self, key: &SessionKey) -> Result<Option<PersistedProgress>, StoreError>;
    fn set(&self, key: &SessionKey, progress: &PersistedProgress) -> Result<(), StoreError>;
    fn clear(&self, key: &SessionKey) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, PersistedProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, key: &SessionKey) -> Result<Option<PersistedProgress>, StoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(entries.get(&key.storage_key()).cloned())
    }

    fn set(&self, key: &SessionKey, progress: &PersistedProgress) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        entries.insert(key.storage_key(), progress.clone());
        Ok(())
    }

    fn clear(&self, key: &SessionKey) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        entries.remove(&key.storage_key());
        Ok(())
    }
}
