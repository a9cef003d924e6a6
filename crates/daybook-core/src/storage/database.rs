//! SQLite-backed key-value store for session progress.
//!
//! The timer writes small JSON records keyed by session date; this store
//! keeps them in a single kv table so sequential sessions on different
//! dates never collide and a later write always replaces an earlier one.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::warn;

use super::data_dir;
use crate::error::StoreError;
use crate::progress::{PersistedProgress, ProgressStore};
use crate::session::SessionKey;

/// SQLite database holding persisted session progress.
///
/// The connection sits behind a mutex so the store can be shared with a
/// session runtime.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/daybook/daybook.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?
            .join("daybook.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a value from the kv store.
    pub fn kv_delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl ProgressStore for Database {
    fn get(&self, key: &SessionKey) -> Result<Option<PersistedProgress>, StoreError> {
        let Some(json) = self.kv_get(&key.storage_key())? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                // A corrupt record reads as "no stored progress"; the next
                // write replaces it.
                warn!(session = %key, error = %e, "discarding corrupt progress record");
                Ok(None)
            }
        }
    }

    fn set(&self, key: &SessionKey, progress: &PersistedProgress) -> Result<(), StoreError> {
        let json = serde_json::to_string(progress).map_err(|e| StoreError::CorruptRecord {
            key: key.storage_key(),
            message: e.to_string(),
        })?;
        self.kv_set(&key.storage_key(), &json)
    }

    fn clear(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.kv_delete(&key.storage_key())
    }
}
