//! SQLite-backed persistence.
//!
//! The alarm collection is stored as one JSON array under a single
//! well-known key and rewritten as a unit on every mutating operation --
//! no partial or incremental persistence. An unreadable stored
//! collection is treated as "no saved alarms" and logged, never
//! propagated as a crash.

use rusqlite::Connection;
use tracing::warn;

use crate::alarm::Alarm;
use crate::error::{CoreError, Result, StorageError};

use super::data_dir;

/// The single well-known key for the serialized alarm collection.
const ALARMS_KEY: &str = "saved_alarms";

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/gentlealarm/gentlealarm.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("gentlealarm.db");
        let conn = Connection::open(&path).map_err(|source| StorageError::OpenFailed {
            path,
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(StorageError::from(e)))?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| CoreError::Storage(StorageError::from(e)))?;
        Ok(())
    }

    pub fn kv_get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Load the saved alarm collection.
    ///
    /// Missing or unreadable state yields an empty collection -- the app
    /// must come up usable regardless of what is on disk.
    pub fn load_alarms(&self) -> Vec<Alarm> {
        let json = match self.kv_get(ALARMS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%err, "failed to read saved alarms");
                return Vec::new();
            }
        };
        match serde_json::from_str(&json) {
            Ok(alarms) => alarms,
            Err(err) => {
                warn!(%err, "saved alarm collection is unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the full alarm collection as a unit.
    pub fn save_alarms(&self, alarms: &[Alarm]) -> Result<()> {
        let json = serde_json::to_string(alarms)?;
        self.kv_set(ALARMS_KEY, &json)
            .map_err(CoreError::Storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::Weekday;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
    }

    #[test]
    fn alarms_round_trip() {
        let db = Database::open_memory().unwrap();
        let mut alarm = Alarm::new(6, 45);
        alarm.repeat_days = [Weekday::Monday, Weekday::Friday].into();
        alarm.failsafe_enabled = true;

        db.save_alarms(&[alarm.clone()]).unwrap();
        let loaded = db.load_alarms();
        assert_eq!(loaded, vec![alarm]);
    }

    #[test]
    fn missing_state_is_empty() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_alarms().is_empty());
    }

    #[test]
    fn corrupt_state_is_empty_not_fatal() {
        let db = Database::open_memory().unwrap();
        db.kv_set("saved_alarms", "{not json").unwrap();
        assert!(db.load_alarms().is_empty());
    }
}
