//! SQLite storage implementation.
//!
//! Durable [`RecordStore`] backed by a single key/value table. Each table
//! write runs inside an IMMEDIATE transaction so a replace is never
//! observed half-applied.

use crate::error::{Error, Result};
use crate::storage::schema::{apply_schema, table_key, TABLE_KEY_PREFIX};
use crate::storage::store::{RecordStore, Row};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// SQLite-based record store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database at the given path.
    ///
    /// Creates the parent directory, the database file and the schema if
    /// they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        debug!(path = %path.display(), "Opened record store");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put_value(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match value {
            Some(v) => {
                tx.execute(
                    "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    rusqlite::params![key, v, now],
                )?;
            }
            None => {
                tx.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn read(&self, table: &str) -> Result<Vec<Row>> {
        let Some(raw) = self.get_value(&table_key(table))? else {
            return Ok(Vec::new());
        };

        let values: Vec<Value> = serde_json::from_str(&raw)?;
        let total = values.len();
        let rows: Vec<Row> = values
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();

        if rows.len() != total {
            warn!(table, skipped = total - rows.len(), "Skipped non-object entries in table");
        }

        Ok(rows)
    }

    fn write(&mut self, table: &str, rows: &[Row]) -> Result<()> {
        let payload = serde_json::to_string(rows)?;
        self.put_value(&table_key(table), Some(&payload))?;
        debug!(table, rows = rows.len(), "Wrote table");
        Ok(())
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.put_value(&table_key(table), None)
    }

    fn tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(TABLE_KEY_PREFIX).map(ToString::to_string))
            .collect())
    }

    fn load_slot(&self, key: &str) -> Result<Option<String>> {
        if key.starts_with(TABLE_KEY_PREFIX) {
            return Err(Error::InvalidArgument(format!(
                "slot key '{key}' collides with the table namespace"
            )));
        }
        self.get_value(key)
    }

    fn store_slot(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        if key.starts_with(TABLE_KEY_PREFIX) {
            return Err(Error::InvalidArgument(format!(
                "slot key '{key}' collides with the table namespace"
            )));
        }
        self.put_value(key, value)
    }
}
