//! Record store abstraction.
//!
//! A record store persists whole tables: reads return every record of a
//! table, writes replace the table wholesale. There is no partial write and
//! no transaction concept above a single `write` call.

use crate::error::Result;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// A stored record: an open map of field name to JSON value.
pub type Row = Map<String, Value>;

/// Whole-table persistence plus a small key/value slot area.
///
/// Implemented by [`SqliteStore`](super::SqliteStore) for durable storage
/// and [`MemoryStore`] for process-local use.
pub trait RecordStore {
    /// Full current contents of `table`, or empty if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be read.
    fn read(&self, table: &str) -> Result<Vec<Row>>;

    /// Replace the entire contents of `table` with `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be written.
    fn write(&mut self, table: &str, rows: &[Row]) -> Result<()>;

    /// Remove `table` entirely.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be written.
    fn clear(&mut self, table: &str) -> Result<()>;

    /// Names of all tables that have been written, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be read.
    fn tables(&self) -> Result<Vec<String>>;

    /// Read a named slot (used for the persisted session).
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be read.
    fn load_slot(&self, key: &str) -> Result<Option<String>>;

    /// Set or clear (`None`) a named slot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be written.
    fn store_slot(&mut self, key: &str, value: Option<&str>) -> Result<()>;
}

/// Process-local record store.
///
/// Nothing survives the process; useful for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Row>>,
    slots: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn read(&self, table: &str) -> Result<Vec<Row>> {
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }

    fn write(&mut self, table: &str, rows: &[Row]) -> Result<()> {
        self.tables.insert(table.to_string(), rows.to_vec());
        Ok(())
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.tables.remove(table);
        Ok(())
    }

    fn tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn load_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn store_slot(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => {
                self.slots.insert(key.to_string(), v.to_string());
            }
            None => {
                self.slots.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_read_unwritten_table_is_empty() {
        let store = MemoryStore::new();
        assert!(store.read("transactions").unwrap().is_empty());
        assert!(store.tables().unwrap().is_empty());
    }

    #[test]
    fn test_write_replaces_whole_table() {
        let mut store = MemoryStore::new();
        store
            .write("cards", &[row(json!({"id": "a"})), row(json!({"id": "b"}))])
            .unwrap();
        store.write("cards", &[row(json!({"id": "c"}))]).unwrap();

        let rows = store.read("cards").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "c");
    }

    #[test]
    fn test_slots_set_and_clear() {
        let mut store = MemoryStore::new();
        store.store_slot("aurafin_session", Some("x")).unwrap();
        assert_eq!(store.load_slot("aurafin_session").unwrap().as_deref(), Some("x"));

        store.store_slot("aurafin_session", None).unwrap();
        assert!(store.load_slot("aurafin_session").unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_table() {
        let mut store = MemoryStore::new();
        store.write("receipts", &[row(json!({"id": "r"}))]).unwrap();
        store.clear("receipts").unwrap();
        assert!(store.read("receipts").unwrap().is_empty());
        assert!(store.tables().unwrap().is_empty());
    }
}
