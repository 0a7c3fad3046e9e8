//! Storage layer for AuraFin.
//!
//! This module provides the persistence layer:
//! - Whole-table record stores (SQLite or in-memory)
//! - A persisted session slot
//! - Bucketed object storage for uploaded files
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Durable SQLite record store
//! - [`store`] - `RecordStore` trait and in-memory store
//! - [`objects`] - Object storage for receipts and avatars

pub mod objects;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use objects::{ObjectStore, StoredObject};
pub use sqlite::SqliteStore;
pub use store::{MemoryStore, RecordStore, Row};
