//! Scoped data access over a record store.
//!
//! [`Database`] resolves queries and mutations against a [`RecordStore`],
//! filtering every record through the access scope of the [`Session`]
//! passed to the call. Each operation is one full read (and, for
//! mutations, one full write) of a single table.
//!
//! Mutation semantics worth knowing:
//! - `update_where` changes only the *first* in-scope match.
//! - `delete_where` removes *every* in-scope match.
//! - A record that exists but belongs to someone else is reported exactly
//!   like a missing one.

use crate::auth::{Identity, Session};
use crate::error::{Error, Result};
use crate::model::{to_row, Record, TableRecord};
use crate::query::{values_equal, Query};
use crate::scope::{
    in_scope, scoped, Ownership, CREATED_AT_FIELD, ID_FIELD, OWNER_FIELD, SERVER_FIELDS,
};
use crate::storage::{RecordStore, Row, SqliteStore};
use chrono::SecondsFormat;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

/// Scoped access to the record store.
#[derive(Debug)]
pub struct Database<S: RecordStore = SqliteStore> {
    pub(crate) store: S,
    pub(crate) identity: Identity,
}

impl Database<SqliteStore> {
    /// Open a durable database at `path`.
    ///
    /// `identity` is the identity that sign-in and sign-up establish.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQLite store cannot be opened.
    pub fn open(path: &Path, identity: Identity) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(path)?, identity))
    }

    /// Open an in-memory SQLite database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the SQLite store cannot be opened.
    pub fn open_memory(identity: Identity) -> Result<Self> {
        Ok(Self::new(SqliteStore::open_memory()?, identity))
    }
}

impl<S: RecordStore> Database<S> {
    /// Wrap an existing store.
    pub fn new(store: S, identity: Identity) -> Self {
        Self { store, identity }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The identity established by sign-in.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    // ==================
    // Reads
    // ==================

    /// Resolve `query`: read the table, keep in-scope rows, apply the
    /// predicates, then the sort.
    ///
    /// No match is an empty result, never an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read.
    pub fn execute(&self, session: &Session, query: &Query) -> Result<Vec<Row>> {
        let rows = self.store.read(query.table())?;
        let visible = scoped(session.user_id(), rows);
        let result = query.apply(visible);

        debug!(
            table = query.table(),
            predicates = query.predicates().len(),
            matches = result.len(),
            "Executed query"
        );
        Ok(result)
    }

    /// Resolve `query` expecting one record.
    ///
    /// With several matches the first of the resolved sequence is returned
    /// (store order, or sort order when the query has one).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches.
    pub fn single(&self, session: &Session, query: &Query) -> Result<Row> {
        let rows = self.execute(session, query)?;

        if rows.len() > 1 {
            debug!(
                table = query.table(),
                matches = rows.len(),
                "single() matched several records, returning the first"
            );
        }

        rows.into_iter().next().ok_or_else(|| Error::NotFound {
            table: query.table().to_string(),
            detail: describe(query),
        })
    }

    /// Typed form of [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the query targets another table, or a
    /// JSON error if a stored row does not decode as `T`.
    pub fn fetch<T: TableRecord>(
        &self,
        session: &Session,
        query: &Query,
    ) -> Result<Vec<Record<T>>> {
        check_table::<T>(query)?;
        self.execute(session, query)?
            .into_iter()
            .map(Record::from_row)
            .collect()
    }

    /// Typed form of [`single`](Self::single).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when nothing matches, plus the errors of [`fetch`](Self::fetch).
    pub fn fetch_one<T: TableRecord>(&self, session: &Session, query: &Query) -> Result<Record<T>> {
        check_table::<T>(query)?;
        Record::from_row(self.single(session, query)?)
    }

    /// Identity owning the first record whose `field` equals `value`,
    /// ignoring access scope.
    ///
    /// Only the owning identity is returned, never the record. This is the
    /// lookup a trusted backend uses to map an external handle (such as a
    /// messaging phone number) to an identity before any session exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read.
    pub fn find_owner(
        &self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<String>> {
        let value = value.into();
        let rows = self.store.read(table)?;
        let owner_field = match Ownership::of(table) {
            Ownership::Owner => OWNER_FIELD,
            Ownership::SelfKeyed => ID_FIELD,
        };

        Ok(rows
            .iter()
            .find(|r| r.get(field).is_some_and(|v| values_equal(v, &value)))
            .and_then(|r| r.get(owner_field))
            .and_then(Value::as_str)
            .map(ToString::to_string))
    }

    // ==================
    // Mutations
    // ==================

    /// Insert a record owned by the session's identity.
    ///
    /// The store assigns `id`, `created_at` and `user_id`, overriding any
    /// values supplied in `fields`. On self-keyed tables (profiles) the id
    /// is the identity itself and no owner field is written.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without a session (the table is untouched),
    /// or `ProfileExists` when a self-keyed record already exists.
    pub fn insert(&mut self, session: &Session, table: &str, fields: Row) -> Result<Row> {
        let uid = session.user_id().ok_or(Error::Unauthorized)?;
        let mut rows = self.store.read(table)?;
        let ownership = Ownership::of(table);

        let id = match ownership {
            Ownership::Owner => generate_id(&rows),
            Ownership::SelfKeyed => {
                if rows.iter().any(|r| r.get(ID_FIELD).and_then(Value::as_str) == Some(uid)) {
                    return Err(Error::ProfileExists { id: uid.to_string() });
                }
                uid.to_string()
            }
        };

        let mut row = Row::new();
        row.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        row.insert(CREATED_AT_FIELD.to_string(), Value::String(now_timestamp()));
        if ownership == Ownership::Owner {
            row.insert(OWNER_FIELD.to_string(), Value::String(uid.to_string()));
        }

        for (key, value) in fields {
            if SERVER_FIELDS.contains(&key.as_str()) {
                debug!(table, field = %key, "Ignoring caller-supplied server field");
                continue;
            }
            row.insert(key, value);
        }

        rows.push(row.clone());
        self.store.write(table, &rows)?;

        info!(table, id = %id, "Inserted record");
        Ok(row)
    }

    /// Typed form of [`insert`](Self::insert).
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn create<T: TableRecord>(&mut self, session: &Session, data: &T) -> Result<Record<T>> {
        let row = self.insert(session, T::TABLE, to_row(data)?)?;
        Record::from_row(row)
    }

    /// Shallow-merge `patch` into the first in-scope record whose `field`
    /// equals `value`.
    ///
    /// Store-assigned fields may appear in the patch only with their current
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without a session, `NotFound` when no in-scope
    /// record matches (whether absent or owned by someone else), or
    /// `ProtectedField` when the patch would change `id`, `user_id` or
    /// `created_at`.
    pub fn update_where(
        &mut self,
        session: &Session,
        table: &str,
        field: &str,
        value: impl Into<Value>,
        patch: Row,
    ) -> Result<Row> {
        let uid = session.user_id().ok_or(Error::Unauthorized)?;
        let value = value.into();
        let mut rows = self.store.read(table)?;

        let index = rows
            .iter()
            .position(|r| {
                in_scope(Some(uid), r) && r.get(field).is_some_and(|v| values_equal(v, &value))
            })
            .ok_or_else(|| Error::not_found(table, field, display_value(&value)))?;

        for key in SERVER_FIELDS {
            if let Some(new) = patch.get(key) {
                let unchanged = rows[index].get(key).is_some_and(|old| values_equal(old, new));
                if !unchanged {
                    return Err(Error::ProtectedField {
                        field: key.to_string(),
                    });
                }
            }
        }

        let target = &mut rows[index];
        for (key, v) in patch {
            target.insert(key, v);
        }
        let updated = target.clone();

        self.store.write(table, &rows)?;

        info!(table, field, "Updated record");
        Ok(updated)
    }

    /// Remove every in-scope record whose `field` equals `value`.
    ///
    /// Without a session nothing is in scope, so nothing is removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read or written.
    pub fn delete_where(
        &mut self,
        session: &Session,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<usize> {
        let Some(uid) = session.user_id() else {
            debug!(table, "Delete without session removes nothing");
            return Ok(0);
        };
        let value = value.into();
        let mut rows = self.store.read(table)?;
        let before = rows.len();

        rows.retain(|r| {
            !(in_scope(Some(uid), r) && r.get(field).is_some_and(|v| values_equal(v, &value)))
        });

        let removed = before - rows.len();
        if removed > 0 {
            self.store.write(table, &rows)?;
        }

        info!(table, field, removed, "Deleted records");
        Ok(removed)
    }
}

fn check_table<T: TableRecord>(query: &Query) -> Result<()> {
    if query.table() == T::TABLE {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "query targets '{}' but the record type is stored in '{}'",
            query.table(),
            T::TABLE
        )))
    }
}

fn describe(query: &Query) -> String {
    if query.predicates().is_empty() {
        return "no matching record".to_string();
    }
    query
        .predicates()
        .iter()
        .map(|p| format!("{} = {}", p.field, display_value(&p.value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Short random id, unique within `existing`.
fn generate_id(existing: &[Row]) -> String {
    loop {
        let id = uuid::Uuid::new_v4().simple().to_string()[..12].to_string();
        let taken = existing
            .iter()
            .any(|r| r.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()));
        if !taken {
            return id;
        }
    }
}

pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
