//! Access scope guard.
//!
//! Decides which records an identity may see or modify. A record is in
//! scope when its owner field names the identity, or when its id *is* the
//! identity (profile records are keyed by the identity itself). Scope is
//! evaluated per record on every call; nothing is cached.

use crate::model::PROFILES;
use crate::storage::Row;
use serde_json::Value;

/// Field naming the identity that created a record.
pub const OWNER_FIELD: &str = "user_id";

/// Field holding a record's unique identifier.
pub const ID_FIELD: &str = "id";

/// Field holding a record's creation timestamp.
pub const CREATED_AT_FIELD: &str = "created_at";

/// Fields assigned by the store on insert.
pub const SERVER_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, OWNER_FIELD];

/// How a table ties its records to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Records carry `user_id`.
    Owner,
    /// The record id is the identity; one record per identity.
    SelfKeyed,
}

impl Ownership {
    /// Ownership strategy for a table name.
    #[must_use]
    pub fn of(table: &str) -> Self {
        if table == PROFILES {
            Self::SelfKeyed
        } else {
            Self::Owner
        }
    }
}

/// Whether `row` is visible to `identity`.
///
/// No identity means nothing is in scope.
#[must_use]
pub fn in_scope(identity: Option<&str>, row: &Row) -> bool {
    let Some(uid) = identity else {
        return false;
    };
    field_is(row, OWNER_FIELD, uid) || field_is(row, ID_FIELD, uid)
}

/// Keep only the rows visible to `identity`, preserving order.
#[must_use]
pub fn scoped(identity: Option<&str>, rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter().filter(|r| in_scope(identity, r)).collect()
}

fn field_is(row: &Row, field: &str, expected: &str) -> bool {
    matches!(row.get(field), Some(Value::String(s)) if s == expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_owner_field_grants_scope() {
        let r = row(json!({"id": "t1", "user_id": "u1"}));
        assert!(in_scope(Some("u1"), &r));
        assert!(!in_scope(Some("u2"), &r));
    }

    #[test]
    fn test_self_keyed_profile_is_in_scope() {
        let profile = row(json!({"id": "u1", "email": "a@b.c"}));
        assert!(in_scope(Some("u1"), &profile));
        assert!(!in_scope(Some("u2"), &profile));
    }

    #[test]
    fn test_anonymous_sees_nothing() {
        let r = row(json!({"id": "t1", "user_id": "u1"}));
        assert!(!in_scope(None, &r));
        assert!(scoped(None, vec![r]).is_empty());
    }

    #[test]
    fn test_non_string_owner_never_matches() {
        let r = row(json!({"id": 7, "user_id": null}));
        assert!(!in_scope(Some("7"), &r));
    }

    #[test]
    fn test_ownership_of_tables() {
        assert_eq!(Ownership::of("profiles"), Ownership::SelfKeyed);
        assert_eq!(Ownership::of("transactions"), Ownership::Owner);
        assert_eq!(Ownership::of("anything_else"), Ownership::Owner);
    }
}
