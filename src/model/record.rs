//! Record envelope shared by every table.
//!
//! Stored rows are open JSON objects. Typed access composes the
//! store-assigned [`Envelope`] with a per-table payload through serde
//! flattening, so a `Record<Transaction>` reads and writes the same row
//! shape the untyped API sees.

use crate::error::{Error, Result};
use crate::storage::Row;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A payload type bound to one table.
pub trait TableRecord: Serialize + DeserializeOwned {
    /// Table the payload is stored in.
    const TABLE: &'static str;
}

/// Fields assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,

    /// RFC 3339 creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Owning identity. Absent on self-keyed tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A stored record: envelope plus typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    #[serde(flatten)]
    pub envelope: Envelope,

    #[serde(flatten)]
    pub data: T,
}

impl<T: TableRecord> Record<T> {
    /// Decode a stored row.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the row does not match the payload type.
    pub fn from_row(row: Row) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(row))?)
    }

    /// Record id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.envelope.id
    }
}

/// Serialize a payload into a row.
///
/// # Errors
///
/// Returns `InvalidArgument` if the value does not serialize to a JSON object.
pub fn to_row<T: Serialize>(value: &T) -> Result<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidArgument(format!(
            "record must be a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Card;
    use serde_json::json;

    #[test]
    fn test_record_flattens_envelope_and_payload() {
        let row = json!({
            "id": "c1",
            "created_at": "2024-05-01T12:00:00.000Z",
            "user_id": "u1",
            "name": "Nubank",
            "institution": "Nu",
            "last_digits": "1234",
            "total_limit": 5000,
            "due_day": 10,
            "closing_day": 3,
            "color": "#063A3A"
        });

        let record: Record<Card> = Record::from_row(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(record.id(), "c1");
        assert_eq!(record.envelope.user_id.as_deref(), Some("u1"));
        assert!((record.data.total_limit - 5000.0).abs() < f64::EPSILON);

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["id"], "c1");
        assert_eq!(back["name"], "Nubank");
    }

    #[test]
    fn test_to_row_rejects_non_objects() {
        assert!(to_row(&json!([1, 2])).is_err());
        assert!(to_row(&json!({"a": 1})).is_ok());
    }
}
