//! Query descriptions over a single table.
//!
//! A [`QueryBuilder`] composes equality predicates and one sort directive;
//! [`QueryBuilder::build`] yields an immutable [`Query`]. Building a query
//! never touches storage: resolution happens only in
//! [`Database::execute`](crate::db::Database::execute).
//!
//! ```
//! use af::query::{Direction, Query};
//!
//! let query = Query::select("transactions")
//!     .eq("user_id", "u1")
//!     .eq("type", "expense")
//!     .order("date", Direction::Descending)
//!     .build();
//!
//! assert_eq!(query.predicates().len(), 2);
//! ```

mod value;

pub use value::{compare_values, values_equal};

use crate::error::{Error, Result};
use crate::scope::{ID_FIELD, OWNER_FIELD};
use crate::storage::Row;
use serde::Serialize;
use serde_json::Value;

/// Sort direction for [`QueryBuilder::order`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A single `field == value` condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

impl Predicate {
    /// Whether `row` carries `field` with an equal value.
    ///
    /// A missing field never matches, not even a `null` predicate.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.field)
            .is_some_and(|v| values_equal(v, &self.value))
    }

    /// Parse a `field=value` expression.
    ///
    /// The value is read with [`parse_field_value`]: `amount=12.5` and
    /// `read=false` are typed, `date=2024-05-01` and any id are strings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if there is no `=` or the field is empty.
    pub fn parse(expr: &str) -> Result<Self> {
        let (field, raw) = expr.split_once('=').ok_or_else(|| {
            Error::InvalidArgument(format!("expected field=value, got '{expr}'"))
        })?;
        let field = field.trim();
        if field.is_empty() {
            return Err(Error::InvalidArgument(format!("empty field name in '{expr}'")));
        }
        Ok(Self {
            field: field.to_string(),
            value: parse_field_value(field, raw),
        })
    }
}

/// Read a command-line value: JSON when it parses, otherwise a string.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Like [`parse_value`], but identifiers stay strings.
///
/// Generated ids are hex, so `123456789012` or `12e345678901` would
/// otherwise read as numbers and never match the stored text.
#[must_use]
pub fn parse_field_value(field: &str, raw: &str) -> Value {
    if is_id_field(field) {
        return Value::String(raw.to_string());
    }
    parse_value(raw)
}

fn is_id_field(field: &str) -> bool {
    field == ID_FIELD || field == OWNER_FIELD || field.ends_with("_id")
}

/// The single sort directive of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

/// Immutable description of a read over one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    table: String,
    predicates: Vec<Predicate>,
    sort: Option<Sort>,
}

impl Query {
    /// Start a query over `table` with no predicates and no sort.
    #[must_use]
    pub fn select(table: impl Into<String>) -> QueryBuilder {
        QueryBuilder {
            query: Self {
                table: table.into(),
                predicates: Vec::new(),
                sort: None,
            },
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    /// Whether `row` satisfies every predicate (AND).
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    /// Filter `rows` by the predicates and apply the sort directive.
    ///
    /// The sort is stable: rows that tie keep their relative order, in both
    /// directions. Without a sort directive the input order is kept.
    #[must_use]
    pub fn apply(&self, rows: Vec<Row>) -> Vec<Row> {
        let mut rows: Vec<Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&sort.field), b.get(&sort.field));
                match sort.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        rows
    }
}

/// Chainable builder for [`Query`].
#[derive(Debug, Clone)]
#[must_use]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Add an equality predicate. Predicates accumulate conjunctively.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.predicates.push(Predicate {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add an already-built predicate.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query.predicates.push(predicate);
        self
    }

    /// Set the sort directive, replacing any previous one.
    pub fn order(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.query.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Set an ascending sort directive.
    pub fn order_asc(self, field: impl Into<String>) -> Self {
        self.order(field, Direction::default())
    }

    /// Finish the query.
    #[must_use]
    pub fn build(self) -> Query {
        self.query
    }
}

impl From<QueryBuilder> for Query {
    fn from(builder: QueryBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().map(|r| r["id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_predicates_accumulate_conjunctively() {
        let query = Query::select("transactions")
            .eq("type", "expense")
            .eq("status", "paid")
            .build();

        let rows = vec![
            row(json!({"id": "a", "type": "expense", "status": "paid"})),
            row(json!({"id": "b", "type": "expense", "status": "pending"})),
            row(json!({"id": "c", "type": "income", "status": "paid"})),
        ];

        assert_eq!(ids(&query.apply(rows)), vec!["a"]);
    }

    #[test]
    fn test_same_field_twice_is_not_replaced() {
        let query = Query::select("t").eq("k", 1).eq("k", 2).build();
        assert_eq!(query.predicates().len(), 2);
        assert!(query.apply(vec![row(json!({"id": "a", "k": 1}))]).is_empty());
    }

    #[test]
    fn test_second_order_replaces_first() {
        let query = Query::select("t")
            .order("amount", Direction::Descending)
            .order_asc("date")
            .build();

        let sort = query.sort().unwrap();
        assert_eq!(sort.field, "date");
        assert_eq!(sort.direction, Direction::Ascending);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let rows = vec![
            row(json!({"id": "a", "date": "2024-05-02"})),
            row(json!({"id": "b", "date": "2024-05-01"})),
            row(json!({"id": "c", "date": "2024-05-02"})),
            row(json!({"id": "d", "date": "2024-05-01"})),
        ];

        let asc = Query::select("t").order_asc("date").build();
        assert_eq!(ids(&asc.apply(rows.clone())), vec!["b", "d", "a", "c"]);

        let desc = Query::select("t").order("date", Direction::Descending).build();
        assert_eq!(ids(&desc.apply(rows)), vec!["a", "c", "b", "d"]);
    }

    #[test]
    fn test_no_sort_preserves_store_order() {
        let rows = vec![
            row(json!({"id": "z"})),
            row(json!({"id": "a"})),
            row(json!({"id": "m"})),
        ];
        let query = Query::select("t").build();
        assert_eq!(ids(&query.apply(rows)), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_missing_field_never_matches_null() {
        let query = Query::select("t").eq("card_id", Value::Null).build();
        let rows = vec![
            row(json!({"id": "a"})),
            row(json!({"id": "b", "card_id": null})),
        ];
        assert_eq!(ids(&query.apply(rows)), vec!["b"]);
    }

    #[test]
    fn test_parse_predicate() {
        let p = Predicate::parse("amount=12.5").unwrap();
        assert_eq!(p.field, "amount");
        assert_eq!(p.value, json!(12.5));

        let p = Predicate::parse("date=2024-05-01").unwrap();
        assert_eq!(p.value, json!("2024-05-01"));

        let p = Predicate::parse("folder=2024/05").unwrap();
        assert_eq!(p.value, json!("2024/05"));

        assert!(Predicate::parse("no-equals").is_err());
        assert!(Predicate::parse("=x").is_err());
    }

    #[test]
    fn test_numeric_looking_ids_stay_strings() {
        let rows = vec![
            row(json!({"id": "123456789012", "user_id": "u1"})),
            row(json!({"id": "12e345678901", "user_id": "u1", "card_id": "000000000042"})),
        ];

        for (expr, expected) in [
            ("id=123456789012", "123456789012"),
            ("id=12e345678901", "12e345678901"),
            ("card_id=000000000042", "12e345678901"),
        ] {
            let p = Predicate::parse(expr).unwrap();
            assert!(p.value.is_string(), "{expr}");
            let query = Query::select("t").filter(p).build();
            assert_eq!(ids(&query.apply(rows.clone())), vec![expected]);
        }

        assert_eq!(parse_field_value("user_id", "42"), json!("42"));
        assert_eq!(parse_field_value("amount", "42"), json!(42));
    }
}
