//! Command implementations.

pub mod ai;
pub mod auth;
pub mod completions;
pub mod finance;
pub mod receipt;
pub mod records;
pub mod version;
pub mod webhook;

use crate::auth::Session;
use crate::config::{resolve_db_path, resolve_identity};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::finance::YearMonth;
use crate::model::{Profile, Record, Transaction, PROFILES, TRANSACTIONS};
use crate::query::{Direction, Query};
use crate::scope::ID_FIELD;
use crate::storage::Row;
use crate::validate::{normalize_table, rejected};
use serde::Serialize;
use std::path::PathBuf;
use tokio::runtime::Runtime;

pub(crate) fn database_path(db_path: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_db_path(db_path.map(PathBuf::as_path)).ok_or_else(|| {
        Error::Config("could not determine database path (set AURAFIN_DB or pass --db)".into())
    })
}

/// Open the database at the resolved path as the configured identity.
pub(crate) fn open_database(db_path: Option<&PathBuf>) -> Result<Database> {
    Database::open(&database_path(db_path)?, resolve_identity())
}

/// The current session, failing when nobody is signed in.
pub(crate) fn require_session(db: &Database) -> Result<Session> {
    let session = db.session()?;
    if session.is_authenticated() {
        Ok(session)
    } else {
        Err(Error::Unauthorized)
    }
}

pub(crate) fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Canonical table name for a command-line argument.
pub(crate) fn table_arg(input: &str) -> Result<&'static str> {
    normalize_table(input).map_err(|r| rejected("table", r))
}

/// Parse a JSON object argument into a row.
pub(crate) fn fields_arg(raw: &str) -> Result<Row> {
    match serde_json::from_str(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::InvalidArgument(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

pub(crate) fn month_arg(month: Option<&str>) -> Result<YearMonth> {
    month.map_or_else(|| Ok(YearMonth::current()), str::parse)
}

/// Every transaction of the session, newest first.
pub(crate) fn transactions(db: &Database, session: &Session) -> Result<Vec<Record<Transaction>>> {
    let query = Query::select(TRANSACTIONS)
        .order("date", Direction::Descending)
        .build();
    db.fetch(session, &query)
}

/// Invested base from the profile, zero when there is no profile yet.
pub(crate) fn invested_base(db: &Database, session: &Session) -> Result<f64> {
    let Some(uid) = session.user_id() else {
        return Ok(0.0);
    };
    let query = Query::select(PROFILES).eq(ID_FIELD, uid).build();
    match db.fetch_one::<Profile>(session, &query) {
        Ok(profile) => Ok(profile.data.total_invested_base),
        Err(Error::NotFound { .. }) => Ok(0.0),
        Err(e) => Err(e),
    }
}

/// Format a currency amount the way the app shows it.
pub(crate) fn brl(amount: f64) -> String {
    format!("R$ {amount:.2}")
}
