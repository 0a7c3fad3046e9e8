//! `af version`: build version plus the storage layout it reads and writes.

use crate::config::resolve_db_path;
use crate::error::Result;
use crate::model::{OWNED_TABLES, PROFILES};
use crate::storage::schema::CURRENT_SCHEMA_VERSION;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct VersionInfo {
    name: &'static str,
    version: &'static str,
    schema_version: i32,
    tables: Vec<&'static str>,
    /// Where `af` would open its database; absent if no home dir is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<PathBuf>,
}

fn version_info(db_path: Option<&Path>) -> VersionInfo {
    let mut tables = OWNED_TABLES.to_vec();
    tables.push(PROFILES);
    VersionInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        schema_version: CURRENT_SCHEMA_VERSION,
        tables,
        database: resolve_db_path(db_path),
    }
}

/// Execute `af version`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let info = version_info(db_path.map(PathBuf::as_path));

    if json {
        return super::print_json(&info);
    }

    println!("{} {} (schema v{})", info.name, info.version.cyan(), info.schema_version);
    println!("  tables:   {}", info.tables.join(", "));
    if let Some(db) = &info.database {
        println!("  database: {}", db.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_reports_layout() {
        let info = version_info(Some(Path::new("/tmp/af-version.db")));
        assert_eq!(info.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(info.tables.len(), 5);
        assert!(info.tables.contains(&"profiles"));
        assert_eq!(info.database.as_deref(), Some(Path::new("/tmp/af-version.db")));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(json["tables"][0], "transactions");
    }
}
