//! Configuration management.
//!
//! This module resolves where AuraFin keeps its data and which identity the
//! mock auth signs in as.
//!
//! # Layout
//!
//! Everything lives under `~/.aurafin/`:
//! - **Database**: `~/.aurafin/data/aurafin.db`
//! - **Objects**: `~/.aurafin/objects/<bucket>/...` (uploaded receipts)
//! - **Settings**: `~/.aurafin/config.json` (AI and messaging collaborators)

mod settings;

pub use settings::{
    config_path, load_config, load_config_from, save_config, save_config_to, AiConfig,
    AiSettings, AuraFinConfig, MessagingConfig, MessagingSettings,
};

use crate::auth::{Identity, DEFAULT_USER_EMAIL, DEFAULT_USER_ID};
use std::path::{Path, PathBuf};

/// Get the global AuraFin directory, `~/.aurafin/`.
#[must_use]
pub fn global_aurafin_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".aurafin"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `AF_TEST_DB=1` (or any non-empty value
/// other than `0`/`false`). It redirects the database to an isolated file.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("AF_TEST_DB").is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path, `~/.aurafin/test/aurafin.db`.
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_aurafin_dir().map(|dir| dir.join("test").join("aurafin.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `AF_TEST_DB` environment variable → uses test database
/// 3. `AURAFIN_DB` environment variable
/// 4. Global location: `~/.aurafin/data/aurafin.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("AURAFIN_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_aurafin_dir().map(|dir| dir.join("data").join("aurafin.db"))
}

/// Resolve the object storage root.
///
/// `AURAFIN_OBJECTS` overrides; otherwise objects sit next to the database
/// file, in an `objects/` directory beside its parent.
#[must_use]
pub fn resolve_objects_root(db_path: &Path) -> PathBuf {
    if let Ok(root) = std::env::var("AURAFIN_OBJECTS") {
        if !root.trim().is_empty() {
            return PathBuf::from(root);
        }
    }

    let data_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    data_dir
        .parent()
        .unwrap_or(data_dir)
        .join("objects")
}

/// Resolve the identity the mock auth signs in as.
///
/// Priority: `AURAFIN_USER_ID` / `AURAFIN_USER_EMAIL` > built-in defaults.
#[must_use]
pub fn resolve_identity() -> Identity {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    Identity::new(
        var("AURAFIN_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
        var("AURAFIN_USER_EMAIL").unwrap_or_else(|| DEFAULT_USER_EMAIL.to_string()),
    )
}
