//! Mock authentication.
//!
//! There is a single configured [`Identity`]. Signing in or up persists it
//! in the session slot of the record store; [`Database::session`] reads the
//! slot back. Credentials are accepted as long as they are well formed.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::model::{to_row, Profile, OWNED_TABLES, PROFILES};
use crate::scope::{ID_FIELD, OWNER_FIELD};
use crate::storage::schema::SESSION_KEY;
use crate::storage::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Identity used when none is configured.
pub const DEFAULT_USER_ID: &str = "user-123";

/// Email used when none is configured.
pub const DEFAULT_USER_EMAIL: &str = "user@aurafin.com";

/// Slot value written by earlier clients that stored only a flag.
const LEGACY_SLOT_VALUE: &str = "true";

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new(DEFAULT_USER_ID, DEFAULT_USER_EMAIL)
    }
}

/// Who is making a call. Passed explicitly into every scoped operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    /// A session with no identity. Nothing is in scope.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    #[must_use]
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.id.as_str())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Authenticated,
    Anonymous,
}

/// Records removed by [`Database::delete_account`], per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountDeletion {
    pub removed: Vec<(String, usize)>,
}

impl AccountDeletion {
    #[must_use]
    pub fn total(&self) -> usize {
        self.removed.iter().map(|(_, n)| n).sum()
    }
}

fn check_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidArgument(format!("invalid email address: '{email}'")));
    }
    if password.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".to_string()));
    }
    Ok(())
}

impl<S: RecordStore> Database<S> {
    /// Sign up and make sure the identity has a profile.
    ///
    /// Idempotent on the profile: signing up twice leaves exactly one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed credentials, or a storage error.
    pub fn sign_up(&mut self, email: &str, password: &str) -> Result<Session> {
        let session = self.sign_in(email, password)?;

        let profile = to_row(&Profile::new(email.trim()))?;
        match self.insert(&session, PROFILES, profile) {
            Ok(_) => info!(user = %self.identity.id, "Created profile"),
            Err(Error::ProfileExists { .. }) => debug!("Profile already exists"),
            Err(e) => return Err(e),
        }

        Ok(session)
    }

    /// Sign in as the configured identity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for malformed credentials, or a storage error.
    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<Session> {
        check_credentials(email, password)?;

        let slot = serde_json::to_string(&self.identity)?;
        self.store.store_slot(SESSION_KEY, Some(&slot))?;

        info!(user = %self.identity.id, "Signed in");
        Ok(Session::authenticated(self.identity.clone()))
    }

    /// Clear the session slot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the slot cannot be cleared.
    pub fn sign_out(&mut self) -> Result<()> {
        self.store.store_slot(SESSION_KEY, None)?;
        info!("Signed out");
        Ok(())
    }

    /// The current session, as persisted in the slot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the slot cannot be read.
    pub fn session(&self) -> Result<Session> {
        let Some(raw) = self.store.load_slot(SESSION_KEY)? else {
            return Ok(Session::anonymous());
        };

        if raw == LEGACY_SLOT_VALUE {
            return Ok(Session::authenticated(self.identity.clone()));
        }

        match serde_json::from_str::<Identity>(&raw) {
            Ok(identity) => Ok(Session::authenticated(identity)),
            Err(e) => {
                warn!(error = %e, "Unreadable session slot, treating as signed out");
                Ok(Session::anonymous())
            }
        }
    }

    /// Accepted and ignored; there is no mail delivery.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `email` is not an address.
    pub fn reset_password_for_email(&self, email: &str) -> Result<()> {
        check_credentials(email, "-")?;
        debug!(email, "Password reset requested");
        Ok(())
    }

    /// Remove everything the session owns, then the profile, then sign out.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without a session, or a storage error.
    pub fn delete_account(&mut self, session: &Session) -> Result<AccountDeletion> {
        let uid = session.user_id().ok_or(Error::Unauthorized)?.to_string();
        let mut summary = AccountDeletion::default();

        for table in OWNED_TABLES {
            let n = self.delete_where(session, table, OWNER_FIELD, uid.as_str())?;
            summary.removed.push((table.to_string(), n));
        }
        let n = self.delete_where(session, PROFILES, ID_FIELD, uid.as_str())?;
        summary.removed.push((PROFILES.to_string(), n));

        self.sign_out()?;

        info!(user = %uid, removed = summary.total(), "Deleted account");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CARDS, TRANSACTIONS};
    use crate::query::Query;
    use crate::storage::{MemoryStore, SqliteStore};
    use serde_json::json;
    use tempfile::TempDir;

    fn db() -> Database<MemoryStore> {
        Database::new(MemoryStore::new(), Identity::new("u1", "u1@aurafin.com"))
    }

    #[test]
    fn test_initial_session_is_anonymous() {
        let db = db();
        let session = db.session().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.state(), AuthState::Anonymous);
    }

    #[test]
    fn test_sign_in_then_out() {
        let mut db = db();
        let s = db.sign_in("u1@aurafin.com", "secret").unwrap();
        assert_eq!(s.user_id(), Some("u1"));
        assert_eq!(db.session().unwrap(), s);

        db.sign_out().unwrap();
        assert!(!db.session().unwrap().is_authenticated());
    }

    #[test]
    fn test_sign_up_twice_leaves_one_profile() {
        let mut db = db();
        let s = db.sign_up("me@aurafin.com", "pw").unwrap();
        db.sign_up("me@aurafin.com", "pw").unwrap();

        let profiles = db.execute(&s, &Query::select(PROFILES).build()).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["id"], "u1");
        assert_eq!(profiles[0]["email"], "me@aurafin.com");
        assert_eq!(profiles[0]["nickname"], "Novo Investidor");
        assert!(profiles[0].get("user_id").is_none());
    }

    #[test]
    fn test_malformed_credentials_rejected() {
        let mut db = db();
        assert!(matches!(db.sign_in("nope", "pw"), Err(Error::InvalidArgument(_))));
        assert!(matches!(db.sign_in("a@b.c", ""), Err(Error::InvalidArgument(_))));
        assert!(!db.session().unwrap().is_authenticated());
        assert!(db.reset_password_for_email("a@b.c").is_ok());
    }

    #[test]
    fn test_legacy_flag_slot_restores_configured_identity() {
        let mut store = MemoryStore::new();
        store.store_slot(SESSION_KEY, Some("true")).unwrap();
        let db = Database::new(store, Identity::new("u7", "u7@aurafin.com"));
        assert_eq!(db.session().unwrap().user_id(), Some("u7"));
    }

    #[test]
    fn test_session_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("af.db");

        {
            let mut db = Database::open(&path, Identity::new("u1", "u1@aurafin.com")).unwrap();
            db.sign_up("u1@aurafin.com", "pw").unwrap();
        }

        let db = Database::new(SqliteStore::open(&path).unwrap(), Identity::default());
        let session = db.session().unwrap();
        assert_eq!(session.user_id(), Some("u1"));
        assert_eq!(db.execute(&session, &Query::select(PROFILES).build()).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_account_removes_only_own_records() {
        let mut db = db();
        let me = db.sign_up("u1@aurafin.com", "pw").unwrap();
        let other = Session::authenticated(Identity::new("u2", "u2@aurafin.com"));

        let row = |v: serde_json::Value| v.as_object().cloned().unwrap();
        db.insert(&me, TRANSACTIONS, row(json!({"amount": 1}))).unwrap();
        db.insert(&me, CARDS, row(json!({"name": "Visa"}))).unwrap();
        db.insert(&other, CARDS, row(json!({"name": "Theirs"}))).unwrap();

        let summary = db.delete_account(&me).unwrap();
        assert_eq!(summary.total(), 3);

        assert!(!db.session().unwrap().is_authenticated());
        assert_eq!(db.store().read(CARDS).unwrap().len(), 1);
        assert!(db.store().read(PROFILES).unwrap().is_empty());
    }

    #[test]
    fn test_delete_account_requires_session() {
        let mut db = db();
        assert!(matches!(
            db.delete_account(&Session::anonymous()),
            Err(Error::Unauthorized)
        ));
    }
}
