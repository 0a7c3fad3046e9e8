//! Error types for AuraFin.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found/auth, 4=validation, etc.)
//! - Retryability flags for scripted callers
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use thiserror::Error;

/// Result type alias for AuraFin operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Not Found / Access (exit 3)
    NotFound,
    Unauthorized,

    // Validation (exit 4)
    InvalidArgument,
    AlreadyExists,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Upstream collaborators (exit 9)
    MalformedUpstream,
    UpstreamError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::MalformedUpstream => "MALFORMED_UPSTREAM",
            Self::UpstreamError => "UPSTREAM_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::NotFound | Self::Unauthorized => 3,
            Self::InvalidArgument | Self::AlreadyExists => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::MalformedUpstream | Self::UpstreamError => 9,
        }
    }

    /// Whether a caller should retry, possibly with corrected input.
    ///
    /// True for validation errors and transient upstream failures. False for
    /// not-found, authorization, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::DatabaseError | Self::UpstreamError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in AuraFin operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No in-scope record matched. Also used when the record exists but
    /// belongs to another identity, so foreign ids look like missing ones.
    #[error("Record not found in {table}: {detail}")]
    NotFound { table: String, detail: String },

    #[error("Unauthorized: no active session")]
    Unauthorized,

    #[error("Webhook verification failed")]
    VerificationFailed,

    #[error("Profile already exists: {id}")]
    ProfileExists { id: String },

    #[error("Field '{field}' is assigned by the store and cannot be changed")]
    ProtectedField { field: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a `NotFound` on a field/value match.
    pub fn not_found(table: &str, field: &str, value: impl std::fmt::Display) -> Self {
        Self::NotFound {
            table: table.to_string(),
            detail: format!("{field} = {value}"),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Unauthorized | Self::VerificationFailed => ErrorCode::Unauthorized,
            Self::ProfileExists { .. } => ErrorCode::AlreadyExists,
            Self::ProtectedField { .. } | Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::MalformedUpstream(_) => ErrorCode::MalformedUpstream,
            Self::Upstream(_) => ErrorCode::UpstreamError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Unauthorized => Some(
                "No signed-in identity.\n  \
                 Sign in:  af auth sign-in <email> --password <password>\n  \
                 Sign up:  af auth sign-up <email> --password <password>"
                    .to_string(),
            ),

            Self::NotFound { table, .. } => Some(format!(
                "No matching record visible to this session. Use `af query {table}` to list records."
            )),

            Self::ProfileExists { .. } => Some(
                "Each identity has exactly one profile. Use `af update profiles id <id> '<json>'`."
                    .to_string(),
            ),

            Self::ProtectedField { field } => Some(format!(
                "Remove '{field}' from the patch; id, user_id and created_at are assigned on insert."
            )),

            Self::Config(_) => Some(
                "Check ~/.aurafin/config.json or the AURAFIN_* environment variables".to_string(),
            ),

            Self::InvalidArgument(msg) => invalid_argument_hint(msg).map(str::to_string),

            Self::VerificationFailed
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::MalformedUpstream(_)
            | Self::Upstream(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

/// Hints keyed on the message prefixes produced by the normalizers.
fn invalid_argument_hint(msg: &str) -> Option<&'static str> {
    if msg.starts_with("invalid type ") {
        Some("Valid transaction types: income, expense")
    } else if msg.starts_with("invalid status ") {
        Some("Valid statuses: paid, pending. Synonyms: done→paid, open→pending")
    } else if msg.starts_with("invalid expense type ") || msg.starts_with("invalid expense tab ") {
        Some("Valid expense types: fixed, variable")
    } else if msg.starts_with("invalid month ") || msg.starts_with("month must be ") {
        Some("Months use the YYYY-MM format, e.g. 2024-05")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_and_unauthorized_share_exit_code() {
        let nf = Error::not_found("cards", "id", "c1");
        assert_eq!(nf.error_code(), ErrorCode::NotFound);
        assert_eq!(nf.exit_code(), Error::Unauthorized.exit_code());
        assert_eq!(nf.to_string(), "Record not found in cards: id = c1");
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let json = Error::Unauthorized.to_structured_json();
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
        assert_eq!(json["error"]["exit_code"], 3);
        assert_eq!(json["error"]["retryable"], false);
        assert!(json["error"]["hint"].as_str().unwrap().contains("af auth sign-in"));
    }

    #[test]
    fn test_invalid_argument_hints_follow_the_message() {
        let hint = |msg: &str| Error::InvalidArgument(msg.to_string()).hint();

        assert!(hint("invalid type 'x' (did you mean 'expense'?)").unwrap().contains("income"));
        assert!(hint("invalid status 'x'").unwrap().contains("pending"));
        assert!(hint("invalid expense type 'x'").unwrap().contains("fixed"));
        assert!(hint("invalid month '2024-13', expected YYYY-MM").unwrap().contains("YYYY-MM"));

        // Messages that merely mention these words get no hint.
        assert!(hint("query targets 'cards' but the record type is stored in 'transactions'")
            .is_none());
        assert!(hint("expected field=value, got 'status'").is_none());
        assert!(hint("invalid file name 'monthly.pdf'").is_none());
    }

    #[test]
    fn test_malformed_upstream_has_no_hint() {
        let err = Error::MalformedUpstream("missing date".into());
        assert_eq!(err.error_code().as_str(), "MALFORMED_UPSTREAM");
        assert!(err.hint().is_none());
        assert!(err.to_structured_json()["error"].get("hint").is_none());
    }
}
