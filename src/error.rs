//! Rich diagnostic error types for anchor-day.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so operators know what went wrong and
//! how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for anchor-day.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum AnchorError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] crate::seeds::SeedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Paths(#[from] crate::paths::PathError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(anchor::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("sqlite error: {source}")]
    #[diagnostic(
        code(anchor::store::sqlite),
        help(
            "The database rejected the statement. If this happens on startup, \
             the database file may belong to a newer version of anchor-day."
        )
    )]
    Sqlite {
        #[source]
        source: rusqlite::Error,
    },

    #[error("{entity} already exists: {key}")]
    #[diagnostic(
        code(anchor::store::conflict),
        help("A row with the same unique key is already present.")
    )]
    Conflict { entity: &'static str, key: String },

    #[error("{entity} not found: {key}")]
    #[diagnostic(
        code(anchor::store::not_found),
        help("The requested row does not exist or belongs to another user.")
    )]
    NotFound { entity: &'static str, key: String },

    #[error("database schema version {found} is newer than supported version {supported}")]
    #[diagnostic(
        code(anchor::store::schema_version),
        help("Upgrade anchor-day, or point it at a different database file.")
    )]
    SchemaVersion { found: i64, supported: i64 },

    #[error("database lock poisoned")]
    #[diagnostic(
        code(anchor::store::poisoned),
        help("A previous request panicked while holding the database. Restart the server.")
    )]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Sqlite { source }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("malformed session token")]
    #[diagnostic(
        code(anchor::auth::malformed),
        help("The session cookie was not produced by this server. Sign in again.")
    )]
    MalformedToken,

    #[error("session signature mismatch")]
    #[diagnostic(
        code(anchor::auth::bad_signature),
        help(
            "The token was signed with a different secret. This happens after the \
             session secret is rotated; sign in again."
        )
    )]
    BadSignature,

    #[error("session expired at {expires}")]
    #[diagnostic(code(anchor::auth::expired), help("Sign in again."))]
    Expired { expires: String },

    #[error("invalid password hash format")]
    #[diagnostic(
        code(anchor::auth::bad_hash),
        help("The stored hash must look like `pbkdf2-sha256$<rounds>$<salt>$<hash>`.")
    )]
    BadPasswordHash,

    #[error("session secret too short: {len} bytes (need at least {min})")]
    #[diagnostic(
        code(anchor::auth::short_secret),
        help("Set `session_secret` in config.toml or ANCHOR_SESSION_SECRET to a longer value.")
    )]
    ShortSecret { len: usize, min: usize },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A form field failed validation. The message is user-facing.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(anchor::validation), help("Correct the `{field}` field and resubmit."))]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(anchor::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(anchor::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(anchor::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: {value}")]
    #[diagnostic(
        code(anchor::config::invalid),
        help("Check the environment variable or config entry for {key}.")
    )]
    Invalid { key: &'static str, value: String },
}

/// Convenience result type.
pub type AnchorResult<T> = std::result::Result<T, AnchorError>;
