//! Persistence layer: the snippet and user records, the store contracts the handlers depend
//! on, and their SQLite and in-memory implementations.

pub mod memory;
pub mod snippets;
pub mod users;

use sqlx::Error as SqlxError;
use thiserror::Error;
use time::OffsetDateTime;

use crate::auth::CredentialError;

pub use memory::{MemorySnippetStore, MemoryUserStore};
pub use snippets::{Snippet, SnippetStore, SqliteSnippetStore};
pub use users::{SqliteUserStore, User, UserStore};

/// Number of snippets returned by [`SnippetStore::latest`].
pub const LATEST_SNIPPETS_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("Database error: {0}")]
    Store(#[from] SqlxError),
    #[error("Credential error: {0}")]
    Hashing(#[from] CredentialError),
}

/// Current UTC time as unix seconds, the resolution every stored timestamp uses.
pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Whether a SQLx error is a SQLite UNIQUE (or PRIMARY KEY) constraint violation.
pub fn is_unique_violation(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => db_err
            .code()
            .map(|code| code.as_ref() == "2067" || code.as_ref() == "1555")
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether a uniqueness violation was raised by the users email constraint.
pub(crate) fn is_duplicate_email(err: &SqlxError) -> bool {
    if !is_unique_violation(err) {
        return false;
    }

    match err {
        SqlxError::Database(db_err) => db_err.message().contains("users.email"),
        _ => false,
    }
}
