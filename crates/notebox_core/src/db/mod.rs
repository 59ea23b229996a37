//! SQLite bootstrap for the note store.
//!
//! # Responsibility
//! - Open file or in-memory connections configured for note storage.
//! - Bring the note schema up to date before any caller sees the connection.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A failed migration leaves the database at its previous version.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Connection or schema bootstrap failure.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build; it is never downgraded.
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
    /// One migration step failed and was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "note database schema v{db_version} is newer than this build (v{latest_supported})"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "migration v{version} `{name}` failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
