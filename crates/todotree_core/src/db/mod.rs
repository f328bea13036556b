//! Todo store database: connection setup and schema versions.
//!
//! # Responsibility
//! - Hand out SQLite connections that already carry the `todos` and
//!   `todo_children` tables.
//! - Report which schema step failed when an upgrade cannot be applied.
//!
//! # Invariants
//! - The store schema version lives in `PRAGMA user_version`.
//! - `SqliteTodoRepository::try_new` refuses connections that skipped
//!   [`open_db`]/[`open_db_in_memory`].

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or upgrade the todo store.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected a connection or pragma call.
    Sqlite(rusqlite::Error),
    /// File was written by a newer build; opening it would risk the data.
    SchemaTooNew { found: u32, supported: u32 },
    /// Schema step `version` failed; the upgrade was rolled back as a whole.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "todo store schema version {found} is newer than this build supports ({supported})"
            ),
            Self::Migration { version, source } => {
                write!(f, "todo store schema step {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
