//! Todo store schema steps.
//!
//! Step 1 creates the `todos` records; step 2 adds the ordered
//! `todo_children` links whose foreign keys force leaves-first writes.
//!
//! # Invariants
//! - Step numbers only grow; a shipped step is never edited.
//! - All pending steps run in one transaction, so a failed upgrade leaves
//!   the file at its previous version.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

/// (version, sql) pairs in the order they must run.
const STEPS: &[(u32, &str)] = &[
    (1, include_str!("0001_todos.sql")),
    (2, include_str!("0002_todo_children.sql")),
];

/// Schema version a fully upgraded todo store reports.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |&(version, _)| version)
}

/// Schema version currently recorded in `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - [`DbError::SchemaTooNew`] when the file is ahead of this build.
/// - [`DbError::Migration`] naming the first step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }
    if found == supported {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &(version, sql) in STEPS.iter().filter(|&&(version, _)| version > found) {
        tx.execute_batch(sql)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| {
                error!("event=db_migrate module=db status=error version={version} error={source}");
                DbError::Migration { version, source }
            })?;
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={found} to_version={supported}");
    Ok(())
}
