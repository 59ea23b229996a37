//! Note schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step.
//! - All pending steps run in one transaction together with the
//!   `user_version` bump.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "notes_and_ordered_content",
    sql: include_str!("0001_init.sql"),
}];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Upgrades `conn` to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is newer than this build.
/// - `MigrationFailed` naming the step that broke; nothing is applied.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }
    if from == latest {
        debug!("event=db_migrate module=db status=skipped version={from}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in MIGRATIONS.iter().filter(|step| step.version > from) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::MigrationFailed {
                version: step.version,
                name: step.name,
                source,
            })?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::MIGRATIONS;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "{}", step.name);
        }
    }
}
