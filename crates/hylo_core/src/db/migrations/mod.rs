//! Schema steps for the notification store.
//!
//! 1. Community/content tables read by media selection.
//! 2. `activities` and `notifications` (one row per activity and medium).
//! 3. `job_outbox` for the transactional enqueue strategy.
//!
//! Steps are append-only; `PRAGMA user_version` holds the last applied one.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// `(version, name, sql)`, ascending by version.
const STEPS: &[(u32, &str, &str)] = &[
    (
        1,
        "community_content",
        include_str!("0001_community_content.sql"),
    ),
    (
        2,
        "activities_notifications",
        include_str!("0002_activities_notifications.sql"),
    ),
    (3, "job_outbox", include_str!("0003_job_outbox.sql")),
];

/// Highest schema version this build can produce.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _, _)| *version)
}

/// Brings `conn` up to [`latest_version`] inside one transaction.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<_> = STEPS
        .iter()
        .filter(|(version, _, _)| *version > from)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, name, sql) in pending {
        tx.execute_batch(sql)?;
        // PRAGMA does not take bound parameters.
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
        info!("event=db_migrate_step module=db status=ok version={version} name={name}");
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from} to_version={latest}");
    Ok(())
}
