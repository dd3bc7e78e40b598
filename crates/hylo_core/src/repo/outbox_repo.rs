//! Job outbox: jobs written inside the owning transaction and relayed to
//! the external queue afterwards.
//!
//! # Invariants
//! - Pending rows have `relayed_at IS NULL` and are relayed in id order.

use super::{ensure_tables, RepoError, RepoResult};
use crate::queue::{Backoff, BackoffKind, JobOptions, JobRequest};
use rusqlite::{params, Connection};
use std::time::Duration;

/// One persisted, not-yet-relayed or relayed job.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub job: JobRequest,
    pub created_at: i64,
    pub relayed_at: Option<i64>,
}

pub trait OutboxRepository {
    /// Stores a job and returns its outbox id.
    fn push(&self, job: &JobRequest) -> RepoResult<i64>;
    fn list_pending(&self, limit: u32) -> RepoResult<Vec<OutboxEntry>>;
    fn mark_relayed(&self, id: i64, relayed_at: i64) -> RepoResult<()>;
    /// Deletes relayed rows created before `cutoff` epoch ms.
    fn remove_relayed_before(&self, cutoff: i64) -> RepoResult<usize>;
}

pub struct SqliteOutboxRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOutboxRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["job_outbox"])?;
        Ok(Self { conn })
    }
}

impl OutboxRepository for SqliteOutboxRepository<'_> {
    fn push(&self, job: &JobRequest) -> RepoResult<i64> {
        let payload = serde_json::to_string(&job.data)
            .map_err(|err| RepoError::InvalidData(format!("unserializable job data: {err}")))?;
        self.conn.execute(
            "INSERT INTO job_outbox (name, payload, delay_ms, attempts, backoff_kind, backoff_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                job.name.as_str(),
                payload,
                duration_to_ms(job.options.delay),
                job.options.attempts,
                backoff_kind_to_db(job.options.backoff.kind),
                duration_to_ms(job.options.backoff.delay),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_pending(&self, limit: u32) -> RepoResult<Vec<OutboxEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, payload, delay_ms, attempts, backoff_kind, backoff_ms, created_at, relayed_at
             FROM job_outbox
             WHERE relayed_at IS NULL
             ORDER BY id ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get("id")?;
            let payload: String = row.get("payload")?;
            let data = serde_json::from_str(&payload).map_err(|err| {
                RepoError::InvalidData(format!("invalid payload in job_outbox row {id}: {err}"))
            })?;
            let kind_text: String = row.get("backoff_kind")?;
            let kind = parse_backoff_kind(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid backoff kind `{kind_text}` in job_outbox row {id}"
                ))
            })?;
            let options = JobOptions {
                delay: ms_to_duration(row.get("delay_ms")?),
                attempts: row.get("attempts")?,
                backoff: Backoff {
                    kind,
                    delay: ms_to_duration(row.get("backoff_ms")?),
                },
            };
            entries.push(OutboxEntry {
                id,
                job: JobRequest::new(row.get::<_, String>("name")?, data, options),
                created_at: row.get("created_at")?,
                relayed_at: row.get("relayed_at")?,
            });
        }
        Ok(entries)
    }

    fn mark_relayed(&self, id: i64, relayed_at: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE job_outbox SET relayed_at = ?2 WHERE id = ?1 AND relayed_at IS NULL;",
            params![id, relayed_at],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("job_outbox:{id}")));
        }
        Ok(())
    }

    fn remove_relayed_before(&self, cutoff: i64) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM job_outbox WHERE relayed_at IS NOT NULL AND created_at < ?1;",
            [cutoff],
        )?;
        Ok(removed)
    }
}

fn duration_to_ms(value: Duration) -> i64 {
    i64::try_from(value.as_millis()).unwrap_or(i64::MAX)
}

fn ms_to_duration(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or(0))
}

fn backoff_kind_to_db(kind: BackoffKind) -> &'static str {
    match kind {
        BackoffKind::Fixed => "fixed",
        BackoffKind::Exponential => "exponential",
    }
}

fn parse_backoff_kind(value: &str) -> Option<BackoffKind> {
    match value {
        "fixed" => Some(BackoffKind::Fixed),
        "exponential" => Some(BackoffKind::Exponential),
        _ => None,
    }
}
