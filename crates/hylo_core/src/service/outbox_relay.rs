//! Relays outbox rows to the external job queue.
//!
//! Delivery to the queue is at-least-once: a crash after `enqueue` but
//! before `mark_relayed` hands the same job over again on the next pass.

use crate::config::OutboxConfig;
use crate::queue::{JobQueue, QueueError};
use crate::repo::outbox_repo::{OutboxRepository, SqliteOutboxRepository};
use crate::repo::RepoResult;
use log::{error, info};
use rusqlite::Connection;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub relayed: usize,
    /// Set when the queue refused a job; that row and later ones stay pending.
    pub failure: Option<QueueError>,
}

pub struct OutboxRelay<Q: JobQueue> {
    queue: Q,
    config: OutboxConfig,
}

impl<Q: JobQueue> OutboxRelay<Q> {
    pub fn new(queue: Q, config: OutboxConfig) -> Self {
        Self { queue, config }
    }

    /// Hands up to `batch_size` pending jobs to the queue in id order.
    pub fn relay_pending(&self, conn: &Connection, now: i64) -> RepoResult<RelayReport> {
        let outbox = SqliteOutboxRepository::try_new(conn)?;
        let pending = outbox.list_pending(self.config.batch_size)?;

        let mut relayed = 0;
        for entry in pending {
            if let Err(err) = self.queue.enqueue(&entry.job) {
                error!(
                    "event=outbox_relay module=outbox status=error outbox_id={} job={} error_code=enqueue_failed error={}",
                    entry.id, entry.job.name, err
                );
                return Ok(RelayReport {
                    relayed,
                    failure: Some(err),
                });
            }
            outbox.mark_relayed(entry.id, now)?;
            relayed += 1;
        }

        info!(
            "event=outbox_relay module=outbox status=ok relayed={}",
            relayed
        );
        Ok(RelayReport {
            relayed,
            failure: None,
        })
    }

    /// Deletes relayed rows older than the configured retention.
    pub fn prune(&self, conn: &Connection, now: i64) -> RepoResult<usize> {
        let outbox = SqliteOutboxRepository::try_new(conn)?;
        let cutoff = now - i64::from(self.config.retention_days) * DAY_MS;
        let removed = outbox.remove_relayed_before(cutoff)?;
        info!(
            "event=outbox_prune module=outbox status=ok removed={}",
            removed
        );
        Ok(removed)
    }
}
