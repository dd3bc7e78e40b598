//! Notification repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(activity_uuid, medium)` is unique; creation is idempotent.
//! - `sent_at` is written once; sent rows are never touched again.

use super::{ensure_tables, RepoError, RepoResult};
use crate::model::activity::ActivityId;
use crate::model::notification::{Medium, Notification, NotificationId, NotificationState};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    uuid,
    activity_uuid,
    medium,
    sent_at
FROM notifications";

/// Repository interface for notification rows.
pub trait NotificationRepository {
    /// Inserts an unsent notification unless `(activity_id, medium)` exists.
    ///
    /// Returns `None` when the pair was already present.
    fn create_if_absent(
        &self,
        activity_id: ActivityId,
        medium: Medium,
    ) -> RepoResult<Option<Notification>>;
    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>>;
    /// Lists notifications for one activity in canonical media order.
    fn list_for_activity(&self, activity_id: ActivityId) -> RepoResult<Vec<Notification>>;
    /// Lists unsent notifications, oldest first.
    fn list_unsent(&self, limit: u32) -> RepoResult<Vec<Notification>>;
    /// Transitions one notification to sent.
    ///
    /// Returns `false` when it was already sent.
    fn mark_sent(&self, id: NotificationId, sent_at: i64) -> RepoResult<bool>;
}

/// SQLite-backed notification repository.
pub struct SqliteNotificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNotificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notifications"])?;
        Ok(Self { conn })
    }
}

impl NotificationRepository for SqliteNotificationRepository<'_> {
    fn create_if_absent(
        &self,
        activity_id: ActivityId,
        medium: Medium,
    ) -> RepoResult<Option<Notification>> {
        let notification = Notification::new(activity_id, medium);
        let inserted = self.conn.execute(
            "INSERT INTO notifications (uuid, activity_uuid, medium, sent_at)
             VALUES (?1, ?2, ?3, NULL)
             ON CONFLICT (activity_uuid, medium) DO NOTHING;",
            params![
                notification.id.to_string(),
                activity_id.to_string(),
                medium.as_str(),
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(notification))
    }

    fn get_notification(&self, id: NotificationId) -> RepoResult<Option<Notification>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTIFICATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_notification_row(row)?));
        }
        Ok(None)
    }

    fn list_for_activity(&self, activity_id: ActivityId) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL} WHERE activity_uuid = ?1;"
        ))?;
        let mut rows = stmt.query([activity_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_notification_row(row)?);
        }
        items.sort_by_key(|notification| notification.medium);
        Ok(items)
    }

    fn list_unsent(&self, limit: u32) -> RepoResult<Vec<Notification>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NOTIFICATION_SELECT_SQL}
             WHERE sent_at IS NULL
             ORDER BY created_at ASC, uuid ASC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([i64::from(limit)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_notification_row(row)?);
        }
        Ok(items)
    }

    fn mark_sent(&self, id: NotificationId, sent_at: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE notifications SET sent_at = ?2 WHERE uuid = ?1 AND sent_at IS NULL;",
            params![id.to_string(), sent_at],
        )?;
        if changed == 1 {
            return Ok(true);
        }

        if self.get_notification(id)?.is_none() {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(false)
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<Notification> {
    let id = parse_uuid(row.get::<_, String>("uuid")?, "notifications.uuid")?;
    let activity_id = parse_uuid(
        row.get::<_, String>("activity_uuid")?,
        "notifications.activity_uuid",
    )?;

    let medium_text: String = row.get("medium")?;
    let medium = Medium::parse(&medium_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid medium `{medium_text}` in notifications.medium"
        ))
    })?;

    let state = match row.get::<_, Option<i64>>("sent_at")? {
        Some(at) => NotificationState::Sent(at),
        None => NotificationState::Unsent,
    };

    Ok(Notification {
        id,
        activity_id,
        medium,
        state,
    })
}

fn parse_uuid(value: String, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}
