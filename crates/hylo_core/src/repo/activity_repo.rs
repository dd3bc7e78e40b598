//! Activity repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Activity::validate()` before SQL mutations.
//! - Reader listings hide activities whose post or comment is inactive.
//! - Removing activities removes their notifications in the same scope.

use super::{bool_to_int, ensure_tables, RepoError, RepoResult};
use crate::model::activity::{Activity, ActivityId, ActivityMeta};
use crate::model::{CommentId, CommunityId, PostId, UserId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    a.uuid AS uuid,
    a.reader_id AS reader_id,
    a.actor_id AS actor_id,
    a.post_id AS post_id,
    a.comment_id AS comment_id,
    a.community_id AS community_id,
    a.meta AS meta,
    a.unread AS unread,
    a.created_at AS created_at
FROM activities a";

/// Query options for a reader's activity history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityListQuery {
    pub reader_id: UserId,
    /// Only activities whose post (or comment's post) is in this community.
    pub community_id: Option<CommunityId>,
    pub unread_only: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for activity persistence.
pub trait ActivityRepository {
    /// Inserts one validated activity and returns its id.
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId>;
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Lists visible activities, newest first.
    fn list_for_reader(&self, query: &ActivityListQuery) -> RepoResult<Vec<Activity>>;
    fn unread_count_for_reader(&self, reader_id: UserId) -> RepoResult<u64>;
    fn mark_read(&self, id: ActivityId) -> RepoResult<()>;
    /// Returns how many activities flipped to read.
    fn mark_all_read(&self, reader_id: UserId) -> RepoResult<usize>;
    /// Deletes activities anchored on a comment; returns deleted count.
    fn remove_for_comment(&self, comment_id: CommentId) -> RepoResult<usize>;
    /// Deletes activities anchored on a post; returns deleted count.
    fn remove_for_post(&self, post_id: PostId) -> RepoResult<usize>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    /// Creates repository from a migrated connection or open transaction.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["activities", "notifications"])?;
        Ok(Self { conn })
    }

    fn remove_where(&self, column: &'static str, id: i64) -> RepoResult<usize> {
        self.conn.execute(
            &format!(
                "DELETE FROM notifications
                 WHERE activity_uuid IN (
                    SELECT uuid FROM activities WHERE {column} = ?1
                 );"
            ),
            [id],
        )?;
        let removed = self.conn.execute(
            &format!("DELETE FROM activities WHERE {column} = ?1;"),
            [id],
        )?;
        Ok(removed)
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId> {
        activity.validate()?;
        let meta = serde_json::to_string(&activity.meta())
            .map_err(|err| RepoError::InvalidData(format!("unserializable meta: {err}")))?;

        self.conn.execute(
            "INSERT INTO activities (
                uuid,
                reader_id,
                actor_id,
                post_id,
                comment_id,
                community_id,
                meta,
                unread,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                activity.id.to_string(),
                activity.reader_id,
                activity.actor_id,
                activity.post_id,
                activity.comment_id,
                activity.community_id,
                meta,
                bool_to_int(activity.unread),
                activity.created_at,
            ],
        )?;

        Ok(activity.id)
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE a.uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn list_for_reader(&self, query: &ActivityListQuery) -> RepoResult<Vec<Activity>> {
        let mut sql = format!(
            "{ACTIVITY_SELECT_SQL}
             LEFT JOIN comments c ON c.id = a.comment_id
             LEFT JOIN posts p ON p.id = a.post_id
             WHERE a.reader_id = ?
               AND (c.active = 1 OR c.id IS NULL)
               AND (p.active = 1 OR p.id IS NULL)"
        );
        let mut bind_values: Vec<Value> = vec![Value::Integer(query.reader_id)];

        if query.unread_only {
            sql.push_str(" AND a.unread = 1");
        }

        if let Some(community_id) = query.community_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM post_communities pc
                    WHERE pc.community_id = ?
                      AND (pc.post_id = c.post_id OR pc.post_id = p.id)
                )",
            );
            bind_values.push(Value::Integer(community_id));
        }

        sql.push_str(" ORDER BY a.created_at DESC, a.uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn unread_count_for_reader(&self, reader_id: UserId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE reader_id = ?1 AND unread = 1;",
            [reader_id],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative unread count {count}")))
    }

    fn mark_read(&self, id: ActivityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE activities SET unread = 0 WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn mark_all_read(&self, reader_id: UserId) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE activities SET unread = 0 WHERE reader_id = ?1 AND unread = 1;",
            [reader_id],
        )?;
        Ok(changed)
    }

    fn remove_for_comment(&self, comment_id: CommentId) -> RepoResult<usize> {
        self.remove_where("comment_id", comment_id)
    }

    fn remove_for_post(&self, post_id: PostId) -> RepoResult<usize> {
        self.remove_where("post_id", post_id)
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in activities.uuid"))
    })?;

    let meta_text: String = row.get("meta")?;
    let meta: ActivityMeta = serde_json::from_str(&meta_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid meta for activity {id}: {err}"))
    })?;

    let unread = match row.get::<_, i64>("unread")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid unread value `{other}` in activities.unread"
            )));
        }
    };

    let activity = Activity {
        id,
        reader_id: row.get("reader_id")?,
        actor_id: row.get("actor_id")?,
        post_id: row.get("post_id")?,
        comment_id: row.get("comment_id")?,
        community_id: row.get("community_id")?,
        reasons: meta.reasons,
        created_at: row.get("created_at")?,
        unread,
    };
    activity.validate()?;
    Ok(activity)
}
