//! Read-only lookups into posts and comments.

use super::{ensure_tables, RepoResult};
use crate::model::{CommentId, CommunityId, PostId};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Content lookups needed to place an activity in its communities.
pub trait ContentRepository {
    /// Communities a post was published to.
    fn communities_for_post(&self, post_id: PostId) -> RepoResult<BTreeSet<CommunityId>>;
    /// Post a comment belongs to, if the comment exists.
    fn post_for_comment(&self, comment_id: CommentId) -> RepoResult<Option<PostId>>;
}

/// SQLite-backed content reader.
pub struct SqliteContentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["posts", "comments", "post_communities"])?;
        Ok(Self { conn })
    }
}

impl ContentRepository for SqliteContentRepository<'_> {
    fn communities_for_post(&self, post_id: PostId) -> RepoResult<BTreeSet<CommunityId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT community_id FROM post_communities WHERE post_id = ?1;")?;
        let mut rows = stmt.query([post_id])?;
        let mut ids = BTreeSet::new();
        while let Some(row) = rows.next()? {
            ids.insert(row.get(0)?);
        }
        Ok(ids)
    }

    fn post_for_comment(&self, comment_id: CommentId) -> RepoResult<Option<PostId>> {
        let post_id = self
            .conn
            .query_row(
                "SELECT post_id FROM comments WHERE id = ?1;",
                [comment_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(post_id)
    }
}
