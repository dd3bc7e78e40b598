//! Reader-facing activity history use-cases.
//!
//! # Invariants
//! - History listing never returns activities on inactive posts/comments.
//! - List limits default to 20 and clamp to 100.

use crate::model::activity::{Activity, ActivityId};
use crate::model::{CommentId, CommunityId, PostId, UserId};
use crate::repo::activity_repo::{ActivityListQuery, ActivityRepository};
use crate::repo::RepoResult;
use log::info;

const HISTORY_DEFAULT_LIMIT: u32 = 20;
const HISTORY_LIMIT_MAX: u32 = 100;

/// Use-case service over an activity repository.
pub struct ActivityService<R: ActivityRepository> {
    repo: R,
}

impl<R: ActivityRepository> ActivityService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn find(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        self.repo.get_activity(id)
    }

    /// Lists a reader's visible history, optionally within one community.
    pub fn history(
        &self,
        reader_id: UserId,
        community_id: Option<CommunityId>,
        unread_only: bool,
        limit: Option<u32>,
        offset: u32,
    ) -> RepoResult<Vec<Activity>> {
        self.repo.list_for_reader(&ActivityListQuery {
            reader_id,
            community_id,
            unread_only,
            limit: Some(normalize_history_limit(limit)),
            offset,
        })
    }

    pub fn unread_count(&self, reader_id: UserId) -> RepoResult<u64> {
        self.repo.unread_count_for_reader(reader_id)
    }

    pub fn mark_read(&self, id: ActivityId) -> RepoResult<()> {
        self.repo.mark_read(id)
    }

    pub fn mark_all_read(&self, reader_id: UserId) -> RepoResult<usize> {
        self.repo.mark_all_read(reader_id)
    }

    /// Drops activities (and their notifications) for a removed comment.
    pub fn remove_for_comment(&self, comment_id: CommentId) -> RepoResult<usize> {
        let removed = self.repo.remove_for_comment(comment_id)?;
        info!(
            "event=activity_remove module=activity status=ok anchor=comment removed={}",
            removed
        );
        Ok(removed)
    }

    /// Drops activities (and their notifications) for a removed post.
    pub fn remove_for_post(&self, post_id: PostId) -> RepoResult<usize> {
        let removed = self.repo.remove_for_post(post_id)?;
        info!(
            "event=activity_remove module=activity status=ok anchor=post removed={}",
            removed
        );
        Ok(removed)
    }
}

/// Normalizes a history page size.
pub fn normalize_history_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => HISTORY_DEFAULT_LIMIT,
        Some(value) if value > HISTORY_LIMIT_MAX => HISTORY_LIMIT_MAX,
        Some(value) => value,
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_history_limit;

    #[test]
    fn history_limit_defaults_and_clamps() {
        assert_eq!(normalize_history_limit(None), 20);
        assert_eq!(normalize_history_limit(Some(0)), 20);
        assert_eq!(normalize_history_limit(Some(7)), 7);
        assert_eq!(normalize_history_limit(Some(500)), 100);
    }
}
