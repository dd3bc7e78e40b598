//! Activity construction, one function per domain event kind.
//!
//! Timestamps come from the triggering entity so history order reflects
//! when the event happened, not when it was processed.

use crate::model::activity::{Activity, Reason};
use crate::model::content::{Comment, Follow, Post};
use crate::model::{CommunityId, UserId};

/// Activity for `reader_id` about a new comment.
///
/// Without an explicit `reason`, a reader mentioned in the comment text gets
/// `Mention`, everyone else gets `Comment`.
pub fn for_comment(comment: &Comment, reader_id: UserId, reason: Option<Reason>) -> Activity {
    let reason = reason.unwrap_or_else(|| {
        if comment.mentions_user(reader_id) {
            Reason::Mention
        } else {
            Reason::Comment
        }
    });

    let mut activity = Activity::new(reader_id, comment.user_id, reason, comment.created_at);
    activity.comment_id = Some(comment.id);
    activity.post_id = Some(comment.post_id);
    activity
}

/// Activity for a reader mentioned in a post body.
pub fn for_post_mention(post: &Post, reader_id: UserId) -> Activity {
    let mut activity = Activity::new(reader_id, post.user_id, Reason::Mention, post.created_at);
    activity.post_id = Some(post.id);
    activity
}

/// Activity telling a reader someone else added them as a follower.
pub fn for_follow_add(follow: &Follow, reader_id: UserId) -> Activity {
    let actor_id = follow.added_by_id.unwrap_or(follow.user_id);
    let mut activity = Activity::new(reader_id, actor_id, Reason::FollowAdd, follow.date_added);
    activity.post_id = Some(follow.post_id);
    activity
}

/// Activity telling a post's reader that someone followed it.
pub fn for_follow(follow: &Follow, reader_id: UserId) -> Activity {
    let mut activity = Activity::new(reader_id, follow.user_id, Reason::Follow, follow.date_added);
    activity.post_id = Some(follow.post_id);
    activity
}

/// Activity telling the post author that `unfollower_id` left their post.
///
/// Unfollowing deletes the follow row, so the caller supplies the event time.
pub fn for_unfollow(post: &Post, unfollower_id: UserId, occurred_at: i64) -> Activity {
    let mut activity = Activity::new(post.user_id, unfollower_id, Reason::Unfollow, occurred_at);
    activity.post_id = Some(post.id);
    activity
}

/// Automatic notice that `post` appeared in `community_id`.
pub fn for_new_post(post: &Post, community_id: CommunityId, reader_id: UserId) -> Activity {
    let mut activity = Activity::new(reader_id, post.user_id, Reason::NewPost, post.created_at);
    activity.post_id = Some(post.id);
    activity.community_id = Some(community_id);
    activity
}
