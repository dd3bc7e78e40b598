//! Triggering entities handed to the activity factory.
//!
//! These are read-only snapshots of rows owned by the surrounding
//! application. Mentions are carried inside rich text as
//! `<a data-user-id="42">` anchors.

use super::{CommentId, PostId, UserId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

// The id must end at a quote, whitespace, `>` or `/`, so `"12abc"` is ignored.
static MENTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-user-id\s*=\s*["']?(\d+)(?:["'\s>/]|$)"#).expect("valid mention regex")
});

/// Returns the user ids mentioned in rich text, sorted and deduplicated.
pub fn extract_mentions(text: &str) -> BTreeSet<UserId> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().parse::<UserId>().ok())
        .collect()
}

/// Post snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    /// Author.
    pub user_id: UserId,
    pub description: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Comment snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    /// Commenter.
    pub user_id: UserId,
    pub text: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Comment {
    pub fn mentions(&self) -> BTreeSet<UserId> {
        extract_mentions(&self.text)
    }

    pub fn mentions_user(&self, user_id: UserId) -> bool {
        self.mentions().contains(&user_id)
    }
}

/// Post-follow snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Follow {
    pub post_id: PostId,
    /// The follower.
    pub user_id: UserId,
    /// Who added the follower; `None` when they followed on their own.
    pub added_by_id: Option<UserId>,
    /// Unix epoch milliseconds.
    pub date_added: i64,
}
