//! Activity domain model.
//!
//! # Responsibility
//! - Describe "something happened that a reader should be told about".
//! - Own the reason set and its merge semantics.
//!
//! # Invariants
//! - `reasons` is never empty and never holds duplicates.
//! - Exactly one anchor resolves per activity: post, then comment, then
//!   community. Comment activities also carry the comment's post.
//! - `created_at` is inherited from the triggering entity.

use super::{CommentId, CommunityId, PostId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for persisted activities.
pub type ActivityId = Uuid;

/// Why an activity was generated for its reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reason {
    /// The reader was mentioned in a post or comment.
    Mention,
    /// Someone commented on a post the reader follows.
    Comment,
    /// The reader was added as a follower by someone else.
    FollowAdd,
    /// Someone followed the reader's post.
    Follow,
    /// Someone stopped following the reader's post.
    Unfollow,
    /// Automatic notice that a post appeared in one of the reader's communities.
    NewPost,
}

impl Reason {
    /// Stable string id stored in activity `meta`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mention => "mention",
            Self::Comment => "comment",
            Self::FollowAdd => "followAdd",
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::NewPost => "newPost",
        }
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-empty, duplicate-free reason set that remembers encounter order.
///
/// Equality and merging are set semantics; iteration follows the order in
/// which reasons were first seen so history renders them predictably.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Reason>", into = "Vec<Reason>")]
pub struct Reasons(Vec<Reason>);

impl Reasons {
    /// Creates a set holding one reason.
    pub fn single(reason: Reason) -> Self {
        Self(vec![reason])
    }

    /// Builds a set from encounter-ordered reasons, dropping duplicates.
    ///
    /// Returns `None` for an empty input.
    pub fn from_ordered(reasons: impl IntoIterator<Item = Reason>) -> Option<Self> {
        let mut out = Vec::new();
        for reason in reasons {
            if !out.contains(&reason) {
                out.push(reason);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(Self(out))
        }
    }

    /// Adds one reason; returns `false` when it was already present.
    pub fn insert(&mut self, reason: Reason) -> bool {
        if self.0.contains(&reason) {
            return false;
        }
        self.0.push(reason);
        true
    }

    /// Unions `other` into this set, keeping this set's order first.
    pub fn union(mut self, other: &Reasons) -> Self {
        self.union_with(other);
        self
    }

    /// In-place form of [`Reasons::union`].
    pub fn union_with(&mut self, other: &Reasons) {
        for reason in other.iter() {
            self.insert(reason);
        }
    }

    pub fn contains(&self, reason: Reason) -> bool {
        self.0.contains(&reason)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Reason> + '_ {
        self.0.iter().copied()
    }

    /// Order-insensitive view for comparisons.
    pub fn to_set(&self) -> BTreeSet<Reason> {
        self.0.iter().copied().collect()
    }

    /// Returns whether every reason is an automatic new-post notice.
    pub fn is_new_post_only(&self) -> bool {
        self.0.iter().all(|reason| *reason == Reason::NewPost)
    }
}

impl PartialEq for Reasons {
    fn eq(&self, other: &Self) -> bool {
        self.to_set() == other.to_set()
    }
}

impl Eq for Reasons {}

impl TryFrom<Vec<Reason>> for Reasons {
    type Error = ActivityValidationError;

    fn try_from(value: Vec<Reason>) -> Result<Self, Self::Error> {
        Self::from_ordered(value).ok_or(ActivityValidationError::EmptyReasons)
    }
}

impl From<Reasons> for Vec<Reason> {
    fn from(value: Reasons) -> Self {
        value.0
    }
}

/// JSON document persisted in `activities.meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMeta {
    pub reasons: Reasons,
}

/// The entity an activity is primarily about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Post(PostId),
    Comment(CommentId),
    Community(CommunityId),
}

/// Activity validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityValidationError {
    EmptyReasons,
    MissingAnchor,
}

impl Display for ActivityValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyReasons => write!(f, "activity must carry at least one reason"),
            Self::MissingAnchor => {
                write!(f, "activity must reference a post, comment or community")
            }
        }
    }
}

impl Error for ActivityValidationError {}

/// One event-for-a-reader record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: ActivityId,
    pub reader_id: UserId,
    pub actor_id: UserId,
    pub post_id: Option<PostId>,
    pub comment_id: Option<CommentId>,
    pub community_id: Option<CommunityId>,
    pub reasons: Reasons,
    /// Unix epoch milliseconds of the triggering event.
    pub created_at: i64,
    pub unread: bool,
}

impl Activity {
    /// Creates an unread activity with a generated id and no anchor.
    pub fn new(reader_id: UserId, actor_id: UserId, reason: Reason, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reader_id,
            actor_id,
            post_id: None,
            comment_id: None,
            community_id: None,
            reasons: Reasons::single(reason),
            created_at,
            unread: true,
        }
    }

    /// Resolves the anchoring entity in post → comment → community order.
    pub fn anchor(&self) -> Option<Anchor> {
        if let Some(post_id) = self.post_id {
            Some(Anchor::Post(post_id))
        } else if let Some(comment_id) = self.comment_id {
            Some(Anchor::Comment(comment_id))
        } else {
            self.community_id.map(Anchor::Community)
        }
    }

    /// Returns whether the only reasons are automatic new-post notices.
    pub fn is_just_new_post(&self) -> bool {
        self.reasons.is_new_post_only()
    }

    pub fn meta(&self) -> ActivityMeta {
        ActivityMeta {
            reasons: self.reasons.clone(),
        }
    }

    /// Checks the invariants that persistence relies on.
    pub fn validate(&self) -> Result<(), ActivityValidationError> {
        if self.reasons.is_empty() {
            return Err(ActivityValidationError::EmptyReasons);
        }
        if self.anchor().is_none() {
            return Err(ActivityValidationError::MissingAnchor);
        }
        Ok(())
    }
}
