//! Domain model for activities, notifications and the community data they
//! consume.
//!
//! # Responsibility
//! - Define canonical data structures used by the notification pipeline.
//! - Keep externally-owned entities (users, posts, comments, communities)
//!   as plain integer references.
//!
//! # Invariants
//! - Activities and notifications are identified by stable UUIDs.
//! - An activity always carries a reader, an actor and at least one reason.

pub mod activity;
pub mod content;
pub mod membership;
pub mod notification;

/// Identifier of a user owned by the surrounding application.
pub type UserId = i64;
/// Identifier of a post owned by the surrounding application.
pub type PostId = i64;
/// Identifier of a comment owned by the surrounding application.
pub type CommentId = i64;
/// Identifier of a community owned by the surrounding application.
pub type CommunityId = i64;
