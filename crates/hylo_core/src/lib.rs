//! Activity and notification core for Hylo communities.
//!
//! Turns domain events (comments, mentions, follows, new posts) into
//! per-reader activities, decides delivery media from membership settings,
//! and records one notification per medium alongside the activity in a
//! single SQLite transaction.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod queue;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DispatchConfig, EnqueueStrategy, OutboxConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::activity::{Activity, ActivityId, ActivityMeta, Anchor, Reason, Reasons};
pub use model::content::{extract_mentions, Comment, Follow, Post};
pub use model::membership::{Membership, MembershipSettings};
pub use model::notification::{MediaSet, Medium, Notification, NotificationId, NotificationState};
pub use model::{CommentId, CommunityId, PostId, UserId};
pub use pipeline::media::{select_media, DeliveryContext};
pub use pipeline::merge::merge_by_reader;
pub use queue::{JobOptions, JobQueue, JobRequest, QueueError};
pub use repo::activity_repo::{ActivityListQuery, ActivityRepository, SqliteActivityRepository};
pub use repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
pub use repo::{RepoError, RepoResult};
pub use service::activity_service::ActivityService;
pub use service::dispatch::{
    DispatchError, DispatchReport, DispatchResult, DispatchedActivity, EnqueueOutcome,
    NotificationDispatcher, PendingDispatch,
};
pub use service::outbox_relay::{OutboxRelay, RelayReport};

use std::time::{SystemTime, UNIX_EPOCH};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
