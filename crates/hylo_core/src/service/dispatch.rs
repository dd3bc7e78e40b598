//! Activity persistence and notification dispatch.
//!
//! # Responsibility
//! - Merge candidate activities, persist them and create one notification
//!   per selected medium.
//! - Schedule the delivery job once the owning transaction has committed.
//!
//! # Invariants
//! - Activities and their notifications are written in one transaction;
//!   any error rolls back the whole batch.
//! - Notification creation is idempotent per `(activity, medium)`.
//! - With `EnqueueStrategy::AfterCommit` the queue is only called after
//!   commit, so a crash in between leaves notifications unsent.

use crate::config::{DispatchConfig, EnqueueStrategy};
use crate::model::activity::{Activity, Anchor};
use crate::model::notification::{MediaSet, Notification};
use crate::model::CommunityId;
use crate::pipeline::media::{select_media, DeliveryContext};
use crate::pipeline::merge::merge_by_reader;
use crate::queue::{JobQueue, JobRequest, QueueError};
use crate::repo::activity_repo::{ActivityRepository, SqliteActivityRepository};
use crate::repo::content_repo::{ContentRepository, SqliteContentRepository};
use crate::repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
use crate::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use crate::repo::outbox_repo::{OutboxRepository, SqliteOutboxRepository};
use crate::repo::{RepoError, RepoResult};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures that abort a dispatch batch.
#[derive(Debug)]
pub enum DispatchError {
    Repo(RepoError),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "notification dispatch failed: {err}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for DispatchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for DispatchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// One persisted activity with the notifications created for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedActivity {
    pub activity: Activity,
    pub media: MediaSet,
    /// Newly created rows; pairs that already existed are not repeated.
    pub notifications: Vec<Notification>,
}

/// What happened to the delivery job after commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Handed to the queue after commit.
    Enqueued,
    /// Written to the outbox inside the transaction.
    Outboxed(i64),
    /// Nothing to deliver.
    Skipped,
    /// The queue refused the job; notifications stay unsent.
    Failed(QueueError),
}

/// Staged work that still needs its post-commit step.
#[derive(Debug)]
#[must_use = "call NotificationDispatcher::complete after committing the transaction"]
pub struct PendingDispatch {
    activities: Vec<DispatchedActivity>,
    job: Option<JobRequest>,
    outbox_id: Option<i64>,
}

impl PendingDispatch {
    pub fn activities(&self) -> &[DispatchedActivity] {
        &self.activities
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub activities: Vec<DispatchedActivity>,
    pub enqueue: EnqueueOutcome,
}

impl DispatchReport {
    pub fn notification_count(&self) -> usize {
        self.activities
            .iter()
            .map(|dispatched| dispatched.notifications.len())
            .sum()
    }
}

/// Persists activities with their notifications and schedules delivery.
pub struct NotificationDispatcher<Q: JobQueue> {
    queue: Q,
    config: DispatchConfig,
}

impl<Q: JobQueue> NotificationDispatcher<Q> {
    pub fn new(queue: Q, config: DispatchConfig) -> Self {
        Self { queue, config }
    }

    /// Merges, persists and dispatches one event's candidates in a single
    /// transaction, then completes the post-commit step.
    pub fn save_for_reasons(
        &self,
        conn: &mut Connection,
        candidates: Vec<Activity>,
    ) -> DispatchResult<DispatchReport> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pending = self.stage(&tx, candidates)?;
        tx.commit()?;
        Ok(self.complete(pending))
    }

    /// Writes merged activities and notifications inside `tx`.
    ///
    /// The caller commits `tx` (usually together with the triggering write)
    /// and then passes the result to [`Self::complete`]. Dropping `tx`
    /// without commit discards everything staged here.
    pub fn stage(
        &self,
        tx: &Transaction<'_>,
        candidates: Vec<Activity>,
    ) -> DispatchResult<PendingDispatch> {
        let started_at = Instant::now();
        let candidate_count = candidates.len();
        let merged = merge_by_reader(candidates);

        let activities = SqliteActivityRepository::try_new(tx)?;
        let mut dispatched = Vec::with_capacity(merged.len());
        for activity in merged {
            activities.create_activity(&activity)?;
            dispatched.push(create_notifications(tx, activity)?);
        }

        let mut pending = PendingDispatch {
            activities: dispatched,
            job: None,
            outbox_id: None,
        };
        if !pending.activities.is_empty() {
            let job = JobRequest::send_unsent_notifications(self.config.job);
            match self.config.enqueue_strategy {
                EnqueueStrategy::AfterCommit => pending.job = Some(job),
                EnqueueStrategy::Outbox => {
                    let outbox = SqliteOutboxRepository::try_new(tx)?;
                    pending.outbox_id = Some(outbox.push(&job)?);
                }
            }
        }

        info!(
            "event=dispatch_stage module=dispatch status=ok candidates={} activities={} notifications={} duration_ms={}",
            candidate_count,
            pending.activities.len(),
            pending
                .activities
                .iter()
                .map(|dispatched| dispatched.notifications.len())
                .sum::<usize>(),
            started_at.elapsed().as_millis()
        );
        Ok(pending)
    }

    /// Post-commit step: enqueue the delivery job when one is due.
    ///
    /// Queue failures do not undo committed rows; they are logged and
    /// reported as `EnqueueOutcome::Failed`.
    pub fn complete(&self, pending: PendingDispatch) -> DispatchReport {
        let enqueue = match (pending.job, pending.outbox_id) {
            (_, Some(outbox_id)) => EnqueueOutcome::Outboxed(outbox_id),
            (Some(job), None) => match self.queue.enqueue(&job) {
                Ok(()) => {
                    info!(
                        "event=dispatch_enqueue module=dispatch status=ok job={}",
                        job.name
                    );
                    EnqueueOutcome::Enqueued
                }
                Err(err) => {
                    error!(
                        "event=dispatch_enqueue module=dispatch status=error job={} error_code=enqueue_failed error={}",
                        job.name, err
                    );
                    EnqueueOutcome::Failed(err)
                }
            },
            (None, None) => EnqueueOutcome::Skipped,
        };

        DispatchReport {
            activities: pending.activities,
            enqueue,
        }
    }
}

/// Creates missing notifications for one persisted activity.
///
/// Safe to call again for the same activity: existing `(activity, medium)`
/// rows are skipped.
pub fn create_notifications(
    conn: &Connection,
    activity: Activity,
) -> DispatchResult<DispatchedActivity> {
    let memberships = SqliteMembershipRepository::try_new(conn)?;
    let content = SqliteContentRepository::try_new(conn)?;
    let notifications_repo = SqliteNotificationRepository::try_new(conn)?;

    let context = load_delivery_context(&activity, &memberships, &content)?;
    let media = select_media(&activity, &context);
    if media.is_empty() {
        debug!(
            "event=dispatch_media module=dispatch status=ok activity={} media=none",
            activity.id
        );
    }

    let mut notifications = Vec::with_capacity(media.len());
    for medium in &media {
        if let Some(notification) = notifications_repo.create_if_absent(activity.id, *medium)? {
            notifications.push(notification);
        }
    }

    Ok(DispatchedActivity {
        activity,
        media,
        notifications,
    })
}

/// Loads the reader memberships and anchor communities for `activity`.
pub fn load_delivery_context(
    activity: &Activity,
    memberships: &impl MembershipRepository,
    content: &impl ContentRepository,
) -> RepoResult<DeliveryContext> {
    Ok(DeliveryContext {
        community_ids: community_ids_for(activity, content)?,
        memberships: memberships.active_memberships_for_user(activity.reader_id)?,
    })
}

/// Communities relevant to an activity, resolved through its anchor.
pub fn community_ids_for(
    activity: &Activity,
    content: &impl ContentRepository,
) -> RepoResult<BTreeSet<CommunityId>> {
    match activity.anchor() {
        Some(Anchor::Post(post_id)) => content.communities_for_post(post_id),
        Some(Anchor::Comment(comment_id)) => match content.post_for_comment(comment_id)? {
            Some(post_id) => content.communities_for_post(post_id),
            None => Ok(BTreeSet::new()),
        },
        Some(Anchor::Community(community_id)) => Ok(BTreeSet::from([community_id])),
        None => Ok(BTreeSet::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::community_ids_for;
    use crate::model::activity::{Activity, Reason};
    use crate::model::{CommentId, CommunityId, PostId};
    use crate::repo::content_repo::ContentRepository;
    use crate::repo::RepoResult;
    use std::collections::BTreeSet;

    struct FixedContent;

    impl ContentRepository for FixedContent {
        fn communities_for_post(&self, post_id: PostId) -> RepoResult<BTreeSet<CommunityId>> {
            Ok(BTreeSet::from([post_id * 10, post_id * 10 + 1]))
        }

        fn post_for_comment(&self, comment_id: CommentId) -> RepoResult<Option<PostId>> {
            Ok((comment_id == 7).then_some(3))
        }
    }

    #[test]
    fn comment_anchor_resolves_through_its_post() {
        let mut activity = Activity::new(1, 2, Reason::Comment, 0);
        activity.comment_id = Some(7);
        let ids = community_ids_for(&activity, &FixedContent).unwrap();
        assert_eq!(ids, BTreeSet::from([30, 31]));
    }

    #[test]
    fn missing_comment_yields_no_communities() {
        let mut activity = Activity::new(1, 2, Reason::Comment, 0);
        activity.comment_id = Some(8);
        assert!(community_ids_for(&activity, &FixedContent).unwrap().is_empty());
    }

    #[test]
    fn community_anchor_is_its_own_scope() {
        let mut activity = Activity::new(1, 2, Reason::NewPost, 0);
        activity.community_id = Some(42);
        let ids = community_ids_for(&activity, &FixedContent).unwrap();
        assert_eq!(ids, BTreeSet::from([42]));
    }
}
