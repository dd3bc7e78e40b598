mod common;

use common::{
    add_comment, add_membership, add_post, count_rows, seed_base, DownQueue, RecordingQueue,
    COMMUNITY_A, COMMUNITY_B,
};
use hylo_core::db::open_db_in_memory;
use hylo_core::pipeline::factory;
use hylo_core::repo::notification_repo::{NotificationRepository, SqliteNotificationRepository};
use hylo_core::service::dispatch::create_notifications;
use hylo_core::{
    ActivityRepository, DispatchConfig, EnqueueOutcome, EnqueueStrategy, Medium,
    NotificationDispatcher, Reason, SqliteActivityRepository,
};
use rusqlite::TransactionBehavior;

const EMAIL_ONLY: &str = r#"{"send_email": true, "send_push_notifications": false}"#;
const EMAIL_AND_PUSH: &str = r#"{"send_email": true, "send_push_notifications": true}"#;

fn media_of(report: &hylo_core::DispatchReport, index: usize) -> Vec<Medium> {
    report.activities[index].media.iter().copied().collect()
}

#[test]
fn comment_with_email_membership_selects_email_and_in_app() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, EMAIL_ONLY);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "nice", 2_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert_eq!(report.activities.len(), 1);
    assert_eq!(media_of(&report, 0), vec![Medium::Email, Medium::InApp]);
    assert_eq!(report.notification_count(), 2);
    assert_eq!(count_rows(&conn, "notifications"), 2);

    let stored = SqliteActivityRepository::try_new(&conn)
        .unwrap()
        .get_activity(report.activities[0].activity.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.created_at, 2_000);
    assert_eq!(stored.comment_id, Some(20));
    assert!(stored.unread);
}

#[test]
fn new_post_only_activity_selects_push_only() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 2, COMMUNITY_A, EMAIL_AND_PUSH);
    let post = add_post(&conn, 10, 3, &[COMMUNITY_A], 1_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(
            &mut conn,
            vec![factory::for_new_post(&post, COMMUNITY_A, 2)],
        )
        .unwrap();

    assert_eq!(media_of(&report, 0), vec![Medium::Push]);
}

#[test]
fn same_reader_candidates_merge_into_one_activity() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 3, COMMUNITY_A, EMAIL_ONLY);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(
        &conn,
        20,
        10,
        4,
        r#"ping <a data-user-id="3">three</a>"#,
        2_000,
    );

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(
            &mut conn,
            vec![
                factory::for_comment(&comment, 3, None),
                factory::for_comment(&comment, 3, Some(Reason::Comment)),
            ],
        )
        .unwrap();

    assert_eq!(report.activities.len(), 1);
    assert_eq!(count_rows(&conn, "activities"), 1);

    let stored = SqliteActivityRepository::try_new(&conn)
        .unwrap()
        .get_activity(report.activities[0].activity.id)
        .unwrap()
        .unwrap();
    assert_eq!(
        stored.reasons.iter().collect::<Vec<_>>(),
        vec![Reason::Mention, Reason::Comment]
    );
}

#[test]
fn reader_without_relevant_membership_gets_no_notifications() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_B, EMAIL_AND_PUSH);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert!(report.activities[0].media.is_empty());
    assert_eq!(count_rows(&conn, "activities"), 1);
    assert_eq!(count_rows(&conn, "notifications"), 0);
}

#[test]
fn unreadable_settings_on_unrelated_membership_do_not_fail_dispatch() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, r#"{"send_email": true}"#);
    add_membership(&conn, 1, COMMUNITY_B, r#"{"send_email": null}"#);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "nice", 2_000);

    let queue = RecordingQueue::default();
    let report = NotificationDispatcher::new(&queue, DispatchConfig::default())
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert_eq!(media_of(&report, 0), vec![Medium::Email, Medium::InApp]);
    assert_eq!(count_rows(&conn, "activities"), 1);
}

#[test]
fn settings_flags_are_read_by_truthiness() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, r#"{"send_email": 1}"#);
    add_membership(&conn, 1, COMMUNITY_B, "not json");
    add_post(&conn, 10, 2, &[COMMUNITY_A, COMMUNITY_B], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "nice", 2_000);

    let queue = RecordingQueue::default();
    let report = NotificationDispatcher::new(&queue, DispatchConfig::default())
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert_eq!(media_of(&report, 0), vec![Medium::Email, Medium::InApp]);
}

#[test]
fn creating_notifications_twice_does_not_duplicate_rows() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, EMAIL_AND_PUSH);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();
    assert_eq!(count_rows(&conn, "notifications"), 3);

    let activity = report.activities[0].activity.clone();
    let retry = create_notifications(&conn, activity.clone()).unwrap();
    assert_eq!(retry.media.len(), 3);
    assert!(retry.notifications.is_empty());
    assert_eq!(count_rows(&conn, "notifications"), 3);

    let repo = SqliteNotificationRepository::try_new(&conn).unwrap();
    let media: Vec<Medium> = repo
        .list_for_activity(activity.id)
        .unwrap()
        .into_iter()
        .map(|notification| notification.medium)
        .collect();
    assert_eq!(media, vec![Medium::Email, Medium::Push, Medium::InApp]);
}

#[test]
fn failing_notification_insert_rolls_back_the_activity() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, EMAIL_ONLY);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);
    conn.execute_batch(
        "CREATE TRIGGER reject_notifications BEFORE INSERT ON notifications
         BEGIN
            SELECT RAISE(ABORT, 'notification insert rejected');
         END;",
    )
    .unwrap();

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let result =
        dispatcher.save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)]);

    assert!(result.is_err());
    assert_eq!(count_rows(&conn, "activities"), 0);
    assert_eq!(queue.job_count(), 0);
}

#[test]
fn invalid_candidate_aborts_whole_batch() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);
    let unanchored = hylo_core::Activity::new(5, 3, Reason::Follow, 2_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let result = dispatcher.save_for_reasons(
        &mut conn,
        vec![factory::for_comment(&comment, 1, None), unanchored],
    );

    assert!(result.is_err());
    assert_eq!(count_rows(&conn, "activities"), 0);
}

#[test]
fn delivery_job_is_enqueued_once_after_commit() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);

    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(
            &mut conn,
            vec![
                factory::for_comment(&comment, 1, None),
                factory::for_comment(&comment, 4, None),
            ],
        )
        .unwrap();

    assert_eq!(report.enqueue, EnqueueOutcome::Enqueued);
    let jobs = queue.jobs.borrow();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].data["methodName"], "sendUnsent");
}

#[test]
fn empty_batch_skips_enqueue() {
    let mut conn = open_db_in_memory().unwrap();
    let queue = RecordingQueue::default();
    let dispatcher = NotificationDispatcher::new(&queue, DispatchConfig::default());

    let report = dispatcher.save_for_reasons(&mut conn, Vec::new()).unwrap();
    assert_eq!(report.enqueue, EnqueueOutcome::Skipped);
    assert_eq!(queue.job_count(), 0);
}

#[test]
fn queue_failure_keeps_committed_rows_unsent() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, EMAIL_ONLY);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);

    let dispatcher = NotificationDispatcher::new(DownQueue, DispatchConfig::default());
    let report = dispatcher
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert!(matches!(report.enqueue, EnqueueOutcome::Failed(_)));
    let repo = SqliteNotificationRepository::try_new(&conn).unwrap();
    assert_eq!(repo.list_unsent(10).unwrap().len(), 2);
}

#[test]
fn outbox_strategy_writes_job_inside_transaction() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);
    let comment = add_comment(&conn, 20, 10, 3, "hello", 2_000);

    let queue = RecordingQueue::default();
    let config = DispatchConfig {
        enqueue_strategy: EnqueueStrategy::Outbox,
        ..DispatchConfig::default()
    };
    let dispatcher = NotificationDispatcher::new(&queue, config);
    let report = dispatcher
        .save_for_reasons(&mut conn, vec![factory::for_comment(&comment, 1, None)])
        .unwrap();

    assert!(matches!(report.enqueue, EnqueueOutcome::Outboxed(_)));
    assert_eq!(queue.job_count(), 0);
    assert_eq!(count_rows(&conn, "job_outbox"), 1);
}

#[test]
fn staged_dispatch_is_discarded_when_caller_transaction_rolls_back() {
    let mut conn = open_db_in_memory().unwrap();
    seed_base(&conn);
    add_membership(&conn, 1, COMMUNITY_A, EMAIL_ONLY);
    let post = add_post(&conn, 10, 2, &[COMMUNITY_A], 1_000);

    let queue = RecordingQueue::default();
    let config = DispatchConfig {
        enqueue_strategy: EnqueueStrategy::Outbox,
        ..DispatchConfig::default()
    };
    let dispatcher = NotificationDispatcher::new(&queue, config);
    {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();
        let pending = dispatcher
            .stage(&tx, vec![factory::for_post_mention(&post, 1)])
            .unwrap();
        assert_eq!(pending.activities().len(), 1);
        tx.rollback().unwrap();
    }

    assert_eq!(count_rows(&conn, "activities"), 0);
    assert_eq!(count_rows(&conn, "notifications"), 0);
    assert_eq!(count_rows(&conn, "job_outbox"), 0);
}
