//! Delayed-job queue seam.
//!
//! # Responsibility
//! - Describe jobs handed to the external delayed-job system.
//! - Define the `JobQueue` capability the core enqueues through.
//!
//! # Invariants
//! - Jobs carry a trigger signal only; workers re-read state from storage.
//! - Queue storage, workers and retry execution live outside this crate.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Job name used for `className.methodName` style invocations.
pub const CLASS_METHOD_JOB: &str = "classMethod";
/// Class that owns unsent-notification delivery.
pub const NOTIFICATION_CLASS: &str = "Notification";
/// Method that delivers every unsent notification.
pub const SEND_UNSENT_METHOD: &str = "sendUnsent";

/// Retry delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backoff {
    pub kind: BackoffKind,
    #[serde(with = "duration_ms")]
    pub delay: Duration,
}

/// Scheduling options applied to every enqueued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    /// Wait before the first attempt.
    #[serde(with = "duration_ms")]
    pub delay: Duration,
    pub attempts: u32,
    pub backoff: Backoff,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(5_000),
            attempts: 3,
            backoff: Backoff {
                kind: BackoffKind::Exponential,
                delay: Duration::from_millis(20_000),
            },
        }
    }
}

/// One job ready to hand to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,
    pub data: Value,
    pub options: JobOptions,
}

impl JobRequest {
    pub fn new(name: impl Into<String>, data: Value, options: JobOptions) -> Self {
        Self {
            name: name.into(),
            data,
            options,
        }
    }

    /// Builds a `classMethod` job; keys in `extra` are merged into the data.
    pub fn class_method(
        class_name: &str,
        method_name: &str,
        extra: Map<String, Value>,
        options: JobOptions,
    ) -> Self {
        let mut data = extra;
        data.insert("className".to_string(), json!(class_name));
        data.insert("methodName".to_string(), json!(method_name));
        Self::new(CLASS_METHOD_JOB, Value::Object(data), options)
    }

    /// The job that asks workers to deliver unsent notifications.
    pub fn send_unsent_notifications(options: JobOptions) -> Self {
        Self::class_method(NOTIFICATION_CLASS, SEND_UNSENT_METHOD, Map::new(), options)
    }
}

/// Queue-side failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue refused the job (bad name/payload).
    Rejected(String),
    /// The queue backend could not be reached.
    Unavailable(String),
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(message) => write!(f, "job rejected: {message}"),
            Self::Unavailable(message) => write!(f, "job queue unavailable: {message}"),
        }
    }
}

impl Error for QueueError {}

/// External delayed-job system.
pub trait JobQueue {
    fn enqueue(&self, job: &JobRequest) -> Result<(), QueueError>;
}

impl<Q: JobQueue + ?Sized> JobQueue for &Q {
    fn enqueue(&self, job: &JobRequest) -> Result<(), QueueError> {
        (**self).enqueue(job)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
