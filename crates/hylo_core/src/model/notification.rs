//! Notification domain model.
//!
//! # Invariants
//! - Each `(activity, medium)` pair appears at most once.
//! - State only moves `Unsent -> Sent`; `Sent` is terminal.

use super::activity::ActivityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// Delivery channel. Ordering is the canonical media order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Medium {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "push")]
    Push,
    #[serde(rename = "in-app")]
    InApp,
}

impl Medium {
    pub const ALL: [Medium; 3] = [Medium::Email, Medium::Push, Medium::InApp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Push => "push",
            Self::InApp => "in-app",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|medium| medium.as_str() == value)
    }
}

impl Display for Medium {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of selected delivery media. May be empty.
pub type MediaSet = BTreeSet<Medium>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Unsent,
    /// Delivered at the given epoch milliseconds.
    Sent(i64),
}

/// One delivery record of an activity through one medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub activity_id: ActivityId,
    pub medium: Medium,
    pub state: NotificationState,
}

impl Notification {
    pub fn new(activity_id: ActivityId, medium: Medium) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_id,
            medium,
            state: NotificationState::Unsent,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.state, NotificationState::Sent(_))
    }
}
