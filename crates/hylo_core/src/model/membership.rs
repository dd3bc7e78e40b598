//! Community membership as consumed by media selection.

use super::{CommunityId, UserId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Per-community notification preferences stored as JSON on the membership.
///
/// Flags are read by truthiness: `null`, `false`, `0` and `""` (or a missing
/// key) disable a medium, any other value enables it. Unknown keys are
/// ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipSettings {
    #[serde(default, deserialize_with = "truthy")]
    pub send_email: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub send_push_notifications: bool,
}

impl MembershipSettings {
    /// Parses a stored settings document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// One active membership of a user in a community.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub settings: MembershipSettings,
}
