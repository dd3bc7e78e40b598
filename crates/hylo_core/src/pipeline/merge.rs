//! Per-reader merge of candidate activities for one triggering event.
//!
//! Fields follow encounter order: the first candidate seeds the result and
//! later candidates overwrite actor/anchor fields they carry. Reasons are a
//! set union, so only the field overwrite is order-sensitive.

use crate::model::activity::Activity;
use crate::model::UserId;
use std::collections::HashMap;

/// Collapses candidates to one activity per distinct reader.
///
/// Output is in first-seen reader order.
pub fn merge_by_reader(candidates: impl IntoIterator<Item = Activity>) -> Vec<Activity> {
    let mut merged: Vec<Activity> = Vec::new();
    let mut index_by_reader: HashMap<UserId, usize> = HashMap::new();

    for candidate in candidates {
        match index_by_reader.get(&candidate.reader_id) {
            Some(&index) => absorb(&mut merged[index], candidate),
            None => {
                index_by_reader.insert(candidate.reader_id, merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}

fn absorb(current: &mut Activity, later: Activity) {
    current.actor_id = later.actor_id;
    if later.post_id.is_some() {
        current.post_id = later.post_id;
    }
    if later.comment_id.is_some() {
        current.comment_id = later.comment_id;
    }
    if later.community_id.is_some() {
        current.community_id = later.community_id;
    }
    current.reasons.union_with(&later.reasons);
}
