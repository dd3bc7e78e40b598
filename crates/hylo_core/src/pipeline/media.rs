//! Delivery media selection for one persisted activity.
//!
//! # Invariants
//! - Only memberships in communities relevant to the activity count.
//! - New-post-only activities never get email or in-app delivery.
//! - An empty result is valid and means "no notification".

use crate::model::activity::Activity;
use crate::model::membership::{Membership, MembershipSettings};
use crate::model::notification::{MediaSet, Medium};
use crate::model::CommunityId;
use std::collections::BTreeSet;

/// Data media selection needs about one activity's reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryContext {
    /// Communities the activity's anchor belongs to.
    pub community_ids: BTreeSet<CommunityId>,
    /// Reader's active memberships, any community.
    pub memberships: Vec<Membership>,
}

impl DeliveryContext {
    /// Memberships whose community is relevant to the activity.
    pub fn relevant_memberships(&self) -> impl Iterator<Item = &Membership> {
        self.memberships
            .iter()
            .filter(|membership| self.community_ids.contains(&membership.community_id))
    }

    fn any_permits(&self, setting: impl Fn(&MembershipSettings) -> bool) -> bool {
        self.relevant_memberships()
            .any(|membership| setting(&membership.settings))
    }
}

/// Selects delivery media for `activity`.
pub fn select_media(activity: &Activity, context: &DeliveryContext) -> MediaSet {
    let mut media = MediaSet::new();
    if context.relevant_memberships().next().is_none() {
        return media;
    }

    let just_new_post = activity.is_just_new_post();

    if !just_new_post && context.any_permits(|settings| settings.send_email) {
        media.insert(Medium::Email);
    }
    if context.any_permits(|settings| settings.send_push_notifications) {
        media.insert(Medium::Push);
    }
    if !just_new_post {
        media.insert(Medium::InApp);
    }

    media
}
