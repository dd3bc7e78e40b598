//! Read-only access to community memberships.
//!
//! # Invariants
//! - A membership whose settings cannot be read counts with every medium
//!   disabled; it never fails the caller.

use super::{ensure_tables, RepoResult};
use crate::model::membership::{Membership, MembershipSettings};
use crate::model::UserId;
use log::warn;
use rusqlite::Connection;

/// Membership lookups consulted by media selection.
pub trait MembershipRepository {
    /// Active memberships of `user_id` across all communities.
    fn active_memberships_for_user(&self, user_id: UserId) -> RepoResult<Vec<Membership>>;
}

/// SQLite-backed membership reader.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["memberships"])?;
        Ok(Self { conn })
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn active_memberships_for_user(&self, user_id: UserId) -> RepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, community_id, settings
             FROM memberships
             WHERE user_id = ?1
               AND active = 1
             ORDER BY community_id ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            let community_id: i64 = row.get("community_id")?;
            let settings_text: Option<String> = row.get("settings")?;
            let settings = match settings_text.as_deref().map(MembershipSettings::from_json) {
                Some(Ok(settings)) => settings,
                Some(Err(err)) => {
                    warn!(
                        "event=membership_settings module=repo status=error user_id={} community_id={} error_code=invalid_settings error={}",
                        user_id, community_id, err
                    );
                    MembershipSettings::default()
                }
                None => MembershipSettings::default(),
            };
            memberships.push(Membership {
                user_id: row.get("user_id")?,
                community_id,
                settings,
            });
        }
        Ok(memberships)
    }
}
