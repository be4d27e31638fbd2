//! Entries and statistics for the color cache.

use crate::remote::PkMember;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// A resolved name color and the moment it stops being valid.
///
/// Entries are immutable; a refresh replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorEntry {
    /// `#rrggbb`
    pub color: String,

    pub expires_at: Instant,
}

impl ColorEntry {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Last remote member data seen for a handle + avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    pub member: PkMember,

    /// Wall-clock time of the lookup that produced this record
    pub fetched_at: DateTime<Utc>,
}

/// Snapshot of cache contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Color entries currently held, expired or not
    pub color_count: usize,

    /// Member records currently held
    pub member_count: usize,

    /// Author keys confirmed to belong to the local account
    pub owned_count: usize,

    /// Bumped by every `clear`
    pub generation: u64,
}
