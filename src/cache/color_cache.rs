//! TTL cache of resolved name colors
//!
//! ## Design
//!
//! - DashMap-backed so renderers can read while the fetch worker writes
//! - Entries carry their own expiry; expiry is only noticed on access or by
//!   the periodic sweep, never refreshed proactively
//! - Member records live and die with the color entry that produced them
//! - Every `clear` bumps a generation counter. Writes computed before a clear
//!   carry the old generation and are dropped instead of landing in the
//!   freshly emptied cache.

use super::{CacheStats, ColorEntry, MemberInfo};
use crate::identity::{AuthorKey, MemberKey};
use crate::remote::PkMember;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::time::Duration;
use tokio::time::Instant;

pub struct ColorCache {
    ttl: Duration,

    colors: DashMap<AuthorKey, ColorEntry>,

    members: DashMap<MemberKey, MemberInfo>,

    /// Author keys the remote service attributed to the local account.
    /// Append-only, survives `clear`.
    owned: DashSet<AuthorKey>,

    /// Held for reading by writers and for writing by `clear`, so a write
    /// checked against a generation cannot interleave with a clear.
    generation: RwLock<u64>,
}

impl ColorCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            colors: DashMap::new(),
            members: DashMap::new(),
            owned: DashSet::new(),
            generation: RwLock::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        *self.generation.read()
    }

    /// Unexpired entry for `key`, if any.
    pub fn get(&self, key: &AuthorKey) -> Option<ColorEntry> {
        let now = Instant::now();
        self.colors
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value().clone())
    }

    /// Stores `color` for `key`, expiring one TTL from now.
    pub fn put(&self, key: AuthorKey, color: impl Into<String>) -> ColorEntry {
        let entry = ColorEntry {
            color: color.into(),
            expires_at: Instant::now() + self.ttl,
        };
        self.colors.insert(key, entry.clone());
        entry
    }

    /// Stores the result of a lookup started at `generation`.
    ///
    /// Returns `None` without writing anything if the cache was cleared since.
    pub fn store(
        &self,
        generation: u64,
        key: AuthorKey,
        color: impl Into<String>,
        member: Option<PkMember>,
    ) -> Option<ColorEntry> {
        let current = self.generation.read();
        if *current != generation {
            return None;
        }

        if let Some(member) = member {
            self.members.insert(
                key.member_key(),
                MemberInfo {
                    member,
                    fetched_at: Utc::now(),
                },
            );
        }

        Some(self.put(key, color))
    }

    /// Drops the entry for `key` and its member record.
    pub fn invalidate(&self, key: &AuthorKey) -> bool {
        let removed = self.colors.remove(key).is_some();
        if removed {
            self.members.remove(&key.member_key());
        }
        removed
    }

    /// Drops every color and member record. Ownership is kept.
    pub fn clear(&self) {
        let mut generation = self.generation.write();
        *generation += 1;
        self.colors.clear();
        self.members.clear();
    }

    /// Removes expired entries along with their member records and returns
    /// how many color entries were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.colors.retain(|key, entry| {
            if entry.is_expired_at(now) {
                expired.push(key.member_key());
                false
            } else {
                true
            }
        });

        for member_key in &expired {
            self.members.remove(member_key);
        }

        expired.len()
    }

    pub fn member_info(&self, key: &MemberKey) -> Option<MemberInfo> {
        self.members.get(key).map(|entry| entry.value().clone())
    }

    pub fn mark_owned(&self, key: AuthorKey) {
        self.owned.insert(key);
    }

    pub fn is_owned(&self, key: &AuthorKey) -> bool {
        self.owned.contains(key)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            color_count: self.colors.len(),
            member_count: self.members.len(),
            owned_count: self.owned.len(),
            generation: self.generation(),
        }
    }
}
