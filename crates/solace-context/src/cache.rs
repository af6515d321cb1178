// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user short-TTL cache of profile plus recent memory.
//!
//! Lookup returns the cached value while it is younger than the TTL;
//! on a miss the caller loads from the store and inserts. Two concurrent
//! misses for the same user may both load; the second insert wins, which
//! is harmless because both loads observed committed state. The committer
//! calls [`UserCache::invalidate`] after every write so the next read
//! observes the new memory pair.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use solace_core::types::{MemoryMessage, User};

/// One cache entry: the user row and their most recent memory window.
#[derive(Debug, Clone)]
pub struct CachedUser {
    pub user: User,
    pub recent_memory: Vec<MemoryMessage>,
    fetched_at: Instant,
}

/// Process-wide user cache. Safe under concurrent lookup.
pub struct UserCache {
    entries: DashMap<String, CachedUser>,
    ttl: Duration,
}

impl UserCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns the entry if it is younger than the TTL.
    pub fn get(&self, user_id: &str) -> Option<CachedUser> {
        let entry = self.entries.get(user_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.clone())
        } else {
            drop(entry);
            self.entries.remove(user_id);
            None
        }
    }

    /// Stores a freshly loaded entry.
    pub fn insert(&self, user: User, recent_memory: Vec<MemoryMessage>) {
        let id = user.id.clone();
        self.entries.insert(
            id,
            CachedUser {
                user,
                recent_memory,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drops the entry so the next lookup reloads from the store.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.remove(user_id);
    }

    /// Number of live entries (stale ones included until touched).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
