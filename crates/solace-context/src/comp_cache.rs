// SPDX-FileCopyrightText: 2026 Solace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded LRU cache for compression results.
//!
//! Compression is deterministic, so a hit is byte-identical to a fresh
//! run. Keyed by (user, message type, complexity, model); complexity is
//! rounded to an integer step because the budget formula is insensitive
//! to sub-integer jitter.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::compressor::CompressedIntelligence;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: String,
    message_type: String,
    complexity: i64,
    model: String,
}

/// Process-wide compression cache, bounded to `capacity` entries.
pub struct CompressionCache {
    inner: Mutex<LruCache<CacheKey, CompressedIntelligence>>,
}

impl CompressionCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(
        &self,
        user_id: &str,
        message_type: &str,
        complexity: f64,
        model: &str,
    ) -> Option<CompressedIntelligence> {
        let key = Self::key(user_id, message_type, complexity, model);
        self.inner.lock().ok()?.get(&key).cloned()
    }

    pub fn put(
        &self,
        user_id: &str,
        message_type: &str,
        complexity: f64,
        model: &str,
        value: CompressedIntelligence,
    ) {
        let key = Self::key(user_id, message_type, complexity, model);
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, value);
        }
    }

    fn key(user_id: &str, message_type: &str, complexity: f64, model: &str) -> CacheKey {
        CacheKey {
            user_id: user_id.to_string(),
            message_type: message_type.to_string(),
            complexity: complexity.round() as i64,
            model: model.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abbrev::DICTIONARY_VERSION;
    use crate::compressor::Strategy;

    fn compressed(text: &str) -> CompressedIntelligence {
        CompressedIntelligence {
            text: text.to_string(),
            estimated_tokens: 1,
            budget: 100,
            strategy: Strategy::Balanced,
            fallback: false,
            dictionary_version: DICTIONARY_VERSION,
        }
    }

    #[test]
    fn hit_after_put() {
        let cache = CompressionCache::new(4);
        cache.put("u-1", "question", 6.0, "solace-chat-1", compressed("a"));
        let hit = cache.get("u-1", "question", 6.0, "solace-chat-1").unwrap();
        assert_eq!(hit.text, "a");
    }

    #[test]
    fn key_components_all_matter() {
        let cache = CompressionCache::new(8);
        cache.put("u-1", "question", 6.0, "solace-chat-1", compressed("a"));
        assert!(cache.get("u-2", "question", 6.0, "solace-chat-1").is_none());
        assert!(cache.get("u-1", "standard", 6.0, "solace-chat-1").is_none());
        assert!(cache.get("u-1", "question", 2.0, "solace-chat-1").is_none());
        assert!(cache.get("u-1", "question", 6.0, "solace-chat-pro").is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = CompressionCache::new(2);
        cache.put("u-1", "a", 1.0, "m", compressed("1"));
        cache.put("u-2", "a", 1.0, "m", compressed("2"));
        // Touch u-1 so u-2 becomes the LRU victim.
        let _ = cache.get("u-1", "a", 1.0, "m");
        cache.put("u-3", "a", 1.0, "m", compressed("3"));

        assert!(cache.get("u-1", "a", 1.0, "m").is_some());
        assert!(cache.get("u-2", "a", 1.0, "m").is_none());
        assert!(cache.get("u-3", "a", 1.0, "m").is_some());
    }

    #[test]
    fn near_identical_complexity_shares_an_entry() {
        let cache = CompressionCache::new(4);
        cache.put("u-1", "question", 6.0, "m", compressed("a"));
        assert!(cache.get("u-1", "question", 6.2, "m").is_some());
    }
}
