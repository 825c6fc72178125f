//! In-process TTL cache for decode-menu bundles.
//!
//! Keys are a deterministic concatenation of the request parameters, so
//! repeat queries for the same dish skip the fetch and retrieval stages
//! and only re-run generation. Entries expire on read.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::models::CachedBundle;

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
}

struct CacheEntry {
    bundle: CachedBundle,
    expires_at: Instant,
}

/// Deterministic cache key for a decode-menu request.
pub fn cache_key(dish_name: &str, restaurant_name: &str, location: &str, limit: usize) -> String {
    format!("decode-menu:{dish_name}:{restaurant_name}:{location}:{limit}")
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Fetch a live bundle; expired entries are removed and miss.
    pub fn get(&self, key: &str) -> Option<CachedBundle> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Some(entry.bundle.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn set(&self, key: &str, bundle: CachedBundle) {
        self.set_with_ttl(key, bundle, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: &str, bundle: CachedBundle, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                bundle,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InsightSource;

    fn bundle(dish: &str) -> CachedBundle {
        CachedBundle {
            dish_name: dish.to_string(),
            summaries: vec!["summary".to_string()],
            source: InsightSource::Hybrid,
        }
    }

    #[test]
    fn test_key_is_deterministic_concatenation() {
        assert_eq!(
            cache_key("BBQ Burger", "Smokehouse Grill", "Austin", 3),
            "decode-menu:BBQ Burger:Smokehouse Grill:Austin:3"
        );
    }

    #[test]
    fn test_set_then_get() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", bundle("BBQ Burger"));
        let hit = cache.get("k").unwrap();
        assert_eq!(hit.dish_name, "BBQ Burger");
    }

    #[test]
    fn test_miss_on_unknown_key() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn test_expired_entry_misses_and_is_removed() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set_with_ttl("k", bundle("stale"), Duration::from_secs(0));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite_refreshes_value() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("k", bundle("old"));
        cache.set("k", bundle("new"));
        assert_eq!(cache.get("k").unwrap().dish_name, "new");
        assert_eq!(cache.len(), 1);
    }
}
