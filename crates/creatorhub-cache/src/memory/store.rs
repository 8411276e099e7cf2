//! In-process bounded cache with per-entry expiry, built on moka.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;
use tracing::{debug, warn};

use creatorhub_core::config::cache::MemoryCacheConfig;

use crate::pattern::GlobPattern;

#[derive(Debug, Clone)]
struct LocalEntry {
    value: String,
    /// `None` means the entry never expires on its own.
    ttl: Option<Duration>,
}

/// Per-entry expiry: each write carries its own TTL and an overwrite
/// replaces the previous deadline instead of keeping it.
struct EntryExpiry;

impl Expiry<String, LocalEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &LocalEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &LocalEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// Process-local key/value store; the always-available fallback tier.
///
/// Operations never suspend and never fail. Reads do not extend an
/// entry's lifetime. Cloning shares the underlying storage.
#[derive(Debug, Clone)]
pub struct LocalCache {
    cache: Cache<String, LocalEntry>,
}

impl LocalCache {
    /// Create a local cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self::with_capacity(config.max_capacity)
    }

    /// Create a local cache holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { cache }
    }

    /// Store `value` under `key`, replacing any previous value and deadline.
    ///
    /// A zero `ttl` stores the entry without a deadline.
    pub fn set(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        let ttl = (!ttl.is_zero()).then_some(ttl);
        self.cache.insert(
            key.to_string(),
            LocalEntry {
                value: value.into(),
                ttl,
            },
        );
        debug!(key, ttl_ms = ttl.map(|t| t.as_millis() as u64), "Local cache set");
    }

    /// Get the value stored under `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).map(|entry| entry.value)
    }

    /// Remove `key`. Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// All live keys matching a glob where `*` is zero or more characters.
    pub fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let glob = match GlobPattern::new(pattern) {
            Ok(glob) => glob,
            Err(e) => {
                warn!(pattern, error = %e, "Invalid key pattern");
                return Vec::new();
            }
        };

        self.cache
            .iter()
            .filter(|(key, _)| glob.matches(key))
            .map(|(key, _)| key.as_ref().clone())
            .collect()
    }

    /// Remove every key matching `pattern`. Returns how many were removed.
    pub fn delete_matching(&self, pattern: &str) -> u64 {
        let keys = self.keys_matching(pattern);
        for key in &keys {
            self.cache.invalidate(key);
        }
        keys.len() as u64
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn make_cache() -> LocalCache {
        LocalCache::with_capacity(1000)
    }

    #[test]
    fn test_set_get() {
        let cache = make_cache();
        cache.set("key1", "value1", Duration::from_secs(60));
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = make_cache();
        cache.set("key2", "value2", Duration::from_secs(60));
        cache.delete("key2");
        cache.delete("key2");
        assert_eq!(cache.get("key2"), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = make_cache();
        cache.set("short", "v", Duration::from_secs(1));
        assert_eq!(cache.get("short"), Some("v".to_string()));
        sleep(Duration::from_millis(1100));
        assert_eq!(cache.get("short"), None);
    }

    #[test]
    fn test_overwrite_replaces_ttl() {
        let cache = make_cache();
        cache.set("k", "v1", Duration::from_secs(5));
        cache.set("k", "v2", Duration::from_secs(1));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
        sleep(Duration::from_millis(1500));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_overwrite_can_extend_ttl() {
        let cache = make_cache();
        cache.set("k", "v1", Duration::from_secs(1));
        cache.set("k", "v2", Duration::from_secs(60));
        sleep(Duration::from_millis(1200));
        assert_eq!(cache.get("k"), Some("v2".to_string()));
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let cache = make_cache();
        cache.set("forever", "v", Duration::ZERO);
        sleep(Duration::from_millis(50));
        assert_eq!(cache.get("forever"), Some("v".to_string()));
    }

    #[test]
    fn test_keys_matching_is_anchored() {
        let cache = make_cache();
        let ttl = Duration::from_secs(60);
        cache.set("posts:list:page=0", "a", ttl);
        cache.set("posts:list:page=1", "b", ttl);
        cache.set("post:abc", "c", ttl);
        cache.set("xposts:list:page=0", "d", ttl);

        let mut keys = cache.keys_matching("posts:list:*");
        keys.sort();
        assert_eq!(keys, vec!["posts:list:page=0", "posts:list:page=1"]);
    }

    #[test]
    fn test_delete_matching() {
        let cache = make_cache();
        let ttl = Duration::from_secs(60);
        cache.set("comments:post:1:page=0", "a", ttl);
        cache.set("comments:post:1:page=1", "b", ttl);
        cache.set("comments:post:2:page=0", "c", ttl);

        assert_eq!(cache.delete_matching("comments:post:1:*"), 2);
        assert_eq!(cache.get("comments:post:1:page=0"), None);
        assert_eq!(cache.get("comments:post:2:page=0"), Some("c".to_string()));
    }

    #[test]
    fn test_clear_and_len() {
        let cache = make_cache();
        cache.set("a", "1", Duration::from_secs(60));
        cache.set("b", "2", Duration::ZERO);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
