//! Cache coordinator: one read/write/invalidate API over both tiers.
//!
//! Reads try the remote tier first when it is usable and return a remote
//! hit immediately; the local tier is consulted only on a remote miss or
//! failure. Writes always land in the local tier and are mirrored to the
//! remote tier when it is usable. Remote failures are logged and never
//! change the outcome of an operation.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use creatorhub_core::config::cache::CacheConfig;
use creatorhub_core::context::ExecutionContext;
use creatorhub_core::error::AppError;
use creatorhub_core::result::AppResult;
use creatorhub_core::traits::cache::{RemoteCache, RemoteStatus};

use crate::invalidation::{InvalidationEvent, InvalidationReport, PatternOutcome};
use crate::keys;
use crate::memory::LocalCache;
use crate::stats::{CacheStats, CacheStatsSnapshot};
use crate::ttl::TtlPolicy;

/// Behaviour switches for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Purge matching local entries on pattern invalidation, not only remote.
    pub local_pattern_invalidation: bool,
    /// Serialize concurrent misses on one key so the loader runs once.
    pub coalesce_misses: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            local_pattern_invalidation: true,
            coalesce_misses: false,
        }
    }
}

/// What happened on the remote tier during a pattern purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOutcome {
    /// Matching keys were found and deleted.
    Purged { removed: u64 },
    /// The remote tier was absent or not ready; nothing was attempted.
    Unavailable,
    /// The remote tier was ready but the purge failed.
    Failed,
}

/// Result of [`CacheCoordinator::invalidate_pattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatternInvalidation {
    pub remote: RemoteOutcome,
    pub local_removed: u64,
}

impl PatternInvalidation {
    /// Whether the remote tier was purged.
    pub fn remote_invalidated(&self) -> bool {
        matches!(self.remote, RemoteOutcome::Purged { .. })
    }

    /// Keys removed from the remote tier.
    pub fn remote_removed(&self) -> u64 {
        match self.remote {
            RemoteOutcome::Purged { removed } => removed,
            _ => 0,
        }
    }
}

/// Two-tier cache front end.
#[derive(Debug)]
pub struct CacheCoordinator {
    local: LocalCache,
    remote: Option<Arc<dyn RemoteCache>>,
    context: ExecutionContext,
    ttl: TtlPolicy,
    options: CoordinatorOptions,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
    stats: CacheStats,
}

impl CacheCoordinator {
    /// Create a coordinator over the local tier only.
    pub fn new(local: LocalCache, ttl: TtlPolicy) -> Self {
        Self {
            local,
            remote: None,
            context: ExecutionContext::Server,
            ttl,
            options: CoordinatorOptions::default(),
            in_flight: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Attach a remote tier. It is only used when `context` allows it.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteCache>, context: ExecutionContext) -> Self {
        self.remote = Some(remote);
        self.context = context;
        self
    }

    /// Override behaviour switches.
    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a coordinator from configuration.
    ///
    /// The Redis tier is created only for a server context with Redis
    /// enabled; it connects in the background, so this returns at once.
    pub fn from_config(config: &CacheConfig) -> AppResult<Self> {
        let local = LocalCache::new(&config.memory);
        let options = CoordinatorOptions {
            local_pattern_invalidation: config.local_pattern_invalidation,
            coalesce_misses: config.coalesce_misses,
        };
        let coordinator =
            Self::new(local, TtlPolicy::from_config(&config.ttl)).with_options(options);

        if !config.execution_context.allows_remote() || !config.redis.enabled {
            info!(
                context = %config.execution_context,
                "Remote cache disabled, using local tier only"
            );
            return Ok(Self {
                context: config.execution_context,
                ..coordinator
            });
        }

        Self::attach_redis(coordinator, config)
    }

    #[cfg(feature = "redis-backend")]
    fn attach_redis(coordinator: Self, config: &CacheConfig) -> AppResult<Self> {
        let remote = crate::redis::RedisRemoteCache::spawn(&config.redis)?;
        Ok(coordinator.with_remote(Arc::new(remote), config.execution_context))
    }

    #[cfg(not(feature = "redis-backend"))]
    fn attach_redis(coordinator: Self, config: &CacheConfig) -> AppResult<Self> {
        warn!("Redis requested but the redis-backend feature is disabled");
        Ok(Self {
            context: config.execution_context,
            ..coordinator
        })
    }

    /// The remote tier, if it may be used right now.
    fn active_remote(&self) -> Option<&dyn RemoteCache> {
        if !self.context.allows_remote() {
            return None;
        }
        self.remote
            .as_deref()
            .filter(|remote| remote.status() == RemoteStatus::Ready)
    }

    /// A zero `ttl` means "use the category TTL for this key".
    fn effective_ttl(&self, key: &str, ttl: Duration) -> Duration {
        if ttl.is_zero() {
            self.ttl.ttl_for(keys::category_of(key))
        } else {
            ttl
        }
    }

    /// Look up the raw JSON stored under `key`.
    pub async fn read_raw(&self, key: &str) -> Option<String> {
        match self.remote_lookup(key).await {
            Some(value) => Some(value),
            None => self.local_lookup(key),
        }
    }

    /// Look up and deserialize the value stored under `key`.
    ///
    /// A remote value that does not decode as `T` is treated like a remote
    /// failure and the local tier is consulted. Only a local value that
    /// does not decode is reported as an error.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        if let Some(raw) = self.remote_lookup(key).await {
            match serde_json::from_str(&raw) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    self.stats.record_remote_error();
                    warn!(key, error = %e, "Remote cache value failed to decode, falling back to local");
                }
            }
        }

        match self.local_lookup(key) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn remote_lookup(&self, key: &str) -> Option<String> {
        let remote = self.active_remote()?;
        match remote.get(key).await {
            Ok(Some(value)) => {
                self.stats.record_remote_hit();
                debug!(key, "Remote cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                self.stats.record_remote_error();
                warn!(key, error = %e, "Remote cache read failed, falling back to local");
                None
            }
        }
    }

    fn local_lookup(&self, key: &str) -> Option<String> {
        match self.local.get(key) {
            Some(value) => {
                self.stats.record_local_hit();
                debug!(key, "Local cache hit");
                Some(value)
            }
            None => {
                self.stats.record_miss();
                debug!(key, "Cache miss");
                None
            }
        }
    }

    /// Store raw JSON under `key` in both tiers.
    pub async fn write_raw(&self, key: &str, payload: String, ttl: Duration) {
        let ttl = self.effective_ttl(key, ttl);

        if let Some(remote) = self.active_remote() {
            match remote.set_ex(key, &payload, ttl).await {
                Ok(()) => debug!(key, ttl_secs = ttl.as_secs(), "Remote cache set"),
                Err(e) => {
                    self.stats.record_remote_error();
                    warn!(key, error = %e, "Remote cache write failed");
                }
            }
        }

        self.local.set(key, payload, ttl);
    }

    /// Serialize `value` and store it under `key` in both tiers.
    ///
    /// Fails only if `value` cannot be serialized. A zero `ttl` is replaced
    /// by the TTL of the key's category.
    pub async fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> AppResult<()> {
        let payload = serde_json::to_string(value)?;
        self.write_raw(key, payload, ttl).await;
        Ok(())
    }

    /// Remove `key` from both tiers.
    pub async fn invalidate(&self, key: &str) {
        self.local.delete(key);
        if let Some(remote) = self.active_remote() {
            if let Err(e) = remote.delete(&[key.to_string()]).await {
                self.stats.record_remote_error();
                warn!(key, error = %e, "Remote cache delete failed");
            }
        }
    }

    /// Remove several keys from both tiers in one remote command.
    ///
    /// Returns whether the remote tier was reached.
    pub async fn invalidate_many(&self, keys: &[String]) -> bool {
        for key in keys {
            self.local.delete(key);
        }
        if keys.is_empty() {
            return false;
        }
        let Some(remote) = self.active_remote() else {
            return false;
        };
        match remote.delete(keys).await {
            Ok(_) => true,
            Err(e) => {
                self.stats.record_remote_error();
                warn!(count = keys.len(), error = %e, "Remote cache multi-delete failed");
                false
            }
        }
    }

    /// Remove every key matching a glob pattern.
    ///
    /// Without a usable remote tier the remote side is skipped and reported
    /// as [`RemoteOutcome::Unavailable`]. Local entries are purged as well
    /// unless `local_pattern_invalidation` is off, in which case they stay
    /// until their TTL runs out.
    pub async fn invalidate_pattern(&self, pattern: &str) -> PatternInvalidation {
        let local_removed = if self.options.local_pattern_invalidation {
            self.local.delete_matching(pattern)
        } else {
            0
        };

        let remote = match self.active_remote() {
            None => RemoteOutcome::Unavailable,
            Some(remote) => match purge_remote(remote, pattern).await {
                Ok(removed) => RemoteOutcome::Purged { removed },
                Err(e) => {
                    self.stats.record_remote_error();
                    warn!(pattern, error = %e, "Remote pattern invalidation failed");
                    RemoteOutcome::Failed
                }
            },
        };

        debug!(pattern, ?remote, local_removed, "Invalidated pattern");
        PatternInvalidation {
            remote,
            local_removed,
        }
    }

    /// Purge every pattern an entity mutation makes stale.
    pub async fn invalidate_entity(&self, event: &InvalidationEvent) -> InvalidationReport {
        let mut report = InvalidationReport::default();
        for pattern in event.patterns() {
            let result = self.invalidate_pattern(&pattern).await;
            report.outcomes.push(PatternOutcome { pattern, result });
        }
        info!(
            %event,
            remote_removed = report.remote_removed(),
            local_removed = report.local_removed(),
            complete = report.fully_invalidated(),
            "Invalidated cache for entity"
        );
        report
    }

    /// Read-through access: return the cached value for `key`, or run
    /// `loader`, cache a successful result, and return it.
    ///
    /// Loader errors are returned as-is and never cached. If the cache
    /// itself fails while reading, the loader result is returned uncached.
    /// A failed write is logged and does not affect the returned value.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.read::<T>(key).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, calling loader directly");
                return self.load(key, loader).await;
            }
        }

        // Held until this call returns or is dropped.
        let permit = if self.options.coalesce_misses {
            Some(self.acquire(key).await)
        } else {
            None
        };

        if permit.is_some() {
            if let Ok(Some(hit)) = self.read::<T>(key).await {
                return Ok(hit);
            }
        }

        let result = self.load(key, loader).await;
        if let Ok(value) = &result {
            if let Err(e) = self.write(key, value, ttl).await {
                self.stats.record_write_failure();
                warn!(key, error = %e, "Failed to cache computed value");
            }
        }
        result
    }

    async fn load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.stats.record_load();
        let result = loader().await;
        if result.is_err() {
            self.stats.record_load_failure();
            debug!(key, "Loader returned an error, not caching");
        }
        result
    }

    async fn acquire<'a>(&'a self, key: &'a str) -> InFlightPermit<'a> {
        let mut permit = InFlightPermit {
            key,
            table: &self.in_flight,
            guard: None,
        };
        let lock = Arc::clone(self.in_flight.entry(key.to_string()).or_default().value());
        permit.guard = Some(lock.lock_owned().await);
        permit
    }

    /// The local tier.
    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Status of the remote tier, or `None` when there is none.
    pub fn remote_status(&self) -> Option<RemoteStatus> {
        self.remote.as_ref().map(|remote| remote.status())
    }

    /// Wait up to `limit` for the remote tier to become usable.
    ///
    /// Returns `false` at once when there is no remote tier or the
    /// execution context forbids it.
    pub async fn wait_remote_ready(&self, limit: Duration) -> bool {
        if !self.context.allows_remote() {
            return false;
        }
        match &self.remote {
            Some(remote) => remote.wait_ready(limit).await,
            None => false,
        }
    }

    /// Round-trip a `PING` to the remote tier.
    pub async fn ping_remote(&self) -> AppResult<Duration> {
        let remote = self.active_remote().ok_or_else(|| {
            AppError::service_unavailable("Remote cache is not available")
        })?;
        let started = Instant::now();
        remote.ping().await?;
        Ok(started.elapsed())
    }

    /// The execution context the coordinator runs in.
    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Close the remote tier and drop all local entries.
    pub fn shutdown(&self) {
        if let Some(remote) = &self.remote {
            remote.close();
        }
        self.local.clear();
        info!("Cache coordinator shut down");
    }
}

/// Exclusive right to load one key. Dropping it, including when the
/// owning future is cancelled, unlocks the key and removes its table entry
/// once no other caller is waiting on it.
struct InFlightPermit<'a> {
    key: &'a str,
    table: &'a DashMap<String, Arc<Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.table
            .remove_if(self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

async fn purge_remote(remote: &dyn RemoteCache, pattern: &str) -> AppResult<u64> {
    let keys = remote.keys_matching(pattern).await?;
    if keys.is_empty() {
        return Ok(0);
    }
    remote.delete(&keys).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorhub_core::config::cache::RedisCacheConfig;

    fn local_only() -> CacheCoordinator {
        CacheCoordinator::new(LocalCache::with_capacity(100), TtlPolicy::default())
    }

    #[tokio::test]
    async fn test_write_then_read_local_only() {
        let cache = local_only();
        cache
            .write("post:abc", &serde_json::json!({"title": "hi"}), Duration::from_secs(60))
            .await
            .unwrap();
        let value: Option<serde_json::Value> = cache.read("post:abc").await.unwrap();
        assert_eq!(value, Some(serde_json::json!({"title": "hi"})));
        assert_eq!(cache.remote_status(), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_uses_key_category() {
        let cache = local_only();
        assert_eq!(
            cache.effective_ttl("post:abc", Duration::ZERO),
            Duration::from_secs(180)
        );
        assert_eq!(
            cache.effective_ttl("likes:post:abc", Duration::ZERO),
            Duration::from_secs(60)
        );
        assert_eq!(
            cache.effective_ttl("session:abc", Duration::ZERO),
            Duration::from_secs(300)
        );
        assert_eq!(
            cache.effective_ttl("post:abc", Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn test_cancelled_load_releases_in_flight_entry() {
        let cache = local_only().with_options(CoordinatorOptions {
            coalesce_misses: true,
            ..CoordinatorOptions::default()
        });

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            cache.get_or_compute("post:slow", Duration::from_secs(60), || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, String>(1u32)
            }),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(cache.in_flight.is_empty());

        let value: Result<u32, String> = cache
            .get_or_compute("post:slow", Duration::from_secs(60), || async { Ok(2) })
            .await;
        assert_eq!(value, Ok(2));
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_unserializable_value_fails_write() {
        use std::collections::HashMap;

        let cache = local_only();
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "non-string map key");
        assert!(cache.write("bad", &bad, Duration::from_secs(60)).await.is_err());
        assert_eq!(cache.local().get("bad"), None);

        let computed: Result<HashMap<Vec<u8>, String>, String> = cache
            .get_or_compute("bad", Duration::from_secs(60), || async {
                Ok(HashMap::from([(vec![2u8], "still returned".to_string())]))
            })
            .await;
        assert_eq!(computed.unwrap().len(), 1);
        assert_eq!(cache.stats().write_failures, 1);
    }

    #[tokio::test]
    async fn test_client_context_never_builds_remote() {
        let config = CacheConfig {
            execution_context: ExecutionContext::Client,
            ..CacheConfig::default()
        };
        let cache = CacheCoordinator::from_config(&config).unwrap();
        assert_eq!(cache.remote_status(), None);
        assert_eq!(cache.context(), ExecutionContext::Client);
    }

    #[tokio::test]
    async fn test_from_config_with_unreachable_redis_still_serves() {
        let config = CacheConfig {
            redis: RedisCacheConfig {
                host: "127.0.0.1".to_string(),
                port: 1,
                connect_timeout_ms: 200,
                reconnect_interval_ms: 50,
                ..RedisCacheConfig::default()
            },
            ..CacheConfig::default()
        };
        let cache = CacheCoordinator::from_config(&config).unwrap();
        assert!(!cache.wait_remote_ready(Duration::from_millis(100)).await);

        let value: Result<u32, String> = cache
            .get_or_compute("trending:topics", Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(value, Ok(7));
        assert_eq!(cache.local().get("trending:topics"), Some("7".to_string()));

        cache.shutdown();
        assert_eq!(cache.remote_status(), Some(RemoteStatus::Closed));
    }
}
