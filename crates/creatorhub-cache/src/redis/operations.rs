//! Redis implementation of the remote cache tier.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use creatorhub_core::config::cache::RedisCacheConfig;
use creatorhub_core::error::AppError;
use creatorhub_core::result::AppResult;
use creatorhub_core::traits::cache::{RemoteCache, RemoteStatus};

use super::client::RedisClient;

/// Redis-backed remote cache.
#[derive(Debug)]
pub struct RedisRemoteCache {
    client: RedisClient,
}

impl RedisRemoteCache {
    /// Wrap an existing client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Create a client from configuration and start connecting.
    pub fn spawn(config: &RedisCacheConfig) -> AppResult<Self> {
        Ok(Self::new(RedisClient::spawn(config)?))
    }

    /// The underlying client.
    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn ensure_ready(&self) -> AppResult<()> {
        match self.client.status() {
            RemoteStatus::Ready => Ok(()),
            other => Err(AppError::service_unavailable(format!(
                "Redis is not ready (status: {other})"
            ))),
        }
    }
}

#[async_trait]
impl RemoteCache for RedisRemoteCache {
    fn status(&self) -> RemoteStatus {
        self.client.status()
    }

    async fn wait_ready(&self, limit: Duration) -> bool {
        self.client.wait_ready(limit).await
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.ensure_ready()?;
        let full_key = self.client.prefixed_key(key);
        self.client
            .run("GET", |mut conn| async move {
                let value: Option<String> = conn.get(&full_key).await?;
                Ok(value)
            })
            .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.ensure_ready()?;
        let full_key = self.client.prefixed_key(key);
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        self.client
            .run("SETEX", |mut conn| async move {
                let _: () = conn.set_ex(&full_key, value, seconds).await?;
                Ok(())
            })
            .await
    }

    async fn delete(&self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.ensure_ready()?;
        let full_keys: Vec<String> = keys.iter().map(|k| self.client.prefixed_key(k)).collect();
        let removed = self
            .client
            .run("DEL", |mut conn| async move {
                let removed: u64 = conn.del(&full_keys).await?;
                Ok(removed)
            })
            .await?;
        debug!(requested = keys.len(), removed, "Deleted Redis keys");
        Ok(removed)
    }

    async fn keys_matching(&self, pattern: &str) -> AppResult<Vec<String>> {
        self.ensure_ready()?;
        let full_pattern = self.client.prefixed_key(pattern);
        let keys: Vec<String> = self
            .client
            .run("KEYS", |mut conn| async move {
                redis::cmd("KEYS")
                    .arg(&full_pattern)
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(keys
            .iter()
            .map(|key| self.client.unprefixed_key(key))
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        self.client.ping().await
    }

    fn close(&self) {
        self.client.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use creatorhub_core::error::ErrorKind;

    fn unreachable() -> RedisRemoteCache {
        RedisRemoteCache::spawn(&RedisCacheConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: 200,
            reconnect_interval_ms: 50,
            ..RedisCacheConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_commands_fail_fast_when_not_ready() {
        let remote = unreachable();
        assert!(!remote.is_ready());

        let err = remote.get("post:1").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

        let err = remote
            .set_ex("post:1", "{}", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());

        let err = remote.keys_matching("posts:*").await.unwrap_err();
        assert!(err.is_unavailable());

        remote.close();
    }

    #[tokio::test]
    async fn test_empty_delete_is_noop() {
        let remote = unreachable();
        assert_eq!(remote.delete(&[]).await.unwrap(), 0);
        remote.close();
    }
}
