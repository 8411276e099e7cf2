//! Redis connection management.
//!
//! The connection is opened lazily by a background supervisor so that
//! constructing the client never blocks startup. The supervisor publishes
//! the connection state on a watch channel, retries failed connects, and
//! runs a periodic `PING` to notice lost and recovered connections.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use creatorhub_core::config::cache::RedisCacheConfig;
use creatorhub_core::error::{AppError, ErrorKind};
use creatorhub_core::result::AppResult;
use creatorhub_core::traits::cache::RemoteStatus;

/// Redis client wrapper with lazy connection and status tracking.
#[derive(Debug)]
pub struct RedisClient {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
struct Shared {
    /// Set once on the first successful connect; the manager reconnects
    /// on its own after that.
    conn: OnceCell<ConnectionManager>,
    status: watch::Sender<RemoteStatus>,
    key_prefix: String,
    command_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    connect_timeout: Duration,
    reconnect_interval: Duration,
    health_check_interval: Duration,
}

impl RedisClient {
    /// Create the client and start connecting in the background.
    ///
    /// Returns immediately with status [`RemoteStatus::Connecting`]. Only an
    /// unparsable connection URL is reported as an error. Must be called
    /// from within a Tokio runtime.
    pub fn spawn(config: &RedisCacheConfig) -> AppResult<Self> {
        let url = config.connection_url();
        info!(url = %mask_redis_url(&url), "Connecting to Redis");

        let client = Client::open(url.as_str()).map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to create Redis client", e)
        })?;

        let (status, _) = watch::channel(RemoteStatus::Connecting);
        let shared = Arc::new(Shared {
            conn: OnceCell::new(),
            status,
            key_prefix: config.key_prefix.clone(),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        });

        let timing = Timing {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            reconnect_interval: Duration::from_millis(config.reconnect_interval_ms.max(1)),
            health_check_interval: Duration::from_secs(config.health_check_interval_seconds.max(1)),
        };

        let supervisor = tokio::spawn(supervise(Arc::clone(&shared), client, timing));

        Ok(Self {
            shared,
            supervisor: Mutex::new(Some(supervisor)),
        })
    }

    /// Current connection state.
    pub fn status(&self) -> RemoteStatus {
        *self.shared.status.borrow()
    }

    /// Wait until the client is ready, up to `limit`. Returns whether it is.
    pub async fn wait_ready(&self, limit: Duration) -> bool {
        let mut rx = self.shared.status.subscribe();
        let waited = timeout(
            limit,
            rx.wait_for(|s| matches!(s, RemoteStatus::Ready | RemoteStatus::Closed)),
        )
        .await;
        match waited {
            Ok(Ok(status)) => *status == RemoteStatus::Ready,
            _ => false,
        }
    }

    /// Stop the supervisor and mark the client closed.
    pub fn shutdown(&self) {
        let handle = match self.supervisor.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        self.shared.transition(RemoteStatus::Closed);
    }

    /// Build a full key with the configured prefix.
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}{key}", self.shared.key_prefix)
    }

    /// Strip the configured prefix from a key returned by Redis.
    pub fn unprefixed_key(&self, key: &str) -> String {
        strip_prefix(&self.shared.key_prefix, key)
    }

    /// Run a command against the connection with the per-command timeout.
    ///
    /// Connection-level failures move the client to
    /// [`RemoteStatus::Reconnecting`] and are reported as
    /// [`ErrorKind::ServiceUnavailable`].
    pub async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> AppResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        self.shared.run(op, command).await
    }

    /// `PING`, regardless of the current status.
    pub async fn ping(&self) -> AppResult<()> {
        self.shared.ping().await
    }
}

impl Drop for RedisClient {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.supervisor.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

impl Shared {
    fn transition(&self, next: RemoteStatus) {
        self.status.send_if_modified(|current| {
            if *current == next || *current == RemoteStatus::Closed {
                return false;
            }
            match next {
                RemoteStatus::Ready => info!("Redis ready for operations"),
                RemoteStatus::Reconnecting => warn!("Redis connection lost, reconnecting"),
                RemoteStatus::Closed => info!("Redis connection closed"),
                RemoteStatus::Connecting => debug!("Redis connecting"),
            }
            *current = next;
            true
        });
    }

    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> AppResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self
            .conn
            .get()
            .cloned()
            .ok_or_else(|| AppError::service_unavailable("Redis connection not established"))?;

        match timeout(self.command_timeout, command(conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() => {
                self.transition(RemoteStatus::Reconnecting);
                Err(AppError::with_source(
                    ErrorKind::ServiceUnavailable,
                    format!("Redis {op} failed: {e}"),
                    e,
                ))
            }
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::Cache,
                format!("Redis {op} error: {e}"),
                e,
            )),
            Err(_) => Err(AppError::service_unavailable(format!(
                "Redis {op} timed out after {}ms",
                self.command_timeout.as_millis()
            ))),
        }
    }

    async fn ping(&self) -> AppResult<()> {
        let pong: String = self
            .run("PING", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(AppError::cache(format!("Unexpected PING reply: {pong}")))
        }
    }
}

async fn supervise(shared: Arc<Shared>, client: Client, timing: Timing) {
    loop {
        if shared.conn.get().is_none() {
            match timeout(timing.connect_timeout, ConnectionManager::new(client.clone())).await {
                Ok(Ok(conn)) => {
                    let _ = shared.conn.set(conn);
                    info!("Redis connected successfully");
                    shared.transition(RemoteStatus::Ready);
                    continue;
                }
                Ok(Err(e)) => warn!(error = %e, "Redis connection failed"),
                Err(_) => warn!(
                    timeout_ms = timing.connect_timeout.as_millis() as u64,
                    "Redis connection timed out"
                ),
            }
            tokio::time::sleep(timing.reconnect_interval).await;
            continue;
        }

        tokio::time::sleep(timing.health_check_interval).await;
        match shared.ping().await {
            Ok(()) => shared.transition(RemoteStatus::Ready),
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                shared.transition(RemoteStatus::Reconnecting);
            }
        }
    }
}

fn strip_prefix(prefix: &str, key: &str) -> String {
    key.strip_prefix(prefix).unwrap_or(key).to_string()
}

/// Mask password in Redis URL for safe logging.
pub fn mask_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
            if colon_pos >= scheme_end {
                return format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..]);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> RedisCacheConfig {
        RedisCacheConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_ms: 200,
            command_timeout_ms: 200,
            reconnect_interval_ms: 50,
            ..RedisCacheConfig::default()
        }
    }

    #[test]
    fn test_mask_redis_url() {
        assert_eq!(
            mask_redis_url("redis://:s3cret@localhost:6379/0"),
            "redis://:****@localhost:6379/0"
        );
        assert_eq!(
            mask_redis_url("redis://localhost:6379/0"),
            "redis://localhost:6379/0"
        );
    }

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("app:", "app:post:1"), "post:1");
        assert_eq!(strip_prefix("", "post:1"), "post:1");
        assert_eq!(strip_prefix("app:", "other:post:1"), "other:post:1");
    }

    #[tokio::test]
    async fn test_unreachable_server_never_ready() {
        let client = RedisClient::spawn(&unreachable_config()).unwrap();
        assert!(!client.wait_ready(Duration::from_millis(300)).await);
        assert_ne!(client.status(), RemoteStatus::Ready);

        let err = client
            .run("GET", |mut conn| async move {
                let value: Option<String> = redis::AsyncCommands::get(&mut conn, "k").await?;
                Ok(value)
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_shutdown_marks_closed() {
        let client = RedisClient::spawn(&unreachable_config()).unwrap();
        client.shutdown();
        assert_eq!(client.status(), RemoteStatus::Closed);
        assert!(!client.wait_ready(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_prefixed_key() {
        let config = RedisCacheConfig {
            key_prefix: "creatorhub:".to_string(),
            ..unreachable_config()
        };
        let client = RedisClient::spawn(&config).unwrap();
        assert_eq!(client.prefixed_key("post:1"), "creatorhub:post:1");
        assert_eq!(client.unprefixed_key("creatorhub:post:1"), "post:1");
        client.shutdown();
    }
}
