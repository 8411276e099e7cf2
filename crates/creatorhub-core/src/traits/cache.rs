//! Remote cache trait for the shared, networked cache tier.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Connection state of a remote cache client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    /// The first connection attempt is in progress.
    Connecting,
    /// Connected and answering commands.
    Ready,
    /// A previously ready connection was lost and is being re-established.
    Reconnecting,
    /// The client has been shut down.
    Closed,
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Ready => write!(f, "ready"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Trait for the shared remote cache tier (Redis or a test fake).
///
/// Values are UTF-8 JSON strings. Callers must check [`RemoteCache::status`]
/// before issuing commands; commands issued while not [`RemoteStatus::Ready`]
/// fail fast instead of queueing.
#[async_trait]
pub trait RemoteCache: Send + Sync + fmt::Debug + 'static {
    /// Current connection state.
    fn status(&self) -> RemoteStatus;

    /// Shorthand for `status() == Ready`.
    fn is_ready(&self) -> bool {
        self.status() == RemoteStatus::Ready
    }

    /// Wait until the client is ready, up to `limit`. Returns whether it is.
    async fn wait_ready(&self, _limit: Duration) -> bool {
        self.is_ready()
    }

    /// `GET key`. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// `SETEX key ttl value`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// `DEL key...`. Returns the number of keys removed.
    async fn delete(&self, keys: &[String]) -> AppResult<u64>;

    /// `KEYS pattern`. `*` matches zero or more characters.
    async fn keys_matching(&self, pattern: &str) -> AppResult<Vec<String>>;

    /// `PING`.
    async fn ping(&self) -> AppResult<()>;

    /// Release the connection and stop background work.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(RemoteStatus::Ready.to_string(), "ready");
        assert_eq!(RemoteStatus::Reconnecting.to_string(), "reconnecting");
    }
}
