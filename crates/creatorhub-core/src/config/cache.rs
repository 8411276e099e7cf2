//! Cache layer configuration.

use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;

/// Top-level cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Where the cache runs; `client` never touches Redis.
    #[serde(default)]
    pub execution_context: ExecutionContext,
    /// Also purge matching local entries on pattern invalidation.
    #[serde(default = "default_true")]
    pub local_pattern_invalidation: bool,
    /// Let concurrent misses on the same key share a single loader call.
    #[serde(default)]
    pub coalesce_misses: bool,
    /// Default TTL per entity category.
    #[serde(default)]
    pub ttl: TtlConfig,
    /// Redis (remote tier) configuration.
    #[serde(default)]
    pub redis: RedisCacheConfig,
    /// In-process (local tier) configuration.
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            execution_context: ExecutionContext::default(),
            local_pattern_invalidation: true,
            coalesce_misses: false,
            ttl: TtlConfig::default(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

/// Default time-to-live in seconds for each entity category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    /// Creator profiles and creator lists.
    #[serde(default = "default_creators_ttl")]
    pub creators: u64,
    /// Posts and post lists.
    #[serde(default = "default_posts_ttl")]
    pub posts: u64,
    /// Comment threads.
    #[serde(default = "default_comments_ttl")]
    pub comments: u64,
    /// Like lists and counts.
    #[serde(default = "default_likes_ttl")]
    pub likes: u64,
    /// Follower and following lists.
    #[serde(default = "default_follows_ttl")]
    pub follows: u64,
    /// Trending posts and topics.
    #[serde(default = "default_trending_ttl")]
    pub trending: u64,
    /// Search results.
    #[serde(default = "default_search_ttl")]
    pub search: u64,
    /// Anything without a dedicated category.
    #[serde(default = "default_ttl")]
    pub default: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            creators: default_creators_ttl(),
            posts: default_posts_ttl(),
            comments: default_comments_ttl(),
            likes: default_likes_ttl(),
            follows: default_follows_ttl(),
            trending: default_trending_ttl(),
            search: default_search_ttl(),
            default: default_ttl(),
        }
    }
}

/// Redis cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Whether the remote tier is configured at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Redis host.
    #[serde(default = "default_redis_host")]
    pub host: String,
    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
    /// Logical database index.
    #[serde(default)]
    pub db: i64,
    /// Prefix applied to every key sent to Redis.
    #[serde(default)]
    pub key_prefix: String,
    /// Connection timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-command timeout in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Delay between failed connection attempts in milliseconds.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
    /// Interval between `PING` health checks in seconds.
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,
}

impl RedisCacheConfig {
    /// Build the `redis://` connection URL from the individual settings.
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => format!(
                "redis://:{password}@{}:{}/{}",
                self.host, self.port, self.db
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_redis_host(),
            port: default_redis_port(),
            password: None,
            db: 0,
            key_prefix: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            health_check_interval_seconds: default_health_check_interval(),
        }
    }
}

/// In-memory cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries held in process.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_creators_ttl() -> u64 {
    300
}

fn default_posts_ttl() -> u64 {
    180
}

fn default_comments_ttl() -> u64 {
    120
}

fn default_likes_ttl() -> u64 {
    60
}

fn default_follows_ttl() -> u64 {
    300
}

fn default_trending_ttl() -> u64 {
    600
}

fn default_search_ttl() -> u64 {
    180
}

fn default_ttl() -> u64 {
    300
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_command_timeout_ms() -> u64 {
    5_000
}

fn default_reconnect_interval_ms() -> u64 {
    1_000
}

fn default_health_check_interval() -> u64 {
    5
}

fn default_max_capacity() -> u64 {
    10_000
}
