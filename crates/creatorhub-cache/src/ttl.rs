//! Time-to-live policy per entity category.

use std::fmt;
use std::time::Duration;

use creatorhub_core::config::cache::TtlConfig;

/// Entity category used to pick a default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Creators,
    Posts,
    Comments,
    Likes,
    Follows,
    Trending,
    Search,
    Default,
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Creators => "creators",
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Likes => "likes",
            Self::Follows => "follows",
            Self::Trending => "trending",
            Self::Search => "search",
            Self::Default => "default",
        };
        f.write_str(name)
    }
}

/// Fixed mapping from category to TTL. Every write the coordinator makes
/// carries a TTL from this table or an explicit override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    creators: Duration,
    posts: Duration,
    comments: Duration,
    likes: Duration,
    follows: Duration,
    trending: Duration,
    search: Duration,
    default: Duration,
}

impl TtlPolicy {
    /// Build the policy from configuration. A zero entry falls back to the
    /// configured default so no category ends up unbounded.
    pub fn from_config(config: &TtlConfig) -> Self {
        let default = Duration::from_secs(config.default.max(1));
        let pick = |secs: u64| {
            if secs == 0 {
                default
            } else {
                Duration::from_secs(secs)
            }
        };

        Self {
            creators: pick(config.creators),
            posts: pick(config.posts),
            comments: pick(config.comments),
            likes: pick(config.likes),
            follows: pick(config.follows),
            trending: pick(config.trending),
            search: pick(config.search),
            default,
        }
    }

    /// TTL for a category.
    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Creators => self.creators,
            CacheCategory::Posts => self.posts,
            CacheCategory::Comments => self.comments,
            CacheCategory::Likes => self.likes,
            CacheCategory::Follows => self.follows,
            CacheCategory::Trending => self.trending,
            CacheCategory::Search => self.search,
            CacheCategory::Default => self.default,
        }
    }

    /// TTL used when a caller has no category.
    pub fn default_ttl(&self) -> Duration {
        self.default
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&TtlConfig::default())
    }
}
