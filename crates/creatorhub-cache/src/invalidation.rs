//! Which cached keys go stale when an entity changes.
//!
//! Each mutation maps to an ordered list of glob patterns. The coordinator
//! purges them one by one; a failed purge does not stop the rest.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::coordinator::PatternInvalidation;

/// An entity mutation that makes cached reads stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// A creator was created, updated, or deleted.
    Creator { creator_id: Uuid },
    /// A post was created, updated, or deleted.
    Post { post_id: Uuid },
    /// A like, follow, comment, or share by `user_id`, optionally on a post.
    Social { user_id: Uuid, post_id: Option<Uuid> },
}

impl InvalidationEvent {
    /// The key patterns to purge, in order.
    pub fn patterns(&self) -> Vec<String> {
        match *self {
            Self::Creator { creator_id } => vec![
                format!("creator:{creator_id}"),
                "creator:username:*".to_string(),
                "creators:list:*".to_string(),
                "creators:search:*".to_string(),
                format!("posts:creator:{creator_id}:*"),
            ],
            Self::Post { post_id } => vec![
                format!("post:{post_id}"),
                "posts:list:*".to_string(),
                "posts:trending:*".to_string(),
                "posts:search:*".to_string(),
                format!("likes:post:{post_id}"),
                format!("comments:post:{post_id}:*"),
            ],
            Self::Social { user_id, post_id } => {
                let mut patterns = vec![
                    format!("likes:user:{user_id}"),
                    format!("followers:user:{user_id}:*"),
                    format!("following:user:{user_id}:*"),
                ];
                if let Some(post_id) = post_id {
                    patterns.push(format!("likes:post:{post_id}"));
                    patterns.push(format!("comments:post:{post_id}:*"));
                }
                patterns
            }
        }
    }
}

impl fmt::Display for InvalidationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creator { creator_id } => write!(f, "creator:{creator_id}"),
            Self::Post { post_id } => write!(f, "post:{post_id}"),
            Self::Social {
                user_id,
                post_id: Some(post_id),
            } => write!(f, "social:{user_id}:{post_id}"),
            Self::Social {
                user_id,
                post_id: None,
            } => write!(f, "social:{user_id}"),
        }
    }
}

/// Outcome of purging one pattern.
#[derive(Debug, Clone, Serialize)]
pub struct PatternOutcome {
    pub pattern: String,
    #[serde(flatten)]
    pub result: PatternInvalidation,
}

/// Outcome of purging every pattern for one event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvalidationReport {
    pub outcomes: Vec<PatternOutcome>,
}

impl InvalidationReport {
    /// Whether every pattern was purged from the remote tier.
    pub fn fully_invalidated(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.remote_invalidated())
    }

    /// Total keys removed from the remote tier.
    pub fn remote_removed(&self) -> u64 {
        self.outcomes.iter().map(|o| o.result.remote_removed()).sum()
    }

    /// Total keys removed from the local tier.
    pub fn local_removed(&self) -> u64 {
        self.outcomes.iter().map(|o| o.result.local_removed).sum()
    }
}
