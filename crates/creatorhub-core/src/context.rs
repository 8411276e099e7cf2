//! Execution context capability flag.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the cache layer is running.
///
/// Only server-side code may reach the shared remote cache. Client-side
/// (browser-like) contexts are restricted to the local tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Server-side execution with network access to the remote cache.
    #[default]
    Server,
    /// Client-side execution; local tier only.
    Client,
}

impl ExecutionContext {
    /// Whether the remote tier may be used from this context.
    pub fn allows_remote(self) -> bool {
        matches!(self, Self::Server)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_remote() {
        assert!(ExecutionContext::Server.allows_remote());
        assert!(!ExecutionContext::Client.allows_remote());
    }

    #[test]
    fn test_deserialize_lowercase() {
        let ctx: ExecutionContext = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(ctx, ExecutionContext::Client);
        assert_eq!(ExecutionContext::default(), ExecutionContext::Server);
    }
}
