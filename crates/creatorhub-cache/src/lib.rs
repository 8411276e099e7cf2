//! # creatorhub-cache
//!
//! Two-tier response cache for CreatorHub:
//!
//! - **local**: bounded in-process cache with per-entry expiry, built on
//!   [moka](https://crates.io/crates/moka); always available.
//! - **remote**: shared Redis cache using the [redis](https://crates.io/crates/redis)
//!   crate; used when configured and ready, from server-side code only.
//!
//! [`CacheCoordinator`] combines both behind read/write/invalidate and a
//! read-through `get_or_compute`. [`keys`] builds deterministic keys and
//! [`InvalidationEvent`] maps entity mutations to the key patterns they
//! make stale.

pub mod coordinator;
pub mod invalidation;
pub mod keys;
pub mod memory;
pub mod pattern;
#[cfg(feature = "redis-backend")]
pub mod redis;
pub mod stats;
pub mod ttl;

pub use coordinator::{CacheCoordinator, CoordinatorOptions, PatternInvalidation, RemoteOutcome};
pub use invalidation::{InvalidationEvent, InvalidationReport};
pub use memory::LocalCache;
pub use stats::CacheStatsSnapshot;
pub use ttl::{CacheCategory, TtlPolicy};
