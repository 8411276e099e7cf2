//! In-memory (local tier) cache.

pub mod store;

pub use store::LocalCache;
