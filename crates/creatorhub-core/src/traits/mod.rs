//! Core traits defined in `creatorhub-core` and implemented by other crates.

pub mod cache;

pub use cache::{RemoteCache, RemoteStatus};
