//! # creatorhub-core
//!
//! Core crate for CreatorHub. Contains the unified error system,
//! configuration schemas, the remote cache trait, and the execution
//! context flag shared by the cache layer and its consumers.
//!
//! This crate has **no** internal dependencies on other CreatorHub crates.

pub mod config;
pub mod context;
pub mod error;
pub mod result;
pub mod traits;

pub use context::ExecutionContext;
pub use error::AppError;
pub use result::AppResult;
