//! Core types, configuration, and error handling for relboard.
//!
//! This crate provides the shared foundation used by the other relboard crates:
//! - [`RelboardError`]: unified error type using `thiserror`
//! - [`RelboardConfig`]: configuration loaded from `.relboard.toml`
//! - Shared types: [`Repository`], [`Release`], [`Author`], [`ReleaseStatus`],
//!   [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{CacheConfig, GitHubConfig, RelboardConfig, ServerConfig};
pub use error::RelboardError;
pub use types::{Author, OutputFormat, Release, ReleaseStatus, Repository};

/// A convenience `Result` type for relboard operations.
pub type Result<T> = std::result::Result<T, RelboardError>;
