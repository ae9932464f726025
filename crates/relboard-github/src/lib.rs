//! GitHub REST access for relboard.
//!
//! Wraps the three endpoints the dashboard needs (list releases, compare two
//! commits, render markdown), the `Link` header pagination GitHub uses for
//! release listings, and a small cache for rendered markdown.

pub mod cache;
pub mod client;
pub mod paging;

pub use cache::{MarkdownCache, NoopMarkdownCache, SqliteMarkdownCache};
pub use client::{GitHubClient, MarkdownMode, COMMIT_COMPARE_API_MAXIMUM};
pub use paging::{PageLinks, ReleasesPage};
