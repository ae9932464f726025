//! Rendered-markdown cache.
//!
//! Rendering release notes goes through GitHub's markdown API, so the HTML is
//! kept keyed by a SHA-256 of `(mode, context, markdown)`. Entries never
//! expire; the same input always renders to the same output.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use relboard_core::RelboardError;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

/// Storage for rendered markdown.
pub trait MarkdownCache: Send + Sync {
    /// Look up previously rendered HTML.
    fn get(&self, markdown: &str, context: &str, mode: &str)
        -> Result<Option<String>, RelboardError>;

    /// Store rendered HTML.
    fn put(&self, markdown: &str, context: &str, mode: &str, html: &str)
        -> Result<(), RelboardError>;
}

/// A cache that never stores anything.
///
/// # Examples
///
/// ```
/// use relboard_github::{MarkdownCache, NoopMarkdownCache};
///
/// let cache = NoopMarkdownCache;
/// cache.put("# hi", "o/r", "gfm", "<h1>hi</h1>").unwrap();
/// assert!(cache.get("# hi", "o/r", "gfm").unwrap().is_none());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMarkdownCache;

impl MarkdownCache for NoopMarkdownCache {
    fn get(&self, _: &str, _: &str, _: &str) -> Result<Option<String>, RelboardError> {
        Ok(None)
    }

    fn put(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), RelboardError> {
        Ok(())
    }
}

/// SQLite-backed markdown cache.
///
/// # Examples
///
/// ```
/// use relboard_github::{MarkdownCache, SqliteMarkdownCache};
///
/// let cache = SqliteMarkdownCache::in_memory().unwrap();
/// cache.put("**bold**", "ritterim/stuntman", "gfm", "<p><strong>bold</strong></p>").unwrap();
/// let html = cache.get("**bold**", "ritterim/stuntman", "gfm").unwrap();
/// assert_eq!(html.as_deref(), Some("<p><strong>bold</strong></p>"));
/// ```
pub struct SqliteMarkdownCache {
    conn: Mutex<Connection>,
}

impl SqliteMarkdownCache {
    /// Open or create a cache database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Database`] if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, RelboardError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RelboardError::Database(format!("failed to create cache directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| RelboardError::Database(format!("failed to open database: {e}")))?;

        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    /// Create an in-memory cache (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, RelboardError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            RelboardError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.init_schema()?;
        Ok(cache)
    }

    fn init_schema(&self) -> Result<(), RelboardError> {
        self.conn
            .lock()
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS rendered_markdown (
                    key TEXT PRIMARY KEY,
                    mode TEXT NOT NULL,
                    context TEXT NOT NULL,
                    html TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                ",
            )
            .map_err(|e| RelboardError::Database(format!("failed to create schema: {e}")))
    }

    /// Number of cached renderings.
    pub fn len(&self) -> Result<usize, RelboardError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM rendered_markdown", [], |r| r.get(0))
            .map_err(|e| RelboardError::Database(format!("failed to count entries: {e}")))?;
        Ok(count as usize)
    }

    /// `true` if nothing has been cached yet.
    pub fn is_empty(&self) -> Result<bool, RelboardError> {
        Ok(self.len()? == 0)
    }
}

impl MarkdownCache for SqliteMarkdownCache {
    fn get(
        &self,
        markdown: &str,
        context: &str,
        mode: &str,
    ) -> Result<Option<String>, RelboardError> {
        let key = cache_key(markdown, context, mode);
        self.conn
            .lock()
            .query_row(
                "SELECT html FROM rendered_markdown WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RelboardError::Database(format!("failed to read cache entry: {e}")))
    }

    fn put(
        &self,
        markdown: &str,
        context: &str,
        mode: &str,
        html: &str,
    ) -> Result<(), RelboardError> {
        let key = cache_key(markdown, context, mode);
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO rendered_markdown (key, mode, context, html, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![key, mode, context, html, Utc::now().to_rfc3339()],
            )
            .map_err(|e| RelboardError::Database(format!("failed to write cache entry: {e}")))?;
        Ok(())
    }
}

fn cache_key(markdown: &str, context: &str, mode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mode.as_bytes());
    hasher.update([0u8]);
    hasher.update(context.as_bytes());
    hasher.update([0u8]);
    hasher.update(markdown.as_bytes());
    format!("{:x}", hasher.finalize())
}
