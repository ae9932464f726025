use std::path::PathBuf;

/// Errors that can occur across relboard.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary converts to a `miette` report at the boundary.
///
/// # Examples
///
/// ```
/// use relboard_core::RelboardError;
///
/// let err = RelboardError::Config("missing repositories".into());
/// assert!(err.to_string().contains("missing repositories"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RelboardError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(help("check .relboard.toml or run 'relboard init'"))]
    Config(String),

    /// GitHub answered with a non-success status.
    #[error("GitHub API error {status}: {message}")]
    GitHub {
        /// HTTP status code returned by GitHub.
        status: u16,
        /// Response body or transport detail.
        message: String,
    },

    /// Transport-level failure talking to GitHub.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Markdown cache storage failure.
    #[error("database error: {0}")]
    Database(String),

    /// HTML template registration or rendering failure.
    #[error("template error: {0}")]
    Template(String),

    /// A configured repository or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl RelboardError {
    /// Returns `true` for errors that map to an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RelboardError::NotFound(_) | RelboardError::GitHub { status: 404, .. }
        )
    }
}
