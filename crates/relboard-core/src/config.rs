use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RelboardError;
use crate::types::Repository;

/// Top-level configuration loaded from `.relboard.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use relboard_core::RelboardConfig;
///
/// let config = RelboardConfig::default();
/// assert_eq!(config.github.page_size, 10);
/// assert!(config.repositories.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelboardConfig {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Web server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Markdown render cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Repositories shown on the dashboard, in display order.
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

impl RelboardConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Io`] if the file cannot be read, or
    /// [`RelboardError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use relboard_core::RelboardConfig;
    /// use std::path::Path;
    ///
    /// let config = RelboardConfig::from_file(Path::new(".relboard.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, RelboardError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use relboard_core::RelboardConfig;
    ///
    /// let toml = r#"
    /// [[repositories]]
    /// owner = "ritterim"
    /// name = "stuntman"
    /// "#;
    /// let config = RelboardConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.repositories.len(), 1);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RelboardError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// All configured repositories, in file order.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Find a repository by its route slug, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use relboard_core::{RelboardConfig, Repository};
    ///
    /// let mut config = RelboardConfig::default();
    /// config.repositories.push(Repository::new("ritterim", "stuntman"));
    /// assert!(config.find_repository("StuntMan").is_some());
    /// assert!(config.find_repository("missing").is_none());
    /// ```
    pub fn find_repository(&self, id: &str) -> Option<&Repository> {
        let id = id.to_lowercase();
        self.repositories.iter().find(|r| r.slug() == id)
    }

    /// Check the configuration for values that would break the dashboard.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Config`] on blank owner/name, duplicate slugs,
    /// or a page size outside `1..=100`.
    pub fn validate(&self) -> Result<(), RelboardError> {
        if !(1..=100).contains(&self.github.page_size) {
            return Err(RelboardError::Config(format!(
                "github.page_size must be between 1 and 100, got {}",
                self.github.page_size
            )));
        }

        let mut seen = HashSet::new();
        for repo in &self.repositories {
            if repo.owner.trim().is_empty() || repo.name.trim().is_empty() {
                return Err(RelboardError::Config(
                    "every repository needs a non-empty owner and name".into(),
                ));
            }
            let slug = repo.slug();
            if !seen.insert(slug.clone()) {
                return Err(RelboardError::Config(format!(
                    "duplicate repository id '{slug}'; set a distinct `id` for one of them"
                )));
            }
        }
        Ok(())
    }
}

/// GitHub API configuration.
///
/// # Examples
///
/// ```
/// use relboard_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert_eq!(config.api_url, "https://api.github.com");
/// assert_eq!(config.user_agent, "relboard");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token. Falls back to `GITHUB_TOKEN` / `GH_TOKEN`.
    pub token: Option<String>,
    /// API root (override for GitHub Enterprise).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// `User-Agent` sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Releases per history page (default: 10).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl GitHubConfig {
    /// Resolve the API token: explicit config first, then environment.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .or_else(|| std::env::var("GH_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_user_agent() -> String {
    "relboard".into()
}

fn default_page_size() -> u32 {
    10
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (default: `127.0.0.1:5000`).
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:5000".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Markdown render cache configuration.
///
/// # Examples
///
/// ```
/// use relboard_core::CacheConfig;
///
/// let config = CacheConfig::default();
/// assert!(config.enabled);
/// assert!(config.path.ends_with("markdown.db"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache rendered markdown on disk (default: true).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// SQLite database location.
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(".relboard/markdown.db")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            path: default_cache_path(),
        }
    }
}
