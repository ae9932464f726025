use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub repository shown on the dashboard.
///
/// # Examples
///
/// ```
/// use relboard_core::Repository;
///
/// let repo = Repository::new("ritterim", "stuntman");
/// assert_eq!(repo.full_name(), "ritterim/stuntman");
/// assert_eq!(repo.slug(), "stuntman");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Account or organization that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Short description displayed next to the release.
    #[serde(default)]
    pub description: Option<String>,
    /// Route identifier; defaults to the repository name.
    #[serde(default)]
    pub id: Option<String>,
}

impl Repository {
    /// Create a repository entry with no description or explicit id.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            description: None,
            id: None,
        }
    }

    /// `owner/name`, as GitHub displays it.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Lowercased route identifier used in `/releases/{slug}`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relboard_core::Repository;
    ///
    /// let mut repo = Repository::new("ritterim", "Stuntman");
    /// assert_eq!(repo.slug(), "stuntman");
    ///
    /// repo.id = Some("Impersonation".into());
    /// assert_eq!(repo.slug(), "impersonation");
    /// ```
    pub fn slug(&self) -> String {
        self.id.as_deref().unwrap_or(&self.name).to_lowercase()
    }

    /// Link to the repository on github.com.
    pub fn html_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

/// A GitHub user credited with commits.
///
/// Two authors are equal when their logins match; the remaining fields are
/// presentation data.
///
/// # Examples
///
/// ```
/// use relboard_core::Author;
///
/// let a = Author::new("octocat");
/// let mut b = Author::new("octocat");
/// b.id = 42;
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    /// GitHub login.
    pub login: String,
    /// Numeric GitHub user id.
    #[serde(default)]
    pub id: u64,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,
    /// Profile URL.
    #[serde(default)]
    pub html_url: String,
}

impl Author {
    /// Create an author with only a login set.
    pub fn new(login: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            html_url: format!("https://github.com/{login}"),
            login,
            id: 0,
            avatar_url: String::new(),
        }
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Self) -> bool {
        self.login == other.login
    }
}

impl Eq for Author {}

impl Hash for Author {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.login.hash(state);
    }
}

/// A GitHub release as returned by the releases API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    /// GitHub release id.
    pub id: u64,
    /// Release title, if one was given.
    #[serde(default)]
    pub name: Option<String>,
    /// Markdown release notes.
    #[serde(default)]
    pub body: Option<String>,
    /// Tag the release points at.
    pub tag_name: String,
    /// Branch or commit the tag is created from.
    pub target_commitish: String,
    /// Unpublished draft.
    #[serde(default)]
    pub draft: bool,
    /// Marked as a pre-release.
    #[serde(default)]
    pub prerelease: bool,
    /// User who created the release.
    #[serde(default)]
    pub author: Option<Author>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Publication timestamp; `None` for drafts.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Release page on github.com.
    #[serde(default)]
    pub html_url: String,
}

impl Release {
    /// Classify the release.
    ///
    /// A draft is reported as [`ReleaseStatus::Draft`] even if it is also
    /// flagged as a pre-release.
    pub fn status(&self) -> ReleaseStatus {
        if self.draft {
            ReleaseStatus::Draft
        } else if self.prerelease {
            ReleaseStatus::PreRelease
        } else {
            ReleaseStatus::Release
        }
    }

    /// The ref to use as the head of a compare range.
    ///
    /// Published releases are compared at their tag. A draft's tag may not
    /// exist yet, so drafts use `target_commitish`.
    pub fn head_ref(&self) -> &str {
        if self.draft || self.tag_name.is_empty() {
            &self.target_commitish
        } else {
            &self.tag_name
        }
    }

    /// Display title: the release name, or the tag when the name is blank.
    pub fn title(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.tag_name,
        }
    }
}

/// Publication state of a release.
///
/// # Examples
///
/// ```
/// use relboard_core::ReleaseStatus;
///
/// assert_eq!(ReleaseStatus::PreRelease.to_string(), "Pre-release");
/// assert_eq!(ReleaseStatus::Unknown.to_string(), "Unknown");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseStatus {
    /// Not yet published.
    Draft,
    /// Published but flagged as a pre-release.
    PreRelease,
    /// Published release.
    Release,
    /// No release information is available.
    Unknown,
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseStatus::Draft => write!(f, "Draft"),
            ReleaseStatus::PreRelease => write!(f, "Pre-release"),
            ReleaseStatus::Release => write!(f, "Release"),
            ReleaseStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use relboard_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summaries.
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
