//! View models handed to the templates and the JSON API.

use relboard_core::{Author, Release, ReleaseStatus, Repository};
use relboard_github::ReleasesPage;
use serde::Serialize;

/// Repository details shown alongside releases.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryView {
    pub full_name: String,
    pub description: Option<String>,
    pub slug: String,
    pub html_url: String,
}

impl From<&Repository> for RepositoryView {
    fn from(repo: &Repository) -> Self {
        Self {
            full_name: repo.full_name(),
            description: repo.description.clone(),
            slug: repo.slug(),
            html_url: repo.html_url(),
        }
    }
}

/// A single release card.
///
/// A view without a release (`has_release == false`) is what a repository
/// shows when GitHub could not be reached or it has never released.
///
/// # Examples
///
/// ```
/// use relboard_core::Repository;
/// use relboard_web::views::ReleaseView;
///
/// let view = ReleaseView::empty(&Repository::new("ritterim", "stuntman"));
/// assert!(!view.has_release);
/// assert_eq!(view.status, "Unknown");
/// assert_eq!(view.created_at, "n/a");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseView {
    pub repository: RepositoryView,
    pub has_release: bool,
    pub title: Option<String>,
    pub tag: Option<String>,
    /// Rendered release notes; inserted into the page unescaped.
    pub body_html: String,
    pub created_at: String,
    pub status: String,
    pub is_draft: bool,
    pub is_prerelease: bool,
    pub is_release: bool,
    pub authors: Vec<Author>,
    pub release_url: Option<String>,
}

impl ReleaseView {
    /// Build a card for `release` with its contributors and rendered notes.
    pub fn new(
        repo: &Repository,
        release: &Release,
        authors: Vec<Author>,
        body_html: String,
    ) -> Self {
        let status = release.status();
        Self {
            repository: repo.into(),
            has_release: true,
            title: Some(release.title().to_string()),
            tag: Some(release.tag_name.clone()),
            body_html,
            created_at: release.created_at.format("%Y-%m-%d").to_string(),
            status: status.to_string(),
            is_draft: status == ReleaseStatus::Draft,
            is_prerelease: release.prerelease,
            is_release: status == ReleaseStatus::Release,
            authors,
            release_url: Some(release.html_url.clone()).filter(|u| !u.is_empty()),
        }
    }

    /// A card for a repository with no release information.
    pub fn empty(repo: &Repository) -> Self {
        Self {
            repository: repo.into(),
            has_release: false,
            title: None,
            tag: None,
            body_html: String::new(),
            created_at: "n/a".into(),
            status: ReleaseStatus::Unknown.to_string(),
            is_draft: false,
            is_prerelease: false,
            is_release: false,
            authors: Vec::new(),
            release_url: None,
        }
    }
}

/// The dashboard: latest release per configured repository.
#[derive(Debug, Clone, Serialize)]
pub struct IndexView {
    pub releases: Vec<ReleaseView>,
    pub not_empty: bool,
}

impl IndexView {
    pub fn new(releases: Vec<ReleaseView>) -> Self {
        Self {
            not_empty: !releases.is_empty(),
            releases,
        }
    }
}

/// One page of a repository's release history.
#[derive(Debug, Clone, Serialize)]
pub struct ShowView {
    pub repository: RepositoryView,
    pub releases: Vec<ReleaseView>,
    pub page: u32,
    pub page_size: u32,
    pub first_page: u32,
    pub previous_page: Option<u32>,
    pub next_page: Option<u32>,
    pub last_page: u32,
    pub not_empty: bool,
}

impl ShowView {
    /// Build a history page from fetched releases and their cards.
    pub fn new(repo: &Repository, page: &ReleasesPage, releases: Vec<ReleaseView>) -> Self {
        Self {
            repository: repo.into(),
            not_empty: !releases.is_empty(),
            releases,
            page: page.page,
            page_size: page.page_size,
            first_page: page.first_page(),
            previous_page: page.previous_page(),
            next_page: page.next_page(),
            last_page: page.last_page(),
        }
    }

    /// A history page with nothing to show.
    pub fn empty(repo: &Repository, page: u32, page_size: u32) -> Self {
        Self {
            repository: repo.into(),
            releases: Vec::new(),
            page,
            page_size,
            first_page: 1,
            previous_page: None,
            next_page: None,
            last_page: page,
            not_empty: false,
        }
    }
}
