//! Release aggregation.
//!
//! Every GitHub failure here is logged and turned into an emptier view; the
//! only error a caller sees is an unknown repository id.

use std::sync::Arc;

use futures::future::join_all;
use relboard_core::{Author, RelboardConfig, RelboardError, Release, Repository};
use relboard_github::{GitHubClient, MarkdownMode};

use crate::views::{IndexView, ReleaseView, ShowView};

/// Page size used when walking a repository's history for a previous release.
const HISTORY_SCAN_PAGE_SIZE: u32 = 100;

/// Pages walked before giving up on finding a release in the history.
const HISTORY_SCAN_MAX_PAGES: u32 = 10;

/// Where the next-older release comes from when computing a compare range.
#[derive(Debug, Clone, Copy)]
enum PreviousRelease<'a> {
    /// Already known from the page being rendered; `None` means there is none.
    Known(Option<&'a Release>),
    /// Must be looked up by walking the release history.
    Lookup,
}

/// Builds dashboard views from the configured repositories and GitHub.
pub struct ReleaseService {
    config: Arc<RelboardConfig>,
    github: Arc<GitHubClient>,
}

impl ReleaseService {
    pub fn new(config: Arc<RelboardConfig>, github: Arc<GitHubClient>) -> Self {
        Self { config, github }
    }

    pub fn config(&self) -> &RelboardConfig {
        &self.config
    }

    /// Latest release for every configured repository, fetched in parallel.
    ///
    /// The result keeps configuration order. A repository whose request fails
    /// shows up as an empty card.
    pub async fn latest_releases(&self) -> IndexView {
        let requests = self
            .config
            .repositories()
            .iter()
            .map(|repo| self.latest_release(repo));
        IndexView::new(join_all(requests).await)
    }

    /// Latest release card for one repository.
    pub async fn latest_release(&self, repo: &Repository) -> ReleaseView {
        match self.github.get_latest_release(&repo.owner, &repo.name).await {
            Ok(Some(release)) => {
                self.release_view(repo, &release, PreviousRelease::Lookup)
                    .await
            }
            Ok(None) => ReleaseView::empty(repo),
            Err(e) => {
                tracing::error!(
                    repository = %repo.full_name(),
                    error = %e,
                    "github request failed"
                );
                ReleaseView::empty(repo)
            }
        }
    }

    /// One page of release history for the repository with slug `id`.
    ///
    /// Pages below 1 are treated as page 1.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::NotFound`] if no repository has that slug.
    /// GitHub failures yield an empty page instead of an error.
    pub async fn release_history(&self, id: &str, page: u32) -> Result<ShowView, RelboardError> {
        let page = page.max(1);
        let page_size = self.config.github.page_size;
        let repo = self
            .config
            .find_repository(id)
            .ok_or_else(|| RelboardError::NotFound(format!("repository '{id}'")))?;

        let releases_page = match self
            .github
            .get_releases(&repo.owner, &repo.name, page, page_size)
            .await
        {
            Ok(releases_page) => releases_page,
            Err(e) => {
                tracing::error!(
                    repository = %repo.full_name(),
                    page,
                    error = %e,
                    "github request failed"
                );
                return Ok(ShowView::empty(repo, page, page_size));
            }
        };

        let has_more = releases_page.next_page().is_some();
        let releases = &releases_page.releases;
        let cards = releases.iter().enumerate().map(|(i, release)| {
            let older = releases[i + 1..].iter().find(|r| !r.draft);
            let previous = match older {
                Some(older) => PreviousRelease::Known(Some(older)),
                None if has_more => PreviousRelease::Lookup,
                None => PreviousRelease::Known(None),
            };
            self.release_view(repo, release, previous)
        });
        let cards = join_all(cards).await;

        Ok(ShowView::new(repo, &releases_page, cards))
    }

    /// Contributors to `release`: authors of the commits since the previous
    /// release.
    ///
    /// Falls back to the release's own author when there is no previous
    /// release or GitHub cannot answer.
    pub async fn authors_for_release(&self, repo: &Repository, release: &Release) -> Vec<Author> {
        self.authors_with_previous(repo, release, PreviousRelease::Lookup)
            .await
    }

    /// Tag of the release published before `release`, used as the base of
    /// its compare range.
    ///
    /// Drafts are skipped since their tags may not exist. Returns `Ok(None)`
    /// for the oldest release, or when `release` is not found within the
    /// first `HISTORY_SCAN_MAX_PAGES` pages of history.
    ///
    /// # Errors
    ///
    /// Propagates GitHub request failures.
    pub async fn previous_release_target(
        &self,
        repo: &Repository,
        release: &Release,
    ) -> Result<Option<String>, RelboardError> {
        let mut found = false;

        for page in 1..=HISTORY_SCAN_MAX_PAGES {
            let batch = self
                .github
                .get_releases(&repo.owner, &repo.name, page, HISTORY_SCAN_PAGE_SIZE)
                .await?;

            for candidate in &batch.releases {
                if found && !candidate.draft {
                    return Ok(Some(candidate.tag_name.clone()));
                }
                if candidate.id == release.id {
                    found = true;
                }
            }

            if batch.next_page().is_none() {
                return Ok(None);
            }
        }

        if !found {
            tracing::debug!(
                repository = %repo.full_name(),
                release = release.id,
                "release not found within scanned history"
            );
        }
        Ok(None)
    }

    async fn release_view(
        &self,
        repo: &Repository,
        release: &Release,
        previous: PreviousRelease<'_>,
    ) -> ReleaseView {
        let (authors, body_html) = futures::join!(
            self.authors_with_previous(repo, release, previous),
            self.render_body(repo, release)
        );
        ReleaseView::new(repo, release, authors, body_html)
    }

    async fn authors_with_previous(
        &self,
        repo: &Repository,
        release: &Release,
        previous: PreviousRelease<'_>,
    ) -> Vec<Author> {
        match self.compare_authors(repo, release, previous).await {
            Ok(Some(authors)) if !authors.is_empty() => authors,
            Ok(_) => release_author(release),
            Err(e) => {
                tracing::error!(
                    repository = %repo.full_name(),
                    tag = %release.tag_name,
                    error = %e,
                    "github request failed"
                );
                release_author(release)
            }
        }
    }

    async fn compare_authors(
        &self,
        repo: &Repository,
        release: &Release,
        previous: PreviousRelease<'_>,
    ) -> Result<Option<Vec<Author>>, RelboardError> {
        let base = match previous {
            PreviousRelease::Known(older) => older.map(|r| r.tag_name.clone()),
            PreviousRelease::Lookup => self.previous_release_target(repo, release).await?,
        };
        let Some(base) = base else {
            return Ok(None);
        };

        let authors = self
            .github
            .get_authors_between_range(&repo.owner, &repo.name, &base, release.head_ref())
            .await?;
        Ok(Some(authors))
    }

    async fn render_body(&self, repo: &Repository, release: &Release) -> String {
        let Some(body) = release.body.as_deref().filter(|b| !b.trim().is_empty()) else {
            return String::new();
        };

        match self
            .github
            .render_markdown(body, &repo.full_name(), MarkdownMode::Gfm)
            .await
        {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(
                    repository = %repo.full_name(),
                    error = %e,
                    "markdown render failed, showing plain text"
                );
                format!("<pre>{}</pre>", handlebars::html_escape(body))
            }
        }
    }
}

fn release_author(release: &Release) -> Vec<Author> {
    release.author.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relboard_core::GitHubConfig;
    use relboard_github::NoopMarkdownCache;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn release(id: u64, tag: &str, draft: bool) -> serde_json::Value {
        json!({
            "id": id,
            "name": tag,
            "body": "",
            "tag_name": tag,
            "target_commitish": "main",
            "draft": draft,
            "prerelease": false,
            "author": { "login": "releaser" },
            "created_at": "2016-03-01T15:04:05Z"
        })
    }

    fn service(server: &MockServer) -> ReleaseService {
        service_with_page_size(server, GitHubConfig::default().page_size)
    }

    fn service_with_page_size(server: &MockServer, page_size: u32) -> ReleaseService {
        let mut config = RelboardConfig::default();
        config.github = GitHubConfig {
            token: Some("ghp_test".into()),
            api_url: server.uri(),
            page_size,
            ..GitHubConfig::default()
        };
        config.repositories.push(Repository::new("ritterim", "stuntman"));
        let github = GitHubClient::new(&config.github, Arc::new(NoopMarkdownCache)).unwrap();
        ReleaseService::new(Arc::new(config), Arc::new(github))
    }

    async fn mount_history(server: &MockServer, releases: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(releases))
            .mount(server)
            .await;
    }

    fn next_link(server: &MockServer, page: u32, per_page: u32) -> String {
        format!(
            "<{}/repos/ritterim/stuntman/releases?page={page}&per_page={per_page}>; rel=\"next\"",
            server.uri()
        )
    }

    async fn mount_compare(server: &MockServer, range: &str, login: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/repos/ritterim/stuntman/compare/{range}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_commits": 1,
                "commits": [{ "sha": "1", "author": { "login": login } }]
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn parse(value: serde_json::Value) -> Release {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn previous_target_is_next_older_published_tag() {
        let server = MockServer::start().await;
        mount_history(
            &server,
            json!([
                release(4, "v4", false),
                release(3, "v3", false),
                release(2, "v2-draft", true),
                release(1, "v1", false)
            ]),
        )
        .await;

        let service = service(&server);
        let repo = Repository::new("ritterim", "stuntman");

        let v3 = parse(release(3, "v3", false));
        let base = service.previous_release_target(&repo, &v3).await.unwrap();
        assert_eq!(base.as_deref(), Some("v1"));

        let v4 = parse(release(4, "v4", false));
        let base = service.previous_release_target(&repo, &v4).await.unwrap();
        assert_eq!(base.as_deref(), Some("v3"));
    }

    #[tokio::test]
    async fn oldest_release_has_no_previous_target() {
        let server = MockServer::start().await;
        mount_history(&server, json!([release(2, "v2", false), release(1, "v1", false)])).await;

        let service = service(&server);
        let repo = Repository::new("ritterim", "stuntman");
        let v1 = parse(release(1, "v1", false));
        assert!(service
            .previous_release_target(&repo, &v1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn authors_fall_back_to_release_author_without_previous() {
        let server = MockServer::start().await;
        mount_history(&server, json!([release(1, "v1", false)])).await;

        let service = service(&server);
        let repo = Repository::new("ritterim", "stuntman");
        let v1 = parse(release(1, "v1", false));
        let authors = service.authors_for_release(&repo, &v1).await;
        assert_eq!(authors, vec![Author::new("releaser")]);
    }

    #[tokio::test]
    async fn authors_fall_back_when_compare_fails() {
        let server = MockServer::start().await;
        mount_history(&server, json!([release(2, "v2", false), release(1, "v1", false)])).await;
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/compare/v1...v2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = service(&server);
        let repo = Repository::new("ritterim", "stuntman");
        let v2 = parse(release(2, "v2", false));
        let authors = service.authors_for_release(&repo, &v2).await;
        assert_eq!(authors, vec![Author::new("releaser")]);
    }

    #[tokio::test]
    async fn history_page_edge_finds_previous_on_later_scan_page() {
        let server = MockServer::start().await;

        // Dashboard page 1 of size 2: v5, v4; v3 lives on page 2.
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", next_link(&server, 2, 2).as_str())
                    .set_body_json(json!([release(5, "v5", false), release(4, "v4", false)])),
            )
            .mount(&server)
            .await;
        // History walk split the same way across two pages of the scan.
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .and(query_param("page", "1"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", next_link(&server, 2, 100).as_str())
                    .set_body_json(json!([release(5, "v5", false), release(4, "v4", false)])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .and(query_param("page", "2"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                release(3, "v3-draft", true),
                release(2, "v2", false),
                release(1, "v1", false)
            ])))
            .expect(1)
            .mount(&server)
            .await;
        mount_compare(&server, "v4...v5", "kendaleiv").await;
        mount_compare(&server, "v2...v4", "billboga").await;

        let service = service_with_page_size(&server, 2);
        let view = service.release_history("stuntman", 1).await.unwrap();

        assert_eq!(view.next_page, Some(2));
        assert_eq!(view.releases.len(), 2);
        assert_eq!(view.releases[0].authors, vec![Author::new("kendaleiv")]);
        assert_eq!(view.releases[1].authors, vec![Author::new("billboga")]);
    }

    #[tokio::test]
    async fn previous_target_scan_stops_after_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .and(query_param("per_page", "100"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", next_link(&server, 99, 100).as_str())
                    .set_body_json(json!([release(500, "v500", false)])),
            )
            .expect(2 * u64::from(HISTORY_SCAN_MAX_PAGES))
            .mount(&server)
            .await;

        let service = service(&server);
        let repo = Repository::new("ritterim", "stuntman");
        let v1 = parse(release(1, "v1", false));

        let base = service.previous_release_target(&repo, &v1).await.unwrap();
        assert!(base.is_none());
        assert_eq!(
            service.authors_for_release(&repo, &v1).await,
            vec![Author::new("releaser")]
        );
    }

    #[tokio::test]
    async fn unknown_repository_is_not_found() {
        let server = MockServer::start().await;
        let service = service(&server);
        let err = service.release_history("nope", 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn history_failure_yields_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let service = service(&server);
        let view = service.release_history("stuntman", 0).await.unwrap();
        assert!(!view.not_empty);
        assert_eq!(view.page, 1);
    }

    #[tokio::test]
    async fn latest_failure_yields_empty_card() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/releases"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let service = service(&server);
        let index = service.latest_releases().await;
        assert_eq!(index.releases.len(), 1);
        assert!(!index.releases[0].has_release);
        assert_eq!(index.releases[0].status, "Unknown");
    }
}
