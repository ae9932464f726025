use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use relboard_core::{Author, GitHubConfig, RelboardError, Release};
use reqwest::header::{ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use crate::cache::MarkdownCache;
use crate::paging::ReleasesPage;

/// GitHub's compare endpoint returns at most this many commits.
///
/// See <https://docs.github.com/en/rest/commits/commits#compare-two-commits>.
pub const COMMIT_COMPARE_API_MAXIMUM: usize = 250;

/// Rendering mode for GitHub's markdown API.
///
/// # Examples
///
/// ```
/// use relboard_github::MarkdownMode;
///
/// assert_eq!(MarkdownMode::default().to_string(), "gfm");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownMode {
    /// GitHub Flavored Markdown; links `#123` and `@user` in the given context.
    #[default]
    Gfm,
    /// Plain markdown, as a README would render.
    Markdown,
}

impl fmt::Display for MarkdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkdownMode::Gfm => write!(f, "gfm"),
            MarkdownMode::Markdown => write!(f, "markdown"),
        }
    }
}

#[derive(Debug, Serialize)]
struct RenderMarkdown<'a> {
    text: &'a str,
    mode: MarkdownMode,
    context: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompareTwoCommits {
    #[serde(default)]
    total_commits: Option<u64>,
    #[serde(default)]
    commits: Vec<CompareCommit>,
}

#[derive(Debug, Deserialize)]
struct CompareCommit {
    // null when the commit email is not linked to a GitHub account
    #[serde(default)]
    author: Option<Author>,
}

/// Read-only GitHub client for releases, commit comparisons, and markdown.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use relboard_core::GitHubConfig;
/// use relboard_github::{GitHubClient, NoopMarkdownCache};
///
/// # async fn example() -> Result<(), relboard_core::RelboardError> {
/// let client = GitHubClient::new(&GitHubConfig::default(), Arc::new(NoopMarkdownCache))?;
/// let latest = client.get_latest_release("ritterim", "stuntman").await?;
/// # Ok(())
/// # }
/// ```
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    token: Option<String>,
    user_agent: String,
    markdown_cache: Arc<dyn MarkdownCache>,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// The token is resolved from the config, then `GITHUB_TOKEN`, then
    /// `GH_TOKEN`. Without one, requests are made anonymously.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Config`] if the API URL is invalid, or
    /// [`RelboardError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: &GitHubConfig,
        markdown_cache: Arc<dyn MarkdownCache>,
    ) -> Result<Self, RelboardError> {
        let api_url = Url::parse(config.api_url.trim_end_matches('/'))
            .map_err(|e| RelboardError::Config(format!("invalid api_url '{}': {e}", config.api_url)))?;
        if api_url.cannot_be_a_base() {
            return Err(RelboardError::Config(format!(
                "invalid api_url '{}': not an http(s) base URL",
                config.api_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelboardError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url,
            token: config.resolve_token(),
            user_agent: config.user_agent.clone(),
            markdown_cache,
        })
    }

    /// Whether requests are authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch one page of a repository's releases, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::GitHub`] on a non-success status,
    /// [`RelboardError::Http`] on transport failure, or
    /// [`RelboardError::Serialization`] if the body is not a release list.
    pub async fn get_releases(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
        page_size: u32,
    ) -> Result<ReleasesPage, RelboardError> {
        let mut url = self.endpoint(["repos", owner, repo, "releases"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &page_size.to_string());
        let response = self.send(Method::GET, url, None).await?;

        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = response
            .text()
            .await
            .map_err(|e| RelboardError::Http(format!("failed to read releases response: {e}")))?;
        let releases: Vec<Release> = serde_json::from_str(&body)?;

        tracing::debug!(
            owner,
            repo,
            page,
            count = releases.len(),
            "fetched releases"
        );

        Ok(ReleasesPage::new(releases, page, page_size, link.as_deref()))
    }

    /// Fetch the most recent release, draft and pre-releases included.
    ///
    /// Returns `Ok(None)` when the repository has no releases.
    ///
    /// # Errors
    ///
    /// Same as [`get_releases`](Self::get_releases).
    pub async fn get_latest_release(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Option<Release>, RelboardError> {
        let page = self.get_releases(owner, repo, 1, 1).await?;
        Ok(page.releases.into_iter().next())
    }

    /// List the distinct GitHub users who authored commits in `base...head`.
    ///
    /// Authors appear in the order of their first commit in the range.
    /// Commits not linked to a GitHub account are skipped. GitHub caps the
    /// comparison at [`COMMIT_COMPARE_API_MAXIMUM`] commits, so very large
    /// ranges may miss authors; a warning is logged when the cap is hit.
    ///
    /// Refs are percent-encoded except for `/`, so tags such as
    /// `release/1.0` or `v1#rc` reach GitHub intact.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::GitHub`] on a non-success status (for example
    /// 404 when either ref does not exist).
    pub async fn get_authors_between_range(
        &self,
        owner: &str,
        repo: &str,
        compare_base: &str,
        compare_head: &str,
    ) -> Result<Vec<Author>, RelboardError> {
        let range = format!("{compare_base}...{compare_head}");
        let url = self.endpoint(
            ["repos", owner, repo, "compare"]
                .into_iter()
                .chain(range.split('/')),
        );
        let response = self.send(Method::GET, url, None).await?;
        let body = response
            .text()
            .await
            .map_err(|e| RelboardError::Http(format!("failed to read compare response: {e}")))?;
        let compare: CompareTwoCommits = serde_json::from_str(&body)?;

        if compare.commits.len() >= COMMIT_COMPARE_API_MAXIMUM {
            tracing::warn!(
                repository = %format!("{owner}/{repo}"),
                total_commits = compare.total_commits,
                "encountered the maximum number of commits ({COMMIT_COMPARE_API_MAXIMUM}) while \
                 comparing {compare_base}...{compare_head}; some authors may be missing"
            );
        }

        Ok(distinct_authors(compare.commits))
    }

    /// Render markdown to HTML through GitHub, consulting the cache first.
    ///
    /// `context` is the `owner/repo` used to resolve issue references and
    /// mentions in [`MarkdownMode::Gfm`]. Cache failures are logged and do not
    /// fail the render.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::GitHub`] if GitHub refuses to render the text,
    /// or [`RelboardError::Http`] on transport failure.
    pub async fn render_markdown(
        &self,
        markdown: &str,
        context: &str,
        mode: MarkdownMode,
    ) -> Result<String, RelboardError> {
        let mode_name = mode.to_string();
        match self.markdown_cache.get(markdown, context, &mode_name) {
            Ok(Some(html)) => return Ok(html),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "markdown cache lookup failed"),
        }

        let request = RenderMarkdown {
            text: markdown,
            mode,
            context,
        };
        let response = self
            .send(Method::POST, self.endpoint(["markdown"]), Some(&request))
            .await?;
        let html = response
            .text()
            .await
            .map_err(|e| RelboardError::Http(format!("failed to read rendered markdown: {e}")))?;

        if let Err(e) = self.markdown_cache.put(markdown, context, &mode_name, &html) {
            tracing::warn!(error = %e, "markdown cache write failed");
        }

        Ok(html)
    }

    /// `api_url` with `segments` appended, each one percent-encoded.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        // new() rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&RenderMarkdown<'_>>,
    ) -> Result<reqwest::Response, RelboardError> {
        let mut request = self
            .http
            .request(method, url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, &self.user_agent);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelboardError::Http(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelboardError::GitHub {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }
}

fn distinct_authors(commits: Vec<CompareCommit>) -> Vec<Author> {
    let mut seen = HashSet::new();
    commits
        .into_iter()
        .filter_map(|c| c.author)
        .filter(|a| seen.insert(a.login.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(login: Option<&str>) -> CompareCommit {
        CompareCommit {
            author: login.map(Author::new),
        }
    }

    #[test]
    fn distinct_authors_keeps_first_seen_order() {
        let commits = vec![
            commit(Some("bob")),
            commit(Some("alice")),
            commit(None),
            commit(Some("bob")),
            commit(Some("carol")),
            commit(Some("alice")),
        ];
        let logins: Vec<String> = distinct_authors(commits)
            .into_iter()
            .map(|a| a.login)
            .collect();
        assert_eq!(logins, vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn compare_response_tolerates_null_authors() {
        let body = r#"{
            "status": "ahead",
            "total_commits": 2,
            "commits": [
                { "sha": "a1", "author": null, "committer": null },
                { "sha": "b2", "author": { "login": "octocat", "id": 1 } }
            ]
        }"#;
        let compare: CompareTwoCommits = serde_json::from_str(body).unwrap();
        assert_eq!(compare.total_commits, Some(2));
        let authors = distinct_authors(compare.commits);
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].login, "octocat");
    }

    fn client(api_url: &str) -> GitHubClient {
        let config = GitHubConfig {
            token: Some("ghp_test".into()),
            api_url: api_url.into(),
            user_agent: "relboard-tests".into(),
            page_size: 10,
        };
        GitHubClient::new(&config, Arc::new(crate::NoopMarkdownCache)).unwrap()
    }

    #[test]
    fn endpoint_encodes_segments_and_keeps_base_path() {
        let client = client("https://ghe.example.com/api/v3/");
        let url = client.endpoint(["repos", "ritterim", "stuntman", "compare", "v1#rc...100%"]);
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/ritterim/stuntman/compare/v1%23rc...100%25"
        );
    }

    #[test]
    fn new_rejects_unusable_api_url() {
        let config = GitHubConfig {
            api_url: "mailto:octocat@github.com".into(),
            ..GitHubConfig::default()
        };
        let err = GitHubClient::new(&config, Arc::new(crate::NoopMarkdownCache))
            .err()
            .unwrap();
        assert!(matches!(err, RelboardError::Config(_)));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn compare_at_cap_warns_about_missing_authors() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let commits: Vec<serde_json::Value> = (0..COMMIT_COMPARE_API_MAXIMUM)
            .map(|i| serde_json::json!({ "sha": i.to_string(), "author": { "login": "dev" } }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/repos/ritterim/stuntman/compare/v1.0.0...v2.0.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "total_commits": 612, "commits": commits })),
            )
            .mount(&server)
            .await;

        let authors = client(&server.uri())
            .get_authors_between_range("ritterim", "stuntman", "v1.0.0", "v2.0.0")
            .await
            .unwrap();

        assert_eq!(authors.len(), 1);
        assert!(logs_contain("some authors may be missing"));
        assert!(logs_contain("v1.0.0...v2.0.0"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn compare_below_cap_does_not_warn() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_commits": 1,
                "commits": [{ "sha": "a", "author": { "login": "dev" } }]
            })))
            .mount(&server)
            .await;

        client(&server.uri())
            .get_authors_between_range("ritterim", "stuntman", "v1.0.0", "v1.0.1")
            .await
            .unwrap();

        assert!(!logs_contain("some authors may be missing"));
    }

    #[test]
    fn markdown_mode_names() {
        assert_eq!(MarkdownMode::Gfm.to_string(), "gfm");
        assert_eq!(MarkdownMode::Markdown.to_string(), "markdown");
        assert_eq!(serde_json::to_value(MarkdownMode::Gfm).unwrap(), "gfm");
    }
}
