//! `Link` header pagination.
//!
//! GitHub paginates collection endpoints and advertises neighbouring pages in
//! a `Link` header:
//!
//! ```text
//! <https://api.github.com/repositories/1/releases?page=3>; rel="next",
//! <https://api.github.com/repositories/1/releases?page=5>; rel="last"
//! ```

use relboard_core::Release;
use serde::Serialize;

/// Page numbers advertised by a `Link` header.
///
/// # Examples
///
/// ```
/// use relboard_github::PageLinks;
///
/// let links = PageLinks::parse(
///     r#"<https://api.github.com/repos/o/r/releases?page=2&per_page=10>; rel="next", <https://api.github.com/repos/o/r/releases?page=4&per_page=10>; rel="last""#,
/// );
/// assert_eq!(links.next, Some(2));
/// assert_eq!(links.last, Some(4));
/// assert_eq!(links.prev, None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    /// `rel="first"`
    pub first: Option<u32>,
    /// `rel="prev"`
    pub prev: Option<u32>,
    /// `rel="next"`
    pub next: Option<u32>,
    /// `rel="last"`
    pub last: Option<u32>,
}

impl PageLinks {
    /// Parse a raw `Link` header value.
    ///
    /// Entries without a `page` query parameter, unknown relations, and
    /// malformed segments are skipped.
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();

        for entry in header.split(',') {
            let mut segments = entry.split(';');
            let Some(target) = segments.next() else {
                continue;
            };
            let Some(url) = target
                .trim()
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
            else {
                continue;
            };
            let Some(page) = page_param(url) else {
                continue;
            };

            for param in segments {
                let Some((key, value)) = param.trim().split_once('=') else {
                    continue;
                };
                if !key.trim().eq_ignore_ascii_case("rel") {
                    continue;
                }
                // rel may hold several space-separated relation types
                for rel in value.trim().trim_matches('"').split_whitespace() {
                    match rel {
                        "first" => links.first = Some(page),
                        "prev" => links.prev = Some(page),
                        "next" => links.next = Some(page),
                        "last" => links.last = Some(page),
                        _ => {}
                    }
                }
            }
        }

        links
    }
}

fn page_param(url: &str) -> Option<u32> {
    let url = reqwest::Url::parse(url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

/// One page of releases plus its pagination links.
#[derive(Debug, Clone)]
pub struct ReleasesPage {
    /// Releases on this page, newest first.
    pub releases: Vec<Release>,
    /// 1-based page number that was requested.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Links parsed from the response.
    pub links: PageLinks,
}

impl ReleasesPage {
    /// Build a page from parsed releases and an optional `Link` header.
    pub fn new(releases: Vec<Release>, page: u32, page_size: u32, link_header: Option<&str>) -> Self {
        Self {
            releases,
            page,
            page_size,
            links: link_header.map(PageLinks::parse).unwrap_or_default(),
        }
    }

    /// First page number. GitHub omits `rel="first"` on the first page.
    pub fn first_page(&self) -> u32 {
        self.links.first.unwrap_or(self.page)
    }

    /// Previous page number, if any.
    pub fn previous_page(&self) -> Option<u32> {
        self.links.prev
    }

    /// Next page number, if any.
    pub fn next_page(&self) -> Option<u32> {
        self.links.next
    }

    /// Last page number. GitHub omits `rel="last"` on the last page.
    pub fn last_page(&self) -> u32 {
        self.links.last.unwrap_or(self.page)
    }

    /// `true` when the page holds no releases.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}
