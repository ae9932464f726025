//! HTML rendering with Handlebars templates compiled into the binary.

use handlebars::Handlebars;
use relboard_core::RelboardError;
use serde::Serialize;

use crate::views::{IndexView, ShowView};

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../templates/partials/header.hbs")),
    ("footer", include_str!("../templates/partials/footer.hbs")),
    ("release", include_str!("../templates/partials/release.hbs")),
];

const TEMPLATES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("show", include_str!("../templates/show.hbs")),
    ("error", include_str!("../templates/error.hbs")),
];

#[derive(Serialize)]
struct ErrorPage<'a> {
    status: u16,
    message: &'a str,
}

/// Renders the dashboard pages.
///
/// # Examples
///
/// ```
/// use relboard_web::render::TemplateRenderer;
/// use relboard_web::views::IndexView;
///
/// let renderer = TemplateRenderer::new().unwrap();
/// let html = renderer.render_index(&IndexView::new(Vec::new())).unwrap();
/// assert!(html.contains("No repositories configured"));
/// ```
pub struct TemplateRenderer {
    registry: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Register the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`RelboardError::Template`] if a template fails to compile.
    pub fn new() -> Result<Self, RelboardError> {
        let mut registry = Handlebars::new();

        for (name, source) in PARTIALS {
            registry
                .register_partial(name, *source)
                .map_err(|e| RelboardError::Template(format!("partial '{name}': {e}")))?;
        }
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, *source)
                .map_err(|e| RelboardError::Template(format!("template '{name}': {e}")))?;
        }

        Ok(Self { registry })
    }

    /// Render the latest-releases dashboard.
    pub fn render_index(&self, view: &IndexView) -> Result<String, RelboardError> {
        self.render("index", view)
    }

    /// Render a repository's release history page.
    pub fn render_show(&self, view: &ShowView) -> Result<String, RelboardError> {
        self.render("show", view)
    }

    /// Render an error page for an HTTP status.
    pub fn render_error(&self, status: u16, message: &str) -> Result<String, RelboardError> {
        self.render("error", &ErrorPage { status, message })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RelboardError> {
        self.registry
            .render(name, data)
            .map_err(|e| RelboardError::Template(format!("rendering '{name}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::ReleaseView;
    use relboard_core::{Author, Release, Repository};
    use relboard_github::ReleasesPage;

    fn repo() -> Repository {
        Repository {
            owner: "ritterim".into(),
            name: "stuntman".into(),
            description: Some("Impersonate <users>".into()),
            id: None,
        }
    }

    fn release() -> Release {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "First & finest",
            "tag_name": "v1.0.0",
            "target_commitish": "main",
            "prerelease": true,
            "created_at": "2016-03-01T15:04:05Z",
            "html_url": "https://github.com/ritterim/stuntman/releases/tag/v1.0.0"
        }))
        .unwrap()
    }

    #[test]
    fn index_renders_cards_and_escapes_text() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut author = Author::new("kendaleiv");
        author.avatar_url = "https://avatars.example/u/1".into();
        let card = ReleaseView::new(
            &repo(),
            &release(),
            vec![author],
            "<p><strong>notes</strong></p>".into(),
        );
        let html = renderer.render_index(&IndexView::new(vec![card])).unwrap();

        assert!(html.contains("ritterim/stuntman"));
        assert!(html.contains("href=\"/releases/stuntman\""));
        assert!(html.contains("First &amp; finest"));
        assert!(html.contains("Impersonate &lt;users&gt;"));
        assert!(html.contains("<p><strong>notes</strong></p>"));
        assert!(html.contains("Pre-release"));
        assert!(html.contains("https://avatars.example/u/1"));
        assert!(html.contains("2016-03-01"));
    }

    #[test]
    fn index_shows_placeholder_for_missing_release() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_index(&IndexView::new(vec![ReleaseView::empty(&repo())]))
            .unwrap();
        assert!(html.contains("No release information available"));
    }

    #[test]
    fn show_renders_pagination_links() {
        let renderer = TemplateRenderer::new().unwrap();
        let page = ReleasesPage::new(
            vec![release()],
            2,
            1,
            Some(r#"<https://api.github.com/r?page=1>; rel="prev", <https://api.github.com/r?page=3>; rel="next", <https://api.github.com/r?page=3>; rel="last", <https://api.github.com/r?page=1>; rel="first""#),
        );
        let card = ReleaseView::new(&repo(), &release(), Vec::new(), String::new());
        let html = renderer
            .render_show(&ShowView::new(&repo(), &page, vec![card]))
            .unwrap();

        assert!(html.contains("Page 2 of 3"));
        assert!(html.contains("/releases/stuntman?page=1"));
        assert!(html.contains("/releases/stuntman?page=3"));
        assert!(html.contains("v1.0.0"));
    }

    #[test]
    fn show_without_releases_has_message() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_show(&ShowView::empty(&repo(), 1, 10))
            .unwrap();
        assert!(html.contains("No releases found"));
        assert!(!html.contains("Page 1 of"));
    }

    #[test]
    fn error_page_shows_status() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer.render_error(404, "repository 'nope'").unwrap();
        assert!(html.contains("404"));
        assert!(html.contains("repository &#x27;nope&#x27;"));
    }
}
