//! Dashboard pages and the JSON view of the dashboard.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::AppState;
use crate::views::IndexView;

/// Query string of the history page.
///
/// `page` is kept as text so a missing or garbled value falls back to the
/// first page instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ShowQuery {
    page: Option<String>,
}

impl ShowQuery {
    /// Requested page, never below 1.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .clamp(1, i64::from(u32::MAX)) as u32
    }
}

/// `GET /`: latest release of every configured repository.
pub async fn index_handler(State(app_state): State<AppState>) -> Response {
    let view = app_state.service().latest_releases().await;
    html_page(&app_state, app_state.renderer().render_index(&view))
}

/// `GET /releases/{id}?page=N`: one page of a repository's history.
pub async fn show_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ShowQuery>,
) -> Response {
    match app_state.service().release_history(&id, query.page()).await {
        Ok(view) => html_page(&app_state, app_state.renderer().render_show(&view)),
        Err(e) if e.is_not_found() => error_page(&app_state, StatusCode::NOT_FOUND, &e.to_string()),
        Err(e) => {
            tracing::error!(error = %e, id, "failed to build release history");
            error_page(
                &app_state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "something went wrong",
            )
        }
    }
}

/// `GET /api/releases`: the dashboard as JSON.
pub async fn api_index_handler(State(app_state): State<AppState>) -> Json<IndexView> {
    Json(app_state.service().latest_releases().await)
}

/// Any unmatched route.
pub async fn not_found_handler(State(app_state): State<AppState>) -> Response {
    error_page(&app_state, StatusCode::NOT_FOUND, "page not found")
}

fn html_page(
    app_state: &AppState,
    rendered: Result<String, relboard_core::RelboardError>,
) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render page");
            error_page(
                app_state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "something went wrong",
            )
        }
    }
}

fn error_page(app_state: &AppState, status: StatusCode, message: &str) -> Response {
    match app_state.renderer().render_error(status.as_u16(), message) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to render error page");
            (status, message.to_string()).into_response()
        }
    }
}
