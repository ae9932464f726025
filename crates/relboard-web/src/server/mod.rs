//! HTTP server for the release dashboard.
//!
//! # Endpoints
//!
//! - `GET /` - Latest release of every configured repository
//! - `GET /releases/{id}?page=N` - Paginated release history of one repository
//! - `GET /api/releases` - The dashboard as JSON
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use relboard_core::RelboardError;
use tower_http::trace::TraceLayer;

use crate::render::TemplateRenderer;
use crate::service::ReleaseService;

pub mod health;
pub mod pages;

pub use health::health_handler;
pub use pages::{api_index_handler, index_handler, not_found_handler, show_handler};

/// Shared application state.
///
/// Passed to all handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: ReleaseService,
    renderer: TemplateRenderer,
}

impl AppState {
    pub fn new(service: ReleaseService, renderer: TemplateRenderer) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { service, renderer }),
        }
    }

    pub fn service(&self) -> &ReleaseService {
        &self.inner.service
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.inner.renderer
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/", get(index_handler))
        .route("/releases/{id}", get(show_handler))
        .route("/api/releases", get(api_index_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Serve the dashboard on `bind` until Ctrl-C.
///
/// # Errors
///
/// Returns [`RelboardError::Io`] if the address cannot be bound or the
/// server fails while running.
pub async fn serve(app_state: AppState, bind: &str) -> Result<(), RelboardError> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
