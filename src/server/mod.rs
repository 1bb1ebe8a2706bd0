//! HTTP Surface
//!
//! axum Router and shared application state wiring the pipelines together.
//!
//! Routes:
//! - `GET /`: landing page
//! - `GET /wiki/{slug}`: generated or cached article (streamed)
//! - `GET /images/{slug}.{ext}`: generated illustration
//! - `GET /api/search?q=`: title suggestions
//! - `GET /api/cache-stats`: cache statistics

mod api;
mod images;
mod pages;
pub mod templates;

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::cache::PageCache;
use crate::config::ServerConfig;
use crate::content::ContentPipeline;
use crate::images::ImagePipeline;
use crate::types::Result;

/// Shared state injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<ContentPipeline>,
    pub images: Arc<ImagePipeline>,
    pub cache: Arc<PageCache>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::landing))
        .route("/wiki/{slug}", get(pages::article))
        .route("/images/{file}", get(images::image))
        .route("/api/search", get(api::search))
        .route("/api/cache-stats", get(api::cache_stats))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Everwiki listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
