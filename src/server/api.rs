//! JSON API Routes
//!
//! Search suggestions and operational cache statistics.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// `GET /api/search?q=`: LLM-backed title suggestions. Queries shorter
/// than two trimmed characters short-circuit to an empty array.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.unwrap_or_default();
    match state.content.search(&q).await {
        Ok(suggestions) => Json(suggestions).into_response(),
        Err(e) => {
            error!("Search failed for '{}': {}", q.trim(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /api/cache-stats`: operational visibility into the flat-file cache
pub async fn cache_stats(State(state): State<AppState>) -> Response {
    match state.cache.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Cache stats scan failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
