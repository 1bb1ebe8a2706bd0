//! Image Route
//!
//! `GET /images/{slug}.{ext}`: Phase B of the image pipeline. Status codes
//! are the client's polling protocol: 200 with long-lived cache headers for
//! a resolved image, 202 with a machine-readable body while the prompt is
//! still generating, 404 for unsupported extensions or unregistered images,
//! 500 when generation itself fails (that image only).

use axum::{
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::AppState;
use crate::constants::image::{CACHE_CONTROL_MAX_AGE_SECS, CLIENT_POLL_INTERVAL_MS, DEFAULT_ASPECT};
use crate::images::{ImageServeOutcome, is_supported_extension};
use crate::types::WikiError;

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    aspect: Option<String>,
}

fn content_type(format: &str) -> &'static str {
    match format {
        "webp" => "image/webp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// `GET /images/{file}?aspect=4:3`
pub async fn image(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<ImageQuery>,
) -> Response {
    let Some((slug, ext)) = file.rsplit_once('.') else {
        return not_found("missing file extension");
    };
    if slug.is_empty() || !is_supported_extension(ext) {
        return not_found("unsupported image extension");
    }

    let aspect = query.aspect.as_deref().unwrap_or(DEFAULT_ASPECT);

    match state.images.serve(slug, ext, aspect).await {
        Ok(ImageServeOutcome::Ready { bytes, format }) => (
            [
                (header::CONTENT_TYPE, content_type(&format).to_string()),
                (
                    header::CACHE_CONTROL,
                    format!("public, max-age={}", CACHE_CONTROL_MAX_AGE_SECS),
                ),
            ],
            bytes,
        )
            .into_response(),
        Ok(ImageServeOutcome::Pending) => (
            StatusCode::ACCEPTED,
            axum::Json(json!({
                "status": "generating",
                "retry_after_ms": CLIENT_POLL_INTERVAL_MS,
            })),
        )
            .into_response(),
        Err(WikiError::PromptMissing(slug)) => {
            not_found(&format!("no prompt registered for '{}'", slug))
        }
        Err(e) => {
            error!("Image serving failed for '{}': {}", slug, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn not_found(reason: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({ "error": reason })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type("webp"), "image/webp");
        assert_eq!(content_type("jpeg"), "image/jpeg");
        assert_eq!(content_type("bin"), "application/octet-stream");
    }
}
