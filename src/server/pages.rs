//! Page Routes
//!
//! The article route runs the content pipeline and streams its response:
//! redirects and rejections are decided before any bytes go out, then the
//! document shell is sent immediately, generation runs, and the completed
//! body (or an inline error fragment) is appended to the open stream.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use futures::SinkExt;
use futures::channel::mpsc;
use std::convert::Infallible;
use tracing::{error, warn};

use super::AppState;
use super::templates;
use crate::content::PageResolution;
use crate::slug::slug_to_title;

/// `GET /`: static landing page
pub async fn landing() -> Html<String> {
    Html(templates::landing_page())
}

/// `GET /wiki/{slug}`
pub async fn article(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match state.content.resolve(&slug).await {
        Ok(PageResolution::Cached(article_html)) => {
            let title = slug_to_title(&slug);
            Html(format!(
                "{}{}{}",
                templates::page_shell(&title),
                templates::page_body(&title, &article_html),
                templates::page_footer()
            ))
            .into_response()
        }
        Ok(PageResolution::Redirect { canonical_slug }) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, format!("/wiki/{}", canonical_slug))],
        )
            .into_response(),
        Ok(PageResolution::NotFound { title }) => (
            StatusCode::NOT_FOUND,
            Html(templates::not_found_page(&title)),
        )
            .into_response(),
        Ok(PageResolution::Generate { title }) => stream_generation(state, slug, title),
        Err(e) => {
            error!("Resolution failed for '{}': {}", slug, e);
            let title = slug_to_title(&slug);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(templates::error_page(&title, &e.to_string())),
            )
                .into_response()
        }
    }
}

/// Emit the shell, generate, then append the body, or an inline error
/// fragment if generation fails once bytes are already on the wire.
///
/// The generation task is spawned detached: a disconnected client stops the
/// sends from landing but never aborts the work, so the page still gets
/// cached for the next requester.
fn stream_generation(state: AppState, slug: String, title: String) -> Response {
    let (mut tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(8);

    tokio::spawn(async move {
        let _ = tx
            .send(Ok(Bytes::from(templates::page_shell(&title))))
            .await;

        match state.content.generate_article(&title).await {
            Ok(page) => {
                // Markers first, cache second: a reader of the freshly
                // cached page must find prompt records, not 404s
                state.images.register_pending(&page.title, &page.images).await;
                state.content.persist(&slug, &page).await;

                let _ = tx
                    .send(Ok(Bytes::from(templates::page_body(&page.title, &page.html))))
                    .await;
                let _ = tx.send(Ok(Bytes::from(templates::page_footer()))).await;

                // Response complete; prompt preparation happens off the
                // latency path
                state.images.prepare_prompts(&page.title, &page.images).await;
            }
            Err(e) => {
                warn!("Generation failed for '{}': {}", slug, e);
                let _ = tx
                    .send(Ok(Bytes::from(templates::error_fragment(&e.to_string()))))
                    .await;
                let _ = tx.send(Ok(Bytes::from(templates::page_footer()))).await;
            }
        }
    });

    (
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from_stream(rx),
    )
        .into_response()
}
