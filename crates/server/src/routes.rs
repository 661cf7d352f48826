//! HTTP routes.

use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use folio_core::{CONTENT_TYPE, Converter};
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::{AppError, not_found};

/// Upper bound on the time spent serving one request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Content routes; the last segment is expected to end in `.epub`.
const CONTENT_ROUTES: [&str; 6] = [
    "/news/{slug}",
    "/users/{user}/journaux/{slug}",
    "/forums/{forum}/posts/{slug}",
    "/sondages/{slug}",
    "/suivi/{slug}",
    "/wiki/{slug}",
];

#[derive(Clone)]
pub struct AppState {
    converter: Converter,
}

pub fn router(converter: Converter) -> Router {
    let mut router = Router::new().route("/status", get(status));
    for route in CONTENT_ROUTES {
        router = router.route(route, get(content));
    }

    router
        .fallback(not_found)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { converter })
}

/// Liveness probe for monitoring.
async fn status() -> &'static str {
    "OK"
}

async fn content(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let path = uri.path();
    let url = state.converter.upstream_url(path).ok_or_else(|| AppError::NotFound(path.to_string()))?;

    // Cancels the image fetches still running if the request goes away.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let epub = state.converter.convert(&url, path, cancel).await?;
    tracing::info!(%path, %url, bytes = epub.len(), "served epub");

    let headers = [
        (header::CONTENT_TYPE, CONTENT_TYPE.to_string()),
        (header::LINK, format!("<{}>; rel=\"canonical\"", url)),
    ];
    Ok((headers, epub).into_response())
}
