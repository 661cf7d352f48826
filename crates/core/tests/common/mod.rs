//! Local stand-in for the upstream site.

use std::net::SocketAddr;

use axum::Router;
use axum::body::Body;
use axum::http::{StatusCode, Uri, header};
use axum::response::{Html, IntoResponse, Response};

pub const ARTICLE_PATH: &str = "/news/sortie-de-linux";

/// A tiny but valid PNG signature followed by filler.
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Number of 1 MiB chunks served for `/images/streamed.png`.
pub const STREAMED_CHUNKS: usize = 7;

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{}", name)).unwrap()
}

/// Serves the fixture article and its images on an ephemeral port.
pub async fn spawn_upstream() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(serve);
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

async fn serve(uri: Uri) -> Response {
    match uri.path() {
        ARTICLE_PATH => Html(fixture("article.html")).into_response(),
        "/wiki/sans-article" => Html("<html><body><p>Rien ici</p></body></html>").into_response(),
        "/images/sections/noyau.png" | "/images/screenshot.png" | "/images/avatar.png" => {
            ([(header::CONTENT_TYPE, "image/png; charset=binary")], PNG).into_response()
        }
        "/images/streamed.png" => {
            // Chunked, so no Content-Length is declared.
            let chunks = (0..STREAMED_CHUNKS).map(|_| Ok::<_, std::io::Error>(vec![0u8; 1024 * 1024]));
            Response::new(Body::from_stream(futures::stream::iter(chunks)))
        }
        "/images/huge.png" => ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 6 * 1024 * 1024]).into_response(),
        path if path.starts_with("/img/") => Response::new(Body::from(PNG)),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
