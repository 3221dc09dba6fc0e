#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::header::{CONNECTION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;

/// Name of the payload file the stub accepts.
pub const PAYLOAD_NAME: &str = "payload.txt";

/// Start a stub site on an ephemeral port.
///
/// - `GET /upload.php` -> 200, `POST /upload.php` -> 200 for a multipart `payload.txt`
///   sent with `Connection: close`, else 400
/// - `GET /admin/upload.php` -> 403
/// - `GET /moved.php` -> 308 to `/upload.php`
/// - `GET /ua-check.php` -> 200 only when the User-Agent equals `expected_ua`
/// - `GET /conn-check.php` -> 200 only with `Connection: close`, else 400
/// - anything else -> 404
pub async fn spawn_stub(expected_ua: &str) -> SocketAddr {
    let expected_ua = expected_ua.to_string();
    let app = Router::new()
        .route(
            "/upload.php",
            get(|| async { "<form enctype=\"multipart/form-data\"></form>" }).post(accept_upload),
        )
        .route("/admin/upload.php", get(|| async { StatusCode::FORBIDDEN }))
        .route("/moved.php", get(|| async { Redirect::permanent("/upload.php") }))
        .route(
            "/conn-check.php",
            get(|headers: HeaderMap| async move {
                if closes_connection(&headers) {
                    StatusCode::OK
                } else {
                    StatusCode::BAD_REQUEST
                }
            }),
        )
        .route(
            "/ua-check.php",
            get(move |headers: HeaderMap| {
                let expected = expected_ua.clone();
                async move {
                    let ua = headers
                        .get(USER_AGENT)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    if ua == expected {
                        StatusCode::OK
                    } else {
                        StatusCode::BAD_REQUEST
                    }
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    addr
}

async fn accept_upload(headers: HeaderMap, body: Bytes) -> StatusCode {
    let is_multipart = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&body).to_lowercase();
    let named = body.contains(&format!("filename=\"{PAYLOAD_NAME}\""));
    let typed = body.contains("content-type: text/plain");
    let fields_ok = named && typed && body.contains("name=\"file\"");
    if is_multipart && fields_ok && closes_connection(&headers) {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    }
}

fn closes_connection(headers: &HeaderMap) -> bool {
    headers
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("close"))
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe port");
    listener.local_addr().expect("probe addr")
}
