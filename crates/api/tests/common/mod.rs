//! Shared helpers for API integration tests.
//!
//! Tests run against [`MemoryStore`], so no database is required.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use propline_core::import::phone::IndianMobilePolicy;
use propline_core::import::store::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

use propline_api::config::ServerConfig;
use propline_api::router::build_app_router;
use propline_api::state::AppState;

const BOUNDARY: &str = "propline-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 10 * 1024 * 1024,
        db_max_connections: 1,
    }
}

/// Build the full application router, with the same middleware stack as
/// production, over the given in-memory store.
pub fn build_test_app(store: Arc<MemoryStore>) -> Router {
    let config = test_config();
    let state = AppState {
        store,
        phone_policy: Arc::new(IndianMobilePolicy),
    };
    build_app_router(state, &config)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a single file as multipart field `file`.
pub async fn post_file(app: Router, uri: &str, file_name: &str, content: &[u8]) -> Response<Body> {
    post_multipart(app, uri, "file", file_name, content).await
}

/// POST a single multipart part with an arbitrary field name.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    field: &str,
    file_name: &str,
    content: &[u8],
) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
