use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use tincup_auth::{
    app::build_app,
    auth::memory::MemoryCredentialStore,
    config::{AppConfig, JwtConfig},
    state::AppState,
};

pub fn test_config(debug: bool) -> AppConfig {
    AppConfig {
        app_name: "TinCup API".into(),
        environment: "test".into(),
        debug,
        url: "http://localhost".into(),
        host: "127.0.0.1".into(),
        port: 0,
        database_url: None,
        cors_origins: Vec::new(),
        jwt: JwtConfig {
            secret: "integration-secret".into(),
            ttl_minutes: 60,
            refresh_ttl_minutes: 60 * 24 * 7,
        },
    }
}

/// Full router over a fresh in-memory store.
pub fn build_test_app() -> Router {
    let state = AppState::from_parts(
        Arc::new(test_config(false)),
        Arc::new(MemoryCredentialStore::new()),
    );
    build_app(state)
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

/// Sends `body` verbatim, without a Content-Type header.
pub async fn send_raw(app: &Router, method: Method, uri: &str, token: Option<&str>, body: &str) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_owned())).unwrap())
        .await
        .unwrap()
}
