//! Shared helpers for API tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use studio_core::{MemoryStorage, Session, SessionConfig};
use studio_server::{build_router, AppState};
use tower::ServiceExt;

/// Upload limit used by the test router.
pub const TEST_UPLOAD_LIMIT: usize = 64 * 1024;

/// A router over a ready in-memory session, plus its storage.
pub async fn app(password: Option<&str>) -> (Router, MemoryStorage) {
    let storage = MemoryStorage::new();
    let mut session = Session::in_memory(Arc::new(storage.clone()), SessionConfig::default());
    session.first_load().await;
    let state = AppState::new(session, password.map(str::to_string), TEST_UPLOAD_LIMIT);
    (build_router(state), storage)
}

/// Send one request and return the status with the body parsed as JSON
/// (`Null` when the body is empty or not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send_raw(app, request).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send one request and return the status with the raw body.
pub async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, bytes.to_vec())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

pub fn post_empty(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).expect("request")
}

pub fn json(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn upload(name: &str, content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::post(format!("/api/document/import?name={name}"));
    if let Some(ct) = content_type {
        builder = builder.header("content-type", ct);
    }
    builder.body(body.into()).expect("request")
}
