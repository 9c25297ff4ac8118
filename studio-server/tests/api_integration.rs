//! # API Integration Tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot`.

mod common;

use axum::http::{header, StatusCode};
use serde_json::json;
use studio_core::StorageKey;

use common::{app, get, json, post_empty, send, send_raw, upload, TEST_UPLOAD_LIMIT};

const DOCUMENT: &str = r##"{
    "width": 1080,
    "height": 1080,
    "pages": [
        {"id": "cover", "children": [
            {"id": "title", "type": "text", "text": "Hello", "fontSize": 40, "fill": "#000",
             "x": 10, "y": 10, "width": 500, "height": 50}
        ]},
        {"id": "back", "children": []}
    ]
}"##;

const LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300">
    <rect x="10" y="10" width="100" height="50" fill="#ff0000"/>
    <filter id="f"/>
</svg>"##;

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = app(None).await;

    let (status, _) = send_raw(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["session"], true);
    assert_eq!(body["checks"]["storage"], true);
}

#[tokio::test]
async fn test_session_is_ready_after_first_load() {
    let (app, _) = app(None).await;

    let (status, body) = send(&app, get("/api/session")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["status_label"], "Ready");
    assert_eq!(body["pages"], 1);
    assert_eq!(body["language"], "en");

    let (status, raw) = send_raw(&app, get("/api/document")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(raw).expect("utf8").contains("branding_watermark"));
}

#[tokio::test]
async fn test_import_json_upload() {
    let (app, storage) = app(None).await;

    let (status, body) = send(&app, upload("design.json", None, DOCUMENT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["format"], "document_json");
    assert_eq!(body["report"]["persisted"], true);
    assert_eq!(body["session"]["status"], "ready");
    assert_eq!(body["session"]["pages"], 2);

    let (_, document) = send(&app, get("/api/document")).await;
    assert_eq!(document["width"], 1080.0);
    let stored = storage.peek(StorageKey::Document).expect("persisted");
    assert!(stored.contains("\"title\""));
}

#[tokio::test]
async fn test_import_svg_reports_dropped_primitives() {
    let (app, _) = app(None).await;

    let (status, body) = send(&app, upload("logo", Some("image/svg+xml"), LOGO)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["format"], "vector_graphics");
    assert_eq!(body["report"]["dropped"][0]["tag"], "filter");
}

#[tokio::test]
async fn test_rejected_import_keeps_document() {
    let (app, _) = app(None).await;
    let (_, before) = send_raw(&app, get("/api/document")).await;

    let (status, body) = send(&app, upload("broken.json", None, "{\"width\": ")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["session"]["status"], "error");
    assert!(body["session"]["message"].is_string());
    assert!(!body["diagnostics"].as_array().expect("array").is_empty());

    let (_, after) = send_raw(&app, get("/api/document")).await;
    assert_eq!(before, after);

    // Recovery through a new document.
    let (status, body) = send(&app, post_empty("/api/document/new")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn test_unsupported_upload() {
    let (app, _) = app(None).await;

    let (status, body) = send(&app, upload("photo.png", Some("image/png"), vec![0x89u8, 0x50])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["session"]["status"], "error");
}

#[tokio::test]
async fn test_oversized_upload_is_refused() {
    let (app, _) = app(None).await;

    let big = vec![b' '; TEST_UPLOAD_LIMIT + 1];
    let (status, _) = send_raw(&app, upload("big.json", None, big)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_drop_gesture() {
    let (app, _) = app(None).await;

    let mixed = json!({"items": [
        {"kind": "file", "name": "design.json", "content": DOCUMENT},
        {"kind": "text", "text": "https://example.com"}
    ]});
    let (status, body) = send(&app, json("POST", "/api/document/drop", &mixed)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("message").contains("2 item"));

    let (_, view) = send(&app, get("/api/session")).await;
    assert_eq!(view["status"], "ready");
    assert_eq!(view["pages"], 1);

    let files = json!({"items": [
        {"kind": "file", "name": "design.json", "content": DOCUMENT},
        {"kind": "file", "name": "broken.json", "content": "[1, 2"}
    ]});
    let (status, body) = send(&app, json("POST", "/api/document/drop", &files)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["outcome"], "imported");
    assert_eq!(body["results"][1]["outcome"], "rejected");
    assert_eq!(body["session"]["status"], "error");
    assert_eq!(body["session"]["pages"], 2);
}

#[tokio::test]
async fn test_export_downloads() {
    let (app, _) = app(None).await;

    let response = {
        use tower::ServiceExt;
        app.clone()
            .oneshot(get("/api/document/export?format=svg"))
            .await
            .expect("infallible")
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"design.svg\""
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert!(String::from_utf8_lossy(&body).contains("<svg"));

    let (status, body) = send(&app, get("/api/document/export")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pages"].as_array().expect("pages").len(), 1);

    let (status, _) = send_raw(&app, get("/api/document/export?format=pdf")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_language_and_active_page() {
    let (app, storage) = app(None).await;

    let (status, body) = send(&app, json("PUT", "/api/language", &json!({"language": "fr-CA"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["language"], "fr");
    assert_eq!(body["status_label"], "Prêt");
    assert_eq!(storage.peek(StorageKey::Language).as_deref(), Some("fr"));

    send(&app, upload("design.json", None, DOCUMENT)).await;
    let (status, body) = send(&app, json("PUT", "/api/page/active", &json!({"index": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_page"], 1);

    let (_, document) = send(&app, get("/api/document")).await;
    let back = &document["pages"][1]["children"];
    assert!(back
        .as_array()
        .expect("children")
        .iter()
        .any(|e| e["id"] == "branding_watermark"));

    let (status, _) = send(&app, json("PUT", "/api/page/active", &json!({"index": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_gate() {
    let (app, storage) = app(Some("open sesame")).await;

    let (status, _) = send(&app, get("/api/session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send_raw(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, json("POST", "/api/auth/login", &json!({"password": "nope"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, json("POST", "/api/auth/login", &json!({"password": "open sesame"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorized"], true);
    assert_eq!(storage.peek(StorageKey::Authorized).as_deref(), Some("true"));

    let (status, _) = send(&app, get("/api/session")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_empty("/api/auth/logout")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authorized"], false);

    let (status, _) = send(&app, get("/api/session")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
