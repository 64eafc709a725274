use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use tower::ServiceExt;

use super::*;
use crate::config::Config;
use crate::rate_limit::{RateLimit, RateLimits};
use crate::routes::app;
use crate::state::test_helpers::{test_app_state, test_app_state_with_config};

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header("x-forwarded-for", "203.0.113.7");
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn create(router: &Router, sent_to: &str, message: &str, x: i32, y: i32) -> Value {
    let (status, note) = send(
        router,
        Method::POST,
        "/api/notes",
        Some(json!({ "sent_to": sent_to, "message": message, "x": x, "y": y })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{note}");
    note
}

// =============================================================================
// client_ip
// =============================================================================

#[test]
fn client_ip_prefers_first_forwarded_entry() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", "198.51.100.1, 10.0.0.1".parse().unwrap());
    headers.insert("x-real-ip", "192.0.2.9".parse().unwrap());
    assert_eq!(client_ip(&headers), "198.51.100.1");
}

#[test]
fn client_ip_falls_back_to_real_ip_then_unknown() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", "192.0.2.9".parse().unwrap());
    assert_eq!(client_ip(&headers), "192.0.2.9");

    headers.insert("x-forwarded-for", " ".parse().unwrap());
    assert_eq!(client_ip(&headers), "192.0.2.9");

    assert_eq!(client_ip(&HeaderMap::new()), "unknown");
}

// =============================================================================
// POST /api/notes
// =============================================================================

#[tokio::test]
async fn post_creates_note() {
    let router = app(test_app_state());
    let note = create(&router, "Alice", "Hi", 0, 0).await;

    assert_eq!(note["sent_to"], "Alice");
    assert_eq!(note["message"], "Hi");
    assert_eq!(note["x"], 0);
    assert_eq!(note["color"], "#fff3a0");
    assert_eq!(note["report_count"], 0);
    assert!(note["id"].as_str().is_some());
}

#[tokio::test]
async fn post_missing_fields_is_400() {
    let router = app(test_app_state());
    let expected = json!({ "error": "Missing required fields: message, sent_to, x, y" });

    let (status, body) =
        send(&router, Method::POST, "/api/notes", Some(json!({ "sent_to": "a", "message": "b", "x": "1", "y": 2 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);

    let (status, body) = send(&router, Method::POST, "/api/notes", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn post_invalid_fields_is_400_with_details() {
    let router = app(test_app_state());
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/notes",
        Some(json!({ "sent_to": "a", "message": "hell no", "x": 0, "y": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"][0]["field"], "message");
    assert_eq!(body["details"][0]["message"], "Message contains inappropriate language");
}

#[tokio::test]
async fn post_moderated_is_400() {
    let router = app(test_app_state());
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/notes",
        Some(json!({ "sent_to": "a", "message": "big sale today", "x": 0, "y": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Note rejected", "details": "Content appears to be spam" }));
}

#[tokio::test]
async fn post_rate_limited_is_429() {
    let state = test_app_state_with_config(Config {
        rate_limits: RateLimits {
            create_note: RateLimit::new(1, Duration::from_secs(60)),
            report_note: RateLimit::new(1, Duration::from_secs(60)),
        },
        ..Config::default()
    });
    let router = app(state);
    create(&router, "a", "first", 0, 0).await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/notes",
        Some(json!({ "sent_to": "a", "message": "second", "x": 0, "y": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Please wait before creating another note.");
}

// =============================================================================
// GET /api/notes
// =============================================================================

#[tokio::test]
async fn get_lists_with_filters() {
    let router = app(test_app_state());
    let first = create(&router, "Alice", "one", 0, 0).await;
    let second = create(&router, "Bob", "two", 100, 100).await;

    let (status, all) = send(&router, Method::GET, "/api/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([second, first]));

    let (_, area) = send(&router, Method::GET, "/api/notes?minX=-5&maxX=5&minY=-5&maxY=5", None).await;
    assert_eq!(area, json!([first]));

    // Partial area falls back to all notes.
    let (_, partial) = send(&router, Method::GET, "/api/notes?minX=-5&maxX=5", None).await;
    assert_eq!(partial.as_array().map(Vec::len), Some(2));

    // sentTo takes priority over the area.
    let (_, bob) = send(&router, Method::GET, "/api/notes?sentTo=Bob&minX=-5&maxX=5&minY=-5&maxY=5", None).await;
    assert_eq!(bob, json!([second]));
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn put_reports_note() {
    let router = app(test_app_state());
    let note = create(&router, "a", "hello", 0, 0).await;

    let (status, body) = send(&router, Method::PUT, "/api/notes", Some(json!({ "id": note["id"] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["id"], note["id"]);
    assert_eq!(body["report_count"], 1);
    assert_eq!(body["message"], "Report submitted successfully");
}

#[tokio::test]
async fn put_without_id_is_400() {
    let router = app(test_app_state());
    let (status, body) = send(&router, Method::PUT, "/api/notes", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Note ID is required in request body");

    let (status, _) = send(&router, Method::PUT, "/api/notes", Some(json!({ "id": "not-a-uuid" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_unknown_note_is_404() {
    let router = app(test_app_state());
    let uri = format!("/api/notes/{}/report", uuid::Uuid::new_v4());
    let (status, body) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Note not found" }));
}

#[tokio::test]
async fn report_by_path_counts_up() {
    let router = app(test_app_state());
    let note = create(&router, "a", "hello", 0, 0).await;
    let uri = format!("/api/notes/{}/report", note["id"].as_str().unwrap());

    send(&router, Method::POST, &uri, None).await;
    let (status, body) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report_count"], 2);
}

#[tokio::test]
async fn report_rate_limited_is_429() {
    let state = test_app_state_with_config(Config {
        rate_limits: RateLimits {
            create_note: RateLimit::new(10, Duration::from_secs(60)),
            report_note: RateLimit::new(1, Duration::from_secs(60)),
        },
        ..Config::default()
    });
    let router = app(state);
    let note = create(&router, "a", "hello", 0, 0).await;

    send(&router, Method::PUT, "/api/notes", Some(json!({ "id": note["id"] }))).await;
    let (status, body) = send(&router, Method::PUT, "/api/notes", Some(json!({ "id": note["id"] }))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Please wait before reporting another note.");
}

// =============================================================================
// DELETE /api/notes/{id}
// =============================================================================

#[tokio::test]
async fn delete_removes_note() {
    let router = app(test_app_state());
    let note = create(&router, "a", "hello", 0, 0).await;
    let uri = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let (status, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");

    let (_, all) = send(&router, Method::GET, "/api/notes", None).await;
    assert_eq!(all, json!([]));
}

// =============================================================================
// Malformed path and query
// =============================================================================

#[tokio::test]
async fn malformed_note_id_is_json_400() {
    let router = app(test_app_state());

    let (status, body) = send(&router, Method::DELETE, "/api/notes/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Note ID must be a UUID");

    let (status, body) = send(&router, Method::POST, "/api/notes/12345/report", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Note ID must be a UUID");
}

#[tokio::test]
async fn malformed_area_bound_is_json_400() {
    let router = app(test_app_state());
    let (status, body) = send(&router, Method::GET, "/api/notes?minX=left&maxX=5&minY=0&maxY=5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid query parameters");
    assert!(body["details"].as_str().is_some());
}
