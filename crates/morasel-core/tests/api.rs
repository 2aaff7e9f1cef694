//! Transport error normalization and rate-limit retry.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use morasel_core::api::{ApiError, CONNECTIVITY_MESSAGE, SERVER_FALLBACK_MESSAGE};

async fn error_server() -> String {
    let router = Router::new()
        .route(
            "/message",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"message": "Channel not found"}))) }),
        )
        .route(
            "/validation",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": ["name should not be empty", "phone is too short"]})),
                )
            }),
        )
        .route(
            "/error-field",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({"error": "Forbidden"}))) }),
        )
        .route(
            "/bare",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        );
    common::serve(router).await
}

#[tokio::test]
async fn test_server_messages_are_normalized() {
    let client = common::client(&error_server().await);

    let err = client.get("/message").await.unwrap_err();
    assert_eq!(err.to_string(), "Channel not found");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let err = client.get("/validation").await.unwrap_err();
    assert_eq!(err.to_string(), "name should not be empty, phone is too short");

    let err = client.get("/error-field").await.unwrap_err();
    assert_eq!(err.to_string(), "Forbidden");

    let err = client.get("/bare").await.unwrap_err();
    assert_eq!(err.to_string(), SERVER_FALLBACK_MESSAGE);
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity_error() {
    let client = common::client(&common::closed_port_url().await);
    let err = client.get("/channels").await.unwrap_err();
    assert!(err.is_connectivity(), "got {err:?}");
    assert_eq!(err.to_string(), CONNECTIVITY_MESSAGE);
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_empty_success_body_reads_as_null() {
    let router = Router::new().route("/empty", get(|| async { StatusCode::NO_CONTENT }));
    let client = common::client(&common::serve(router).await);
    assert_eq!(client.get("/empty").await.unwrap(), serde_json::Value::Null);
}

#[tokio::test]
async fn test_rate_limited_requests_are_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/points/my-points",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    (StatusCode::TOO_MANY_REQUESTS, Json(json!({"message": "slow down"})))
                } else {
                    (StatusCode::OK, Json(json!({"points": 7})))
                }
            }
        }),
    );
    let client = common::client(&common::serve(router).await)
        .with_rate_limit_backoff(Duration::from_millis(10));

    let body = client.get("/points/my-points").await.unwrap();
    assert_eq!(body["points"], 7);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_persistent_rate_limit_surfaces_server_message() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new()
        .route(
            "/campaigns",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::TOO_MANY_REQUESTS, Json(json!({"message": "Daily quota exceeded"})))
                }
            }),
        )
        .route("/bare", get(|| async { StatusCode::TOO_MANY_REQUESTS }));
    let client = common::client(&common::serve(router).await)
        .with_rate_limit_backoff(Duration::from_millis(10));

    let err = client.get("/campaigns").await.unwrap_err();
    assert_eq!(err.to_string(), "Daily quota exceeded");
    assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(hits.load(Ordering::SeqCst), 4, "first attempt plus three retries");

    let err = client.get("/bare").await.unwrap_err();
    assert!(matches!(err, ApiError::RateLimited), "got {err:?}");
}

#[tokio::test]
async fn test_unauthorized_is_reported() {
    let router = Router::new().route(
        "/campaigns",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"}))) }),
    );
    let client = common::client(&common::serve(router).await);
    let err = client.get("/campaigns").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(matches!(err, ApiError::Server { .. }));
}
