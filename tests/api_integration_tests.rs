//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycles against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use copilot_cache::{api::create_router, AppState, Cache, MemoryCache};
use serde_json::Value;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, Arc<dyn Cache>) {
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new("api_test:"));
    (create_router(AppState::new(cache.clone())), cache)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bare(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == SET / GET ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let (app, cache) = create_test_app();

    let response = app
        .oneshot(put_json("/set", r#"{"key":"test_key","value":"test_value"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
    assert_eq!(cache.get("test_key").await.as_deref(), Some("test_value"));
}

#[tokio::test]
async fn test_get_endpoint_success() {
    let (app, _cache) = create_test_app();

    let set_response = app
        .clone()
        .oneshot(put_json("/set", r#"{"key":"get_key","value":"get_value"}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(bare("GET", "/get/get_key")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"], "get_value");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _cache) = create_test_app();

    let response = app.oneshot(bare("GET", "/get/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_invalid_json_request() {
    let (app, _cache) = create_test_app();

    let response = app.oneshot(put_json("/set", "{not json")).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let (app, _cache) = create_test_app();

    let response = app
        .oneshot(put_json("/set", r#"{"key":"","value":"v"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_zero_ttl_request() {
    let (app, _cache) = create_test_app();

    let response = app
        .oneshot(put_json("/set", r#"{"key":"k","value":"v","ttl":0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_ttl_request() {
    let (app, cache) = create_test_app();
    cache.set("session", "v", None).await;

    let response = app
        .clone()
        .oneshot(put_json(
            "/set",
            r#"{"key":"k","value":"v","ttl":18446744073709551615}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_json(
            "/expire/session",
            r#"{"seconds":18446744073709551615}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(cache.get("session").await.as_deref(), Some("v"));
}

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let (app, _cache) = create_test_app();

    let response = app
        .clone()
        .oneshot(put_json("/set", r#"{"key":"short","value":"lived","ttl":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app.oneshot(bare("GET", "/get/short")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == DELETE ==

#[tokio::test]
async fn test_delete_endpoint() {
    let (app, cache) = create_test_app();
    cache.set("doomed", "v", None).await;

    let response = app.clone().oneshot(bare("DELETE", "/del/doomed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "doomed");

    let response = app.oneshot(bare("DELETE", "/del/doomed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == KEYS / FLUSH ==

#[tokio::test]
async fn test_keys_endpoint_with_pattern() {
    let (app, cache) = create_test_app();
    cache.set("intent:profit", "{}", None).await;
    cache.set("intent:balance", "{}", None).await;
    cache.set("chart:BTC", "png", None).await;

    let response = app
        .oneshot(bare("GET", "/keys?pattern=intent:*"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["pattern"], "intent:*");
    assert_eq!(
        json["keys"],
        serde_json::json!(["intent:balance", "intent:profit"])
    );
}

#[tokio::test]
async fn test_keys_endpoint_default_pattern() {
    let (app, cache) = create_test_app();
    cache.set("one", "1", None).await;

    let response = app.oneshot(bare("GET", "/keys")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["keys"], serde_json::json!(["one"]));
}

#[tokio::test]
async fn test_flush_endpoint() {
    let (app, cache) = create_test_app();
    for key in ["a", "b", "c"] {
        cache.set(key, "1", None).await;
    }

    let response = app.oneshot(bare("DELETE", "/flush")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["namespace"], "api_test:");
    assert!(cache.keys("*").await.is_empty());
}

// == INCR / EXPIRE ==

#[tokio::test]
async fn test_incr_endpoint() {
    let (app, _cache) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json("/incr/requests", r#"{"amount":5}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await["value"], 5);

    let response = app
        .oneshot(post_json("/incr/requests", r#"{"amount":3}"#))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await["value"], 8);
}

#[tokio::test]
async fn test_incr_overflow_is_conflict() {
    let (app, cache) = create_test_app();
    cache.set("max", &i64::MAX.to_string(), None).await;

    let response = app.oneshot(bare("POST", "/incr/max")).await.unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_expire_endpoint() {
    let (app, cache) = create_test_app();
    cache.set("session", "v", None).await;

    let response = app
        .clone()
        .oneshot(post_json("/expire/session", r#"{"seconds":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/expire/nobody", r#"{"seconds":1}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(!cache.exists("session").await);
}

// == STATS / HEALTH ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, cache) = create_test_app();
    cache.set("k", "v", None).await;
    cache.get("k").await;
    cache.get("k").await;
    cache.get("missing").await;

    let response = app.oneshot(bare("GET", "/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["namespace"], "api_test:");
    assert_eq!(json["hits"], 2);
    assert_eq!(json["misses"], 1);
    let hit_rate = json["hit_rate"].as_f64().unwrap();
    assert!((hit_rate - 2.0 / 3.0).abs() < 0.001);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _cache) = create_test_app();

    let response = app.oneshot(bare("GET", "/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["backend"], "memory");
    assert!(json["timestamp"].is_string());
}
