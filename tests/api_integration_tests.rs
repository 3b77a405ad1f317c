//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a
//! temporary cache directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use streamtube::{
    api::create_router,
    cache::{FileStore, ManualClock, StoreConfig},
    search::{SearchProvider, SearchService, StreamUrlBuilder, VideoHit},
    AppState, Result,
};
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

/// Provider returning one fixed hit per query and counting calls.
#[derive(Default)]
struct FakeProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl SearchProvider for FakeProvider {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<VideoHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![VideoHit {
            id: "abc123".to_string(),
            title: format!("{} mix", query),
            author: "Lofi Girl".to_string(),
            length_seconds: Some(3725),
            thumbnail: Some("http://img.test/abc123.jpg".to_string()),
        }])
    }
}

struct TestApp {
    router: Router,
    cache: Arc<FileStore>,
    clock: Arc<ManualClock>,
    provider: Arc<FakeProvider>,
}

async fn create_test_app(dir: &TempDir) -> TestApp {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let config = StoreConfig {
        root: dir.path().join("cache"),
        default_ttl: 3600,
        max_entries: Some(100),
    };
    let cache = Arc::new(FileStore::with_clock(config, clock.clone()).await.unwrap());
    let provider = Arc::new(FakeProvider::default());
    let urls = StreamUrlBuilder::new("http://stream.test", "secret");
    let search = SearchService::new(cache.clone(), provider.clone(), urls, 10);

    TestApp {
        router: create_router(AppState::new(cache.clone(), search)),
        cache,
        clock,
        provider,
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Search Endpoint Tests ==

#[tokio::test]
async fn test_search_endpoint_returns_stream_urls() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(json_request("POST", "/api/search", r#"{"query":"Lofi Beats"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let song = &json["songs"][0];
    assert_eq!(song["id"], "abc123");
    assert_eq!(song["title"], "lofi beats mix");
    assert_eq!(song["artist"], "Lofi Girl");
    assert_eq!(song["duration"], "1:02:05");
    assert_eq!(song["url"], "http://stream.test/abc123?key=secret");
}

#[tokio::test]
async fn test_search_endpoint_uses_cache_for_normalized_query() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    for query in ["Lofi Beats ", "  lofi beats", "LOFI BEATS"] {
        let body = format!(r#"{{"query":"{}"}}"#, query);
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/search", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 1);
    assert!(app.cache.get("search_lofi beats").await.is_some());
}

#[tokio::test]
async fn test_search_endpoint_refetches_after_expiry() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;
    let request = || json_request("POST", "/api/search", r#"{"query":"jazz"}"#);

    app.router.clone().oneshot(request()).await.unwrap();
    app.clock.advance_secs(3601);
    app.router.clone().oneshot(request()).await.unwrap();

    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_search_endpoint_empty_query() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(json_request("POST", "/api/search", r#"{"query":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("Query"));
}

#[tokio::test]
async fn test_stream_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(empty_request("GET", "/api/stream/xyz789"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["stream_url"], "http://stream.test/xyz789?key=secret");
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_set_then_get_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let set_response = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/cache",
            r#"{"key":"get_key","value":[{"id":"abc123"}],"ttl":60}"#,
        ))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);
    let json = body_to_json(set_response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("get_key"));

    let get_response = app
        .router
        .oneshot(empty_request("GET", "/cache/get_key"))
        .await
        .unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "get_key");
    assert_eq!(json["value"][0]["id"], "abc123");
    assert_eq!(json["ttl"], 60);
    assert!(json["expires_at"].as_str().is_some());
}

#[tokio::test]
async fn test_set_endpoint_invalid_ttl() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(json_request("PUT", "/cache", r#"{"key":"k","value":1,"ttl":0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_endpoint_malformed_json() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(json_request("PUT", "/cache", r#"{"key":"k""#))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_get_endpoint_expired() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    app.cache.set("short", "v", Some(5)).await.unwrap();
    app.clock.advance_secs(5);

    let response = app
        .router
        .oneshot(empty_request("GET", "/cache/short"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    app.cache.set("delete_key", "v", None).await.unwrap();

    let del_response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/cache/delete_key"))
        .await
        .unwrap();
    assert_eq!(del_response.status(), StatusCode::OK);

    let again = app
        .router
        .oneshot(empty_request("DELETE", "/cache/delete_key"))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    app.router
        .clone()
        .oneshot(json_request("POST", "/api/search", r#"{"query":"jazz"}"#))
        .await
        .unwrap();
    app.cache.set("other", "v", None).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/cache"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 2);
    assert!(app.cache.get("other").await.is_none());

    // Cleared results are fetched again
    app.router
        .oneshot(json_request("POST", "/api/search", r#"{"query":"jazz"}"#))
        .await
        .unwrap();
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_sweep_endpoint_reports_removed() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    app.cache
        .set("search_lofi beats", &vec!["abc123"], Some(3600))
        .await
        .unwrap();
    app.cache.set("keeper", "v", Some(7200)).await.unwrap();
    app.clock.advance_secs(3601);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("POST", "/cache/sweep"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 1);
    assert_eq!(json["evicted"], 0);

    let second = app
        .router
        .oneshot(empty_request("POST", "/cache/sweep"))
        .await
        .unwrap();
    let json = body_to_json(second.into_body()).await;
    assert_eq!(json["removed"], 0);
}

#[tokio::test]
async fn test_stats_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    app.cache.set("key1", "v", None).await.unwrap();
    app.cache.get("key1").await;
    app.cache.get("missing").await;

    let response = app
        .router
        .oneshot(empty_request("GET", "/stats"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let app = create_test_app(&dir).await;

    let response = app
        .router
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_cached_results_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let app = create_test_app(&dir).await;
        app.router
            .oneshot(json_request("POST", "/api/search", r#"{"query":"ambient"}"#))
            .await
            .unwrap();
        assert_eq!(app.provider.calls.load(Ordering::SeqCst), 1);
    }

    let restarted = create_test_app(&dir).await;
    let response = restarted
        .router
        .oneshot(json_request("POST", "/api/search", r#"{"query":"Ambient"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(restarted.provider.calls.load(Ordering::SeqCst), 0);
}
