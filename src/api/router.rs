use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::cache;
use super::health;
use super::state::AppState;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .route("/api/", get(health::app_info))
        .nest("/api", cache::create_cache_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::domain::embedding::{MockEmbeddingProvider, MockFailure};
    use crate::domain::semantic_cache::SemanticCacheConfig;
    use crate::infrastructure::index::{HnswConfig, HnswIndex};
    use crate::infrastructure::services::{RefreshService, SemanticCacheService};
    use crate::infrastructure::snapshot::{read_snapshot, JsonlSnapshotWriter};
    use crate::infrastructure::storage::InMemoryRecordStore;

    struct TestApp {
        router: Router,
        cache: Arc<SemanticCacheService>,
        dir: TempDir,
    }

    fn app_with(provider: MockEmbeddingProvider) -> TestApp {
        let dir = TempDir::new().unwrap();
        let config = SemanticCacheConfig::new().with_dimensions(3).with_threshold(0.1);

        let cache = Arc::new(
            SemanticCacheService::new(
                Arc::new(provider),
                Arc::new(InMemoryRecordStore::new(3)),
                Box::new(HnswIndex::new(3, HnswConfig::default().with_seed(7)).unwrap()),
                &config,
            )
            .unwrap(),
        );
        let writer = JsonlSnapshotWriter::new(
            dir.path().join("current.jsonl"),
            dir.path(),
            Duration::from_secs(5),
        );
        let refresh = Arc::new(RefreshService::new(Arc::clone(&cache), Arc::new(writer)));

        TestApp {
            router: create_router(AppState::new(Arc::clone(&cache), refresh)),
            cache,
            dir,
        }
    }

    fn app() -> TestApp {
        app_with(
            MockEmbeddingProvider::new("mock", 3)
                .with_vector("rust", vec![1.0, 0.0, 0.0])
                .with_vector("rust lang", vec![0.99, 0.05, 0.0])
                .with_vector("cooking", vec![0.0, 1.0, 0.0]),
        )
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    #[tokio::test]
    async fn test_app_info() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/api/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "app is healthy, and safely running");
        assert_eq!(body["data"]["app_version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_probes() {
        let app = app();

        assert_eq!(send(&app.router, "GET", "/health", None).await.0, StatusCode::OK);
        assert_eq!(send(&app.router, "GET", "/live", None).await.0, StatusCode::OK);

        let (status, body) = send(&app.router, "GET", "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_vectorize() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/api/vectorize/rust", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "embeddings created successfully");
        assert_eq!(body["data"]["response"], json!([1.0, 0.0, 0.0]));
        assert_eq!(app.cache.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_miss_then_hit() {
        let app = app();

        let (status, body) = send(&app.router, "POST", "/api/search/rust", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["response"].is_null());
        assert!(body["data"]["score"].is_null());

        let (status, body) = send(&app.router, "POST", "/api/search/rust%20lang", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "data saved in vector database");
        assert_eq!(body["data"]["response"], "rust");
        assert!(body["data"]["score"].as_f64().unwrap() <= 0.1);

        let (_, body) = send(&app.router, "POST", "/api/search/cooking", None).await;
        assert!(body["data"]["response"].is_null());
        assert_eq!(app.cache.store().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_insertion() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/insertion/rust",
            Some(json!({"embedding": [1.0, 0.0, 0.0], "metadata": {"file": "intro.md", "chunk": 0}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["response"], "embeddings of rust saved");
        assert!(body["data"]["id"].is_string());

        let (_, body) = send(&app.router, "POST", "/api/search/rust%20lang", None).await;
        assert_eq!(body["data"]["response"], "rust");
    }

    #[tokio::test]
    async fn test_insertion_dimension_mismatch() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/insertion/rust",
            Some(json!({"embedding": [1.0, 0.0]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "dimension_mismatch");
        assert_eq!(app.cache.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insertion_malformed_body() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/insertion/rust",
            Some(json!({"vector": [1.0, 0.0, 0.0]})),
        )
        .await;

        assert!(status.is_client_error());
        assert_eq!(body["error"]["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_search_with_provider_down() {
        let app = app_with(MockEmbeddingProvider::new("mock", 3).with_failure(MockFailure::Unavailable));
        let (status, body) = send(&app.router, "POST", "/api/search/rust", None).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["type"], "service_unavailable_error");
        assert_eq!(app.cache.store().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refresh_exports_and_clears() {
        let app = app();
        send(&app.router, "POST", "/api/search/rust", None).await;
        send(&app.router, "POST", "/api/search/cooking", None).await;

        let (status, body) = send(&app.router, "DELETE", "/api/refresh/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "database refreshed");
        assert!(body["data"]["response"].is_null());
        assert_eq!(body["data"]["exported"], 2);

        let snapshot = tokio_test::assert_ok!(read_snapshot(&app.dir.path().join("current.jsonl")).await);
        assert_eq!(snapshot.len(), 2);

        let (_, body) = send(&app.router, "POST", "/api/search/rust", None).await;
        assert!(body["data"]["response"].is_null());
    }

    #[tokio::test]
    async fn test_stats() {
        let app = app();
        send(&app.router, "POST", "/api/search/rust", None).await;
        send(&app.router, "POST", "/api/search/rust%20lang", None).await;

        let (status, body) = send(&app.router, "GET", "/api/stats", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["records"], 2);
        assert_eq!(body["data"]["indexed"], 2);
        assert_eq!(body["data"]["hits"], 1);
        assert_eq!(body["data"]["misses"], 1);
        assert_eq!(body["data"]["hit_rate"], 50.0);
    }
}
