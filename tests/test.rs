use axum::{async_trait, http::StatusCode};
use std::{future::IntoFuture, sync::Arc};
use visit_counter::prelude::*;
use visit_counter::store::StoreResult;

fn app(store: &Arc<MemoryMetricStore>, mode: CountMode) -> App {
    let shared: SharedStore = store.clone();
    App::new().router(routes()).inject(shared).inject(mode)
}

#[tokio::test]
async fn test() -> anyhow::Result<()> {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    assert_eq!("1 Website Visit!\n", server.get("/").await.text());
    assert_eq!("2 Website Visit!\n", server.get("/").await.text());
    assert_eq!("3 Website Visit!\n", server.get("/").await.text());
    assert_eq!(store.len(), 3);
    assert_eq!("Hello, HTTP!\n", server.get("/hello").await.text());
    Ok(())
}

#[tokio::test]
async fn test_count_is_latest_id_not_row_count() {
    let store = Arc::new(MemoryMetricStore::starting_at(100));
    let server = app(&store, CountMode::LatestId).as_test_server();
    assert_eq!("100 Website Visit!\n", server.get("/").await.text());
    assert_eq!("101 Website Visit!\n", server.get("/").await.text());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_row_count_mode() {
    let store = Arc::new(MemoryMetricStore::starting_at(100));
    let server = app(&store, CountMode::RowCount).as_test_server();
    assert_eq!("1 Website Visit!\n", server.get("/").await.text());
    assert_eq!("2 Website Visit!\n", server.get("/").await.text());
}

#[tokio::test]
async fn test_only_exact_root_counts() {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    for path in ["/x", "/hello/", "/x/y", "/index.html"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
        assert_eq!(response.text(), "404 page not found\n");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_hello_never_touches_store() {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    for _ in 0..10 {
        let response = server.get("/hello").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), "Hello, HTTP!\n");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_write_is_reported_and_not_persisted() {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    server.get("/").await;

    store.fail_at(FailurePoint::Insert);
    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text();
    assert!(body.starts_with("Error counting: write failed"), "{body}");
    assert!(body.ends_with('\n'));
    assert_eq!(store.len(), 1);

    store.fail_at(FailurePoint::Rollback);
    let body = server.get("/").await.text();
    assert!(body.contains("error rolling back transaction"), "{body}");
    assert!(body.contains("insert rejected"), "{body}");
    assert_eq!(store.len(), 1);

    store.heal();
    assert_eq!("2 Website Visit!\n", server.get("/").await.text());
}

#[tokio::test]
async fn test_unavailable_store() {
    let store = Arc::new(MemoryMetricStore::new());
    store.fail_at(FailurePoint::Begin);
    let server = app(&store, CountMode::LatestId).as_test_server();
    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().contains("failed starting transaction"));
}

#[tokio::test]
async fn test_failed_read_after_successful_write() {
    let store = Arc::new(MemoryMetricStore::new());
    store.fail_at(FailurePoint::Read);
    let server = app(&store, CountMode::LatestId).as_test_server();
    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().starts_with("Error fetching data: read failed"));
    assert_eq!(store.len(), 1);
}

/// Accepts writes but never finds a row, like a table truncated between the
/// insert and the read.
struct Vanishing;

#[async_trait]
impl MetricStore for Vanishing {
    async fn record_visit(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn latest_count(&self) -> StoreResult<i64> {
        Err(StoreError::NoData)
    }

    async fn total_visits(&self) -> StoreResult<i64> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_no_data_is_not_a_zero_count() {
    let shared: SharedStore = Arc::new(Vanishing);
    let server = App::new()
        .router(routes())
        .inject(shared)
        .inject(CountMode::LatestId)
        .as_test_server();
    let response = server.get("/").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "Error fetching data: no data found\n");
}

#[tokio::test]
async fn test_concurrent_visits_are_all_recorded() {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    let responses = tokio::join!(
        server.get("/").into_future(),
        server.get("/").into_future(),
        server.get("/").into_future(),
        server.get("/").into_future(),
        server.get("/").into_future(),
        server.get("/").into_future(),
    );
    for response in [
        responses.0, responses.1, responses.2, responses.3, responses.4, responses.5,
    ] {
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(response.text().ends_with(" Website Visit!\n"));
    }
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn test_status_and_metrics() {
    let store = Arc::new(MemoryMetricStore::new());
    let server = app(&store, CountMode::LatestId).as_test_server();
    assert_eq!(server.get("/status/liveness").await.status_code(), StatusCode::OK);
    server.get("/").await;
    let metrics = server.get("/metrics/prometheus").await.text();
    assert!(metrics.contains("website_visits_total"));
    assert!(metrics.contains("axum_http_requests"));
}

#[tokio::test]
async fn test_custom_route() {
    let server = App::new()
        .route("/extra", get(|| async { "extra" }))
        .as_test_server();
    assert_eq!("extra", server.get("/extra").await.text());
}
