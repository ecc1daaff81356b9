//! Integration tests for health probing, stats and the keep-alive timer.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use travel_client::{BackendClient, ClientConfig, QueryError};

#[tokio::test]
async fn healthy_backend_reports_true() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::serve(common::travel_backend(hits.clone())).await;
    let client = common::client_for(&base);

    assert_eq!(client.health_status(), None);
    assert!(client.check_health().await);
    assert_eq!(client.health_status(), Some(true));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn health_request_bypasses_caches() {
    let router = Router::new().route(
        "/health",
        get(|headers: HeaderMap| async move {
            let no_cache = |name: &str| {
                headers.get(name).and_then(|v| v.to_str().ok()) == Some("no-cache")
            };
            if no_cache("cache-control") && no_cache("pragma") {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            }
        }),
    );
    let base = common::serve(router).await;
    let client = common::client_for(&base);

    assert_eq!(client.probe_health().await.unwrap(), StatusCode::OK);
}

#[tokio::test]
async fn not_found_reports_false() {
    let base = common::serve(Router::new()).await;
    let client = common::client_for(&base);

    assert!(!client.check_health().await);
    assert_eq!(client.health_status(), Some(false));
    let err = client.probe_health().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn connection_refused_reports_false() {
    let client = common::client_for(&common::refused_url());

    assert!(!client.check_health().await);
    assert!(matches!(
        client.probe_health().await,
        Err(QueryError::Network(_))
    ));
}

#[tokio::test]
async fn slow_health_endpoint_reports_false() {
    let router = Router::new().route(
        "/health",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            StatusCode::OK
        }),
    );
    let base = common::serve(router).await;
    let client = common::client_for(&base);

    assert!(!client.check_health().await);
    assert!(client.probe_health().await.unwrap_err().is_timeout());
}

#[tokio::test]
async fn health_subscribers_see_latest_result() {
    let base = common::serve(common::travel_backend(Arc::new(AtomicUsize::new(0)))).await;
    let client = common::client_for(&base);
    let mut rx = client.subscribe_health();

    client.check_health().await;
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow(), Some(true));
}

#[tokio::test]
async fn stats_are_decoded() {
    let base = common::serve(common::travel_backend(Arc::new(AtomicUsize::new(0)))).await;
    let client = common::client_for(&base);

    let stats = client.fetch_stats().await.unwrap();
    assert_eq!(stats.cache_size, 3);
    assert_eq!(stats.status, "operational");
}

fn keep_alive_client(base: &str, interval: Duration) -> BackendClient {
    let mut config = ClientConfig::with_base_url(base);
    config.keep_alive_interval = interval;
    config.health_timeout = Duration::from_millis(500);
    BackendClient::new(config).expect("client should build")
}

#[tokio::test]
async fn keep_alive_pings_until_stopped() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::serve(common::travel_backend(hits.clone())).await;
    let client = keep_alive_client(&base, Duration::from_millis(100));
    assert!(client.is_keep_alive_running(), "armed at construction");

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(hits.load(Ordering::SeqCst) >= 2, "expected pings while armed");
    assert_eq!(client.health_status(), Some(true));

    assert!(client.stop_keep_alive());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_stop = hits.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(hits.load(Ordering::SeqCst), after_stop);
}

#[tokio::test]
async fn dropping_client_stops_keep_alive() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::serve(common::travel_backend(hits.clone())).await;
    let client = keep_alive_client(&base, Duration::from_millis(100));

    tokio::time::sleep(Duration::from_millis(150)).await;
    drop(client);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_drop = hits.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(hits.load(Ordering::SeqCst), after_drop);
}

#[tokio::test]
async fn keep_alive_survives_unreachable_backend() {
    let client = keep_alive_client(&common::refused_url(), Duration::from_millis(50));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(client.is_keep_alive_running());
    assert_eq!(client.health_status(), Some(false));
}
