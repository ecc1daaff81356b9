//! In-process mock travel backend built on axum. No mocks of the client itself:
//! every test talks HTTP to a real listener on 127.0.0.1.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Json, Router};
use travel_client::{BackendClient, ClientConfig};

/// Serve `router` on a free port of the current runtime; returns the base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Serve `make_router()` from its own thread and runtime, for tests that run
/// the binary as a subprocess.
pub fn serve_in_thread(make_router: fn() -> Router) -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, make_router()).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

/// A URL where nothing is listening.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

/// Client without keep-alive and with short deadlines so timeout tests stay fast.
pub fn client_for(base_url: &str) -> BackendClient {
    let mut config = ClientConfig::with_base_url(base_url);
    config.keep_alive_on_start = false;
    config.query_timeout = Duration::from_millis(500);
    config.health_timeout = Duration::from_millis(500);
    BackendClient::new(config).expect("client should build")
}

/// Full reply for the Paris sample query.
pub fn paris_reply() -> serde_json::Value {
    serde_json::json!({
        "reply": "Paris is lovely this week.",
        "location_info": {"name": "Paris", "country": "France", "lat": 48.8566, "lon": 2.3522},
        "weather_data": {"temperature": 18.5, "precipitation_probability": 20.0},
        "places_data": [
            {"name": "Louvre", "category": "museum", "lat": 48.8606, "lon": 2.3376},
            {"name": "Jardin du Luxembourg"}
        ]
    })
}

/// Backend answering every query with [`paris_reply`] and counting health pings.
pub fn travel_backend(health_hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/api/query", post(|| async { Json(paris_reply()) }))
        .route(
            "/health",
            get(move || {
                let hits = health_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(serde_json::json!({"status": "healthy"}))
                }
            }),
        )
        .route(
            "/api/stats",
            get(|| async { Json(serde_json::json!({"cache_size": 3, "status": "operational"})) }),
        )
}
