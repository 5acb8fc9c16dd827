#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use promptforge_api::config::{LogFormat, ServerConfig, StoreBackend};
use promptforge_api::router::build_app_router;
use promptforge_api::state::AppState;
use promptforge_queue::{ImageQueue, ManualClock, MemoryJobStore, QueueConfig};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        database_max_connections: 1,
        queue_monitor_interval_secs: 60,
        log_format: LogFormat::Pretty,
        queue: QueueConfig {
            public_base_url: "http://test.local".to_string(),
            ..QueueConfig::default()
        },
    }
}

/// Handles a test keeps alongside the router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    pub clock: Arc<ManualClock>,
}

/// Build the full application router over an in-memory store and a
/// manual clock, with the same middleware stack production uses.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryJobStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap(),
    ));
    let queue = ImageQueue::new(store.clone(), clock.clone(), config.queue.clone());

    let state = AppState {
        queue,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        clock,
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
