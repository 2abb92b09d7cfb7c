//! End-to-end tests for the HTTP API.
//!
//! Each test boots the full router over an in-memory store on an
//! OS-assigned port and talks to it with a real HTTP client.
//!
//! Test coverage includes:
//! - Create / preview / consume flow over the wire
//! - Validation failures mapped to HTTP status codes
//! - Uniform 404 for consumed and never-existing notes
//! - Per-identity rate limiting keyed by the forwarding header
//! - Status and liveness endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use ember::config::EmberConfig;
use ember::kv::InMemoryBackend;
use ember::server::build_router;
use ember::state::AppState;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Boot the service on an OS-assigned port and return the API base URL.
async fn spawn_server(config: EmberConfig) -> String {
    let state = AppState::new(config, Arc::new(InMemoryBackend::new()));
    let router = build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    format!("http://{addr}/api")
}

/// Small limits so validation tests stay cheap; generous rate limits so
/// unrelated tests never trip them.
fn test_config() -> EmberConfig {
    EmberConfig {
        size_limit_bytes: 1024,
        meta_limit_bytes: 128,
        max_views: 10,
        max_expiration_minutes: 60,
        rate_limit_create_per_minute: 100,
        rate_limit_read_per_minute: 100,
        ..EmberConfig::default()
    }
}

#[tokio::test]
async fn test_create_preview_consume_flow() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "the payload", "meta": "cipher-params", "views": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 32);

    // Preview reveals metadata only and does not consume.
    let response = client
        .get(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["meta"], "cipher-params");
    assert!(body.get("contents").is_none());

    // Both budgeted views are served, then the note is gone.
    for _ in 0..2 {
        let response = client
            .delete(format!("{base}/notes/{id}"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["contents"], "the payload");
        assert_eq!(body["meta"], "cipher-params");
    }

    let response = client
        .delete(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_failures_map_to_http_statuses() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    // Contents over the configured limit.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "a".repeat(1025), "meta": "m", "views": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Metadata over the configured limit.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m".repeat(129), "views": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No retirement policy at all.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Views outside the configured range.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m", "views": 11}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Expiration outside the configured range.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m", "expiration": 61}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_consumed_and_unknown_notes_are_indistinguishable() {
    let base = spawn_server(test_config()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{base}/notes/no-such-note"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let unknown_body = response.text().await.unwrap();

    // Create and burn a single-view note.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m", "views": 1}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();
    client
        .delete(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let consumed_body = response.text().await.unwrap();

    // Same status, same body: nothing distinguishes the two cases.
    assert_eq!(unknown_body, consumed_body);
}

#[tokio::test]
async fn test_create_rate_limit_keyed_by_forwarding_header() {
    let mut config = test_config();
    config.rate_limit_create_per_minute = 2;
    let base = spawn_server(config).await;
    let client = reqwest::Client::new();

    let payload = json!({"contents": "s", "meta": "m", "views": 1});
    for _ in 0..2 {
        let response = client
            .post(format!("{base}/notes"))
            .header("cf-connecting-ip", "203.0.113.5")
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = client
        .post(format!("{base}/notes"))
        .header("cf-connecting-ip", "203.0.113.5")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different forwarded identity has its own budget.
    let response = client
        .post(format!("{base}/notes"))
        .header("cf-connecting-ip", "203.0.113.6")
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_previews_and_consumes_share_the_read_budget() {
    let mut config = test_config();
    config.rate_limit_read_per_minute = 1;
    let base = spawn_server(config).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/notes"))
        .header("cf-connecting-ip", "203.0.113.7")
        .json(&json!({"contents": "s", "meta": "m", "views": 1}))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    // The preview spends the single read slot...
    let response = client
        .get(format!("{base}/notes/{id}"))
        .header("cf-connecting-ip", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // ...so the consume within the same window is rejected.
    let response = client
        .delete(format!("{base}/notes/{id}"))
        .header("cf-connecting-ip", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_advanced_policies_coerced_when_disabled() {
    let mut config = test_config();
    config.allow_advanced = false;
    let base = spawn_server(config).await;
    let client = reqwest::Client::new();

    // Out-of-range values are forgiven, the note becomes single-view.
    let response = client
        .post(format!("{base}/notes"))
        .json(&json!({"contents": "s", "meta": "m", "views": 50, "expiration": 9999}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    let response = client
        .delete(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .delete(format!("{base}/notes/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_advertises_limits_and_branding() {
    let mut config = test_config();
    config.allow_advanced = false;
    config.theme.page_title = "Vault".to_string();
    config.theme.imprint_url = "https://example.com/imprint".to_string();
    let base = spawn_server(config).await;

    let response = reqwest::get(format!("{base}/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["max_size"], 1024);
    assert_eq!(body["max_views"], 10);
    assert_eq!(body["max_expiration"], 60);
    assert_eq!(body["allow_advanced"], false);
    assert_eq!(body["allow_files"], true);
    assert_eq!(body["theme_page_title"], "Vault");
    assert_eq!(body["imprint_url"], "https://example.com/imprint");
    assert_eq!(body["imprint_html"], "");
}

#[tokio::test]
async fn test_live_probe_round_trips_the_store() {
    let base = spawn_server(test_config()).await;

    let response = reqwest::get(format!("{base}/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"ok": true}));
}
