//! Tests for the HTTP client module

use super::*;
use crate::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(base: &str, path: &str) -> Url {
    Url::parse(&format!("{base}{path}")).unwrap()
}

#[test]
fn client_config_defaults() {
    let config = ClientConfig::default();
    assert_eq!(config.connect_timeout, std::time::Duration::from_secs(5));
    assert_eq!(config.request_timeout, std::time::Duration::from_secs(5));
    assert!(config.user_agent.starts_with("pagefeed/"));
}

#[test]
fn page_request_builders() {
    let request = PageRequest::get(Url::parse("https://example.com/api/v1/users").unwrap())
        .with_header("Authorization", "Bearer token");

    assert_eq!(request.method, reqwest::Method::GET);
    assert_eq!(request.headers.get("authorization").unwrap(), "Bearer token");
}

#[tokio::test]
async fn send_reads_body_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Pages", "3")
                .set_body_json(serde_json::json!({"data": [{"id": 1}]})),
        )
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let response = client
        .send(PageRequest::get(url(&server.uri(), "/api/v1/users")))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.header("x-total-pages"), Some("3".to_string()));
    assert_eq!(response.json().unwrap()["data"][0]["id"], 1);
}

#[tokio::test]
async fn send_keeps_backing_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let request = PageRequest::get(url(&server.uri(), "/api/v1/users"));
    let response = client.send(request.clone()).await.unwrap();

    assert_eq!(response.request().unwrap().url, request.url);
}

#[tokio::test]
async fn send_forwards_request_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let response = client
        .send(
            PageRequest::get(url(&server.uri(), "/api/v1/protected"))
                .with_header("Authorization", "Bearer test-token"),
        )
        .await
        .unwrap();

    assert_eq!(response.json().unwrap()["ok"], true);
}

#[tokio::test]
async fn send_maps_error_statuses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = HttpClient::new();
    let error = client
        .send(PageRequest::get(url(&server.uri(), "/api/v1/users")))
        .await
        .unwrap_err();

    match error {
        Error::HttpStatus { status, .. } => assert_eq!(status, 503),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
    assert!(error.is_retryable());
}

#[tokio::test]
async fn taps_fire_around_transactions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let requests = Arc::new(AtomicUsize::new(0));
    let responses = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));

    let mut taps = TapCallbacks::default();
    let seen = Arc::clone(&requests);
    taps.on_request(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let seen = Arc::clone(&responses);
    taps.on_response(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let seen = Arc::clone(&errors);
    taps.on_error(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let client = HttpClient::new().with_taps(taps);
    client
        .send(PageRequest::get(url(&server.uri(), "/ok")))
        .await
        .unwrap();
    client
        .send(PageRequest::get(url(&server.uri(), "/boom")))
        .await
        .unwrap_err();

    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert_eq!(responses.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}
