//! End-to-end tests of the HTTP API over a file-backed registry.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use secret_store::api::build_router;
use secret_store::dispatch::{MethodRegistry, SharedStoreMethod};
use secret_store::storage::FileStore;

struct TestApp {
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    /// Registers "local" and "remote" over two separate files.
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let local = FileStore::open(dir.path().join("local.json")).await.unwrap();
        let remote = FileStore::open(dir.path().join("remote.json")).await.unwrap();

        let mut registry = MethodRegistry::new();
        registry.register("local", Arc::new(SharedStoreMethod::new(Arc::new(local))));
        registry.register("remote", Arc::new(SharedStoreMethod::new(Arc::new(remote))));

        Self { router: build_router(Arc::new(registry)), _dir: dir }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn set(&self, getter: &str, value: &str, method: &str, cipher: &str) -> (StatusCode, Vec<u8>) {
        let body = json!({ "getter": getter, "value": value, "method": method });
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header("cipher", cipher)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, key: &str, method: &str, cipher: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(format!("/?key={}&method={}", key, method))
            .header("cipher", cipher)
            .body(Body::empty())
            .unwrap();
        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }
}

#[tokio::test]
async fn set_then_get_returns_value() {
    let app = TestApp::new().await;

    let (status, body) = app.set("alpha", "top secret", "local", "pw").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, body) = app.get("alpha", "local", "pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "value": "top secret" }));
}

#[tokio::test]
async fn wrong_passphrase_is_server_error() {
    let app = TestApp::new().await;
    app.set("alpha", "top secret", "local", "pw").await;

    // Lookup keys do not depend on the passphrase, so the record is found
    // and fails authentication.
    let (status, body) = app.get("alpha", "local", "other").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("cannot decode"));
    assert!(!message.contains("top secret"));
}

#[tokio::test]
async fn missing_key_is_server_error() {
    let app = TestApp::new().await;

    let (status, body) = app.get("nothing", "local", "pw").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "cannot read data: secret not found");
}

#[tokio::test]
async fn unknown_method_is_bad_request() {
    let app = TestApp::new().await;

    let (status, _) = app.set("alpha", "v", "vault", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("alpha", "vault", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("vault"));
}

#[tokio::test]
async fn empty_key_is_bad_request() {
    let app = TestApp::new().await;

    let (status, _) = app.get("", "local", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.set("", "v", "local", "pw").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("cipher", "pw")
        .body(Body::from("{\"getter\": \"alpha\", \"value\": "))
        .unwrap();

    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("malformed JSON"));
}

#[tokio::test]
async fn empty_value_deletes_secret() {
    let app = TestApp::new().await;
    app.set("alpha", "top secret", "local", "pw").await;

    let (status, _) = app.set("alpha", "", "local", "pw").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get("alpha", "local", "pw").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn methods_are_isolated() {
    let app = TestApp::new().await;
    app.set("alpha", "local value", "local", "pw").await;
    app.set("alpha", "remote value", "remote", "pw").await;

    let (_, local) = app.get("alpha", "local", "pw").await;
    let (_, remote) = app.get("alpha", "remote", "pw").await;
    assert_eq!(local["value"], "local value");
    assert_eq!(remote["value"], "remote value");
}

#[tokio::test]
async fn secret_written_locally_is_absent_remotely() {
    let app = TestApp::new().await;
    let (status, _) = app.set("alpha", "top secret", "local", "pw").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get("alpha", "remote", "pw").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "cannot read data: secret not found");

    let (status, body) = app.get("alpha", "local", "pw").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], "top secret");
}

#[tokio::test]
async fn missing_cipher_header_uses_empty_passphrase() {
    let app = TestApp::new().await;
    app.set("alpha", "open", "local", "").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/?key=alpha&method=local")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["value"], "open");
}

#[tokio::test]
async fn ping_and_health() {
    let app = TestApp::new().await;

    let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b".");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], "ok");
}
