//! Shared utilities for integration testing the webhook receiver.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use webhook_gate::{
    ErrorKind, ErrorListener, UpdateProcessor, WebhookConfig, WebhookError, WebhookServer,
};

/// Token used by most tests. Deliberately URL-safe.
pub const TEST_TOKEN: &str = "hook-s3cr3t-0123456789";

/// Configuration bound to an ephemeral loopback port.
pub fn test_config(token: &str) -> WebhookConfig {
    WebhookConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_token: token.to_string(),
        shutdown_grace_ms: Some(500),
        ..WebhookConfig::default()
    }
}

/// Absolute path to a file under `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// HTTP client that does not hold idle connections open between requests,
/// so shutdown in the tests never waits on the client's pool.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .expect("client construction")
}

/// Client for talking to listeners serving the self-signed fixtures.
pub fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .expect("client construction")
}

/// Processor that records every update it receives.
#[derive(Default)]
pub struct RecordingProcessor {
    updates: Mutex<Vec<Value>>,
}

impl RecordingProcessor {
    pub fn received(&self) -> Vec<Value> {
        self.updates.lock().unwrap().clone()
    }
}

impl UpdateProcessor for RecordingProcessor {
    fn process_update(&self, update: Value) {
        self.updates.lock().unwrap().push(update);
    }
}

/// Error listener that records the kind of every reported failure.
#[derive(Default)]
pub struct RecordingListener {
    kinds: Mutex<Vec<ErrorKind>>,
}

impl RecordingListener {
    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.kinds.lock().unwrap().clone()
    }
}

impl ErrorListener for RecordingListener {
    fn on_webhook_error(&self, error: &WebhookError) {
        self.kinds.lock().unwrap().push(error.kind());
    }
}

/// An open server plus the collaborators the tests observe.
pub struct TestServer {
    pub server: WebhookServer,
    pub base_url: String,
    pub processor: Arc<RecordingProcessor>,
    pub listener: Arc<RecordingListener>,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }
}

/// Construct and open a server with the stock test configuration.
pub async fn spawn_server() -> TestServer {
    spawn_server_with(test_config(TEST_TOKEN)).await
}

/// Construct and open a server with the given configuration.
pub async fn spawn_server_with(config: WebhookConfig) -> TestServer {
    let processor = Arc::new(RecordingProcessor::default());
    let listener = Arc::new(RecordingListener::default());

    let server = WebhookServer::new(config, processor.clone())
        .await
        .expect("server construction");
    server.set_error_listener(listener.clone());
    server.open().await.expect("server open");

    let addr = server.local_addr().await.expect("bound address");
    let scheme = if server.is_tls() { "https" } else { "http" };

    TestServer {
        base_url: format!("{scheme}://{addr}"),
        server,
        processor,
        listener,
    }
}
