// Shared fixtures for integration tests

#![allow(dead_code)]

use anyhow::Result;
use apiman::config::{Config, LlmConfig};
use apiman::notify::Notifier;
use apiman::providers::{LlmProvider, ProviderRequest, ProviderResponse};
use apiman::server::{create_router, SupportServer};
use apiman::storage::MemoryStore;
use apiman::tickets::Ticket;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "s3cret";

/// LLM double that answers with fixed text (or fails) and keeps every request
pub struct ScriptedLlm {
    answer: Option<String>,
    delay: Option<Duration>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedLlm {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers like `answering` after sleeping for `delay`
    pub fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Some(text) => Ok(ProviderResponse {
                id: "resp-1".to_string(),
                model: "scripted".to_string(),
                text: text.clone(),
                stop_reason: Some("stop".to_string()),
                provider: "scripted".to_string(),
            }),
            None => anyhow::bail!("upstream timed out"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

/// Notifier double that remembers the tickets it was told about
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, ticket: &Ticket) -> Result<()> {
        self.sent.lock().unwrap().push(ticket.id.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn test_config(admin_token: Option<&str>) -> Config {
    let llm = LlmConfig {
        api_key: "gsk-test".to_string(),
        ..LlmConfig::default()
    };
    let mut config = Config::new(llm, PathBuf::from(":memory:"), "+15550100".to_string());
    config.server.admin_token = admin_token.map(str::to_string);
    config
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_app(llm: Arc<ScriptedLlm>, admin_token: Option<&str>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let server = SupportServer::new(
        &test_config(admin_token),
        store.clone(),
        llm,
        notifier.clone(),
    )
    .expect("Failed to build test server");

    TestApp {
        app: create_router(Arc::new(server)),
        store,
        notifier,
    }
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn with_admin(mut request: Request<Body>) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-admin-token", ADMIN_TOKEN.parse().unwrap());
    request
}

pub async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, text) = send_raw(app, request).await;
    if text.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_str(&text).unwrap())
}
