//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_upstream;

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;

use hxloop::config::Config;
use hxloop::render::Templates;
use hxloop::server::{build_router, AppState};
use hxloop::upstream::{Completion, CompletionSource, UpstreamError};

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Config suited to tests: ephemeral port, no keep-alive comments, no pacing.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.port = 0;
    config.stream.keep_alive_seconds = 0;
    config
}

/// Completion source that replays a fixed script and records prompts.
pub struct ScriptedSource {
    pub status: u16,
    pub script: Vec<Result<String, String>>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            script: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure(mut self, message: &str) -> Self {
        self.script.push(Err(message.to_string()));
        self
    }
}

#[async_trait]
impl CompletionSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open(&self, prompt: &str) -> Result<Completion, UpstreamError> {
        self.prompts.lock().push(prompt.to_string());
        let items: Vec<Result<String, UpstreamError>> = self
            .script
            .iter()
            .map(|item| item.clone().map_err(UpstreamError::Reported))
            .collect();
        Ok(Completion {
            status: self.status,
            chunks: futures::stream::iter(items).boxed(),
        })
    }
}

/// Completion source that yields one chunk and then never finishes.
/// `dropped` flips once the chunk stream is dropped.
pub struct HangingSource {
    pub dropped: Arc<AtomicBool>,
}

impl HangingSource {
    pub fn new() -> Self {
        Self {
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionSource for HangingSource {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn open(&self, _prompt: &str) -> Result<Completion, UpstreamError> {
        let flag = DropFlag(self.dropped.clone());
        let chunks = futures::stream::iter(vec![Ok::<_, UpstreamError>("a".to_string())])
            .chain(futures::stream::pending())
            .map(move |item| {
                let _ = &flag;
                item
            });
        Ok(Completion {
            status: 200,
            chunks: chunks.boxed(),
        })
    }
}

pub fn app_with(source: Arc<dyn CompletionSource>) -> Router {
    let templates = Templates::embedded().expect("embedded templates");
    build_router(AppState::new(templates, source, &test_config()))
}

pub fn app() -> Router {
    app_with(Arc::new(ScriptedSource::chunks(&[])))
}

/// A response reduced to what the assertions need.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: String,
}

pub async fn send(app: Router, req: Request<Body>) -> TestResponse {
    let resp = app.oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        content_type,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

/// One parsed SSE frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Split an SSE body into frames. Comment-only frames (keep-alive) are dropped.
pub fn parse_sse(body: &str) -> Vec<SseFrame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data: Vec<&str> = Vec::new();
            for line in block.lines() {
                if let Some(v) = line.strip_prefix("event:") {
                    event = Some(v.strip_prefix(' ').unwrap_or(v).to_string());
                } else if let Some(v) = line.strip_prefix("data:") {
                    data.push(v.strip_prefix(' ').unwrap_or(v));
                }
            }
            if event.is_none() && data.is_empty() {
                return None;
            }
            Some(SseFrame {
                event: event.unwrap_or_else(|| "message".to_string()),
                data: data.join("\n"),
            })
        })
        .collect()
}

/// Wait for a server to become available.
pub async fn wait_for_server(addr: SocketAddr, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
