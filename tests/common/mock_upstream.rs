//! Mock Ollama server for exercising the real HTTP client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Response, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A scripted `/api/generate` answer.
#[derive(Debug, Clone)]
pub struct MockGenerate {
    pub status: u16,
    /// Raw body pieces, sent as separate writes.
    pub pieces: Vec<String>,
    pub piece_delay_ms: u64,
}

impl MockGenerate {
    /// NDJSON stream of `chunks` followed by a `done` line.
    pub fn chunks(chunks: &[&str]) -> Self {
        let mut pieces: Vec<String> = chunks
            .iter()
            .map(|c| {
                let line = serde_json::json!({ "model": "llama3.2", "response": c, "done": false });
                format!("{}\n", line)
            })
            .collect();
        pieces.push(
            serde_json::json!({ "model": "llama3.2", "response": "", "done": true }).to_string() + "\n",
        );
        Self {
            status: 200,
            pieces,
            piece_delay_ms: 0,
        }
    }

    pub fn raw(status: u16, pieces: &[&str]) -> Self {
        Self {
            status,
            pieces: pieces.iter().map(|p| p.to_string()).collect(),
            piece_delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, ms: u64) -> Self {
        self.piece_delay_ms = ms;
        self
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
    responses: Arc<Mutex<VecDeque<MockGenerate>>>,
}

pub struct MockOllama {
    pub addr: SocketAddr,
    state: MockState,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl MockOllama {
    pub async fn start() -> Self {
        let state = MockState {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
        };

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

        let app = Router::new()
            .route("/api/generate", post(handle_generate))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            shutdown: shutdown_tx,
        }
    }

    pub async fn enqueue(&self, resp: MockGenerate) {
        self.state.responses.lock().await.push_back(resp);
    }

    /// JSON bodies of every request received so far.
    pub async fn captured_requests(&self) -> Vec<serde_json::Value> {
        self.state.requests.lock().await.clone()
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockOllama {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn handle_generate(
    State(state): State<MockState>,
    Json(body): Json<serde_json::Value>,
) -> Response<Body> {
    state.requests.lock().await.push(body);

    let mock = state
        .responses
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| MockGenerate::chunks(&[]));

    let delay = Duration::from_millis(mock.piece_delay_ms);
    let pieces = futures::stream::iter(mock.pieces).then(move |piece| async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok::<_, std::io::Error>(piece)
    });

    Response::builder()
        .status(StatusCode::from_u16(mock.status).unwrap())
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(pieces))
        .unwrap()
}
