//! Server-Sent Events relay of an upstream completion.
//!
//! One `GET /ai` produces, in order:
//! ```text
//! event: status   data: Starting event stream<br>
//! event: status   data: HTTP Status Code: 200<br>
//! event: message  data: <chunk>            (one per upstream chunk)
//! event: error    data: <reason>           (only if the upstream failed mid-stream)
//! event: status   data: <br> closing stream <br>
//! event: close    data:
//! ```
//! after which the response body ends.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use minijinja::HtmlEscape;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::server::error::AppError;
use crate::server::router::AppState;
use crate::upstream::{ChunkStream, Completion};

pub const MAX_PROMPT_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventKind {
    Message,
    Status,
    Error,
    Close,
}

impl StreamEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEventKind::Message => "message",
            StreamEventKind::Status => "status",
            StreamEventKind::Error => "error",
            StreamEventKind::Close => "close",
        }
    }
}

/// One outbound SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: StreamEventKind,
    pub data: String,
}

impl StreamEvent {
    pub fn message(data: impl Into<String>) -> Self {
        Self { kind: StreamEventKind::Message, data: data.into() }
    }

    pub fn status(data: impl Into<String>) -> Self {
        Self { kind: StreamEventKind::Status, data: data.into() }
    }

    pub fn error(data: impl Into<String>) -> Self {
        Self { kind: StreamEventKind::Error, data: data.into() }
    }

    pub fn close() -> Self {
        Self { kind: StreamEventKind::Close, data: String::new() }
    }

    /// SSE treats a bare `\r` as a line break, so carriage returns are
    /// normalised to `\n` before framing.
    pub fn to_sse(&self) -> Event {
        let data = self.data.replace("\r\n", "\n").replace('\r', "\n");
        Event::default().event(self.kind.as_str()).data(data)
    }
}

pub async fn ai(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Response, AppError> {
    let prompt = resolve_prompt(query.prompt, &state.default_prompt)?;
    let stream_id = Uuid::new_v4();

    tracing::info!(%stream_id, source = state.source.name(), "Opening completion stream");
    let completion = state.source.open(&prompt).await?;

    let events = relay_events(completion, &state.stream, stream_id)
        .map(|event| Ok::<_, Infallible>(event.to_sse()));

    let sse = Sse::new(events);
    if state.stream.keep_alive_seconds == 0 {
        return Ok(sse.into_response());
    }
    let keep_alive = KeepAlive::new().interval(Duration::from_secs(state.stream.keep_alive_seconds));
    Ok(sse.keep_alive(keep_alive).into_response())
}

fn resolve_prompt(requested: Option<String>, default_prompt: &str) -> Result<String, AppError> {
    let prompt = requested
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| default_prompt.to_string());

    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "prompt must be at most {} characters",
            MAX_PROMPT_CHARS
        )));
    }
    Ok(prompt)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Status,
    Chunks,
    Closing,
    Close,
    Done,
}

struct Relay {
    phase: Phase,
    status: u16,
    chunks: ChunkStream,
    stage_delay: Duration,
    chunk_delay: Duration,
    pause_next: Duration,
    forwarded: usize,
    stream_id: Uuid,
}

impl Drop for Relay {
    fn drop(&mut self) {
        if self.phase != Phase::Done {
            tracing::info!(
                stream_id = %self.stream_id,
                forwarded = self.forwarded,
                "Client disconnected, dropping upstream stream"
            );
        }
    }
}

/// Turn an opened completion into the ordered SSE event sequence.
pub fn relay_events(
    completion: Completion,
    pacing: &StreamConfig,
    stream_id: Uuid,
) -> impl Stream<Item = StreamEvent> + Send {
    let relay = Relay {
        phase: Phase::Start,
        status: completion.status,
        chunks: completion.chunks,
        stage_delay: Duration::from_millis(pacing.stage_delay_ms),
        chunk_delay: Duration::from_millis(pacing.chunk_delay_ms),
        pause_next: Duration::ZERO,
        forwarded: 0,
        stream_id,
    };

    futures::stream::unfold(relay, |mut relay| async move {
        if !relay.pause_next.is_zero() {
            tokio::time::sleep(relay.pause_next).await;
            relay.pause_next = Duration::ZERO;
        }

        let event = match relay.phase {
            Phase::Start => {
                relay.phase = Phase::Status;
                relay.pause_next = relay.stage_delay;
                StreamEvent::status("Starting event stream<br>")
            }
            Phase::Status => {
                relay.phase = Phase::Chunks;
                relay.pause_next = relay.stage_delay;
                StreamEvent::status(format!("HTTP Status Code: {}<br>", relay.status))
            }
            Phase::Chunks => match relay.chunks.next().await {
                Some(Ok(text)) => {
                    if !relay.chunk_delay.is_zero() {
                        tokio::time::sleep(relay.chunk_delay).await;
                    }
                    relay.forwarded += 1;
                    StreamEvent::message(text)
                }
                Some(Err(e)) => {
                    tracing::warn!(stream_id = %relay.stream_id, "Upstream failed mid-stream: {}", e);
                    relay.phase = Phase::Closing;
                    StreamEvent::error(HtmlEscape(&e.to_string()).to_string())
                }
                None => closing(&mut relay),
            },
            Phase::Closing => closing(&mut relay),
            Phase::Close => {
                relay.phase = Phase::Done;
                tracing::info!(
                    stream_id = %relay.stream_id,
                    forwarded = relay.forwarded,
                    "Stream closed"
                );
                StreamEvent::close()
            }
            Phase::Done => return None,
        };

        Some((event, relay))
    })
}

fn closing(relay: &mut Relay) -> StreamEvent {
    relay.phase = Phase::Close;
    relay.pause_next = relay.stage_delay;
    StreamEvent::status("<br> closing stream <br>")
}
