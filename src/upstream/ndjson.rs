//! Decoding of Ollama's newline-delimited JSON generate stream.
//!
//! Ollama answers `POST /api/generate` with one JSON object per line:
//! ```text
//! {"model":"llama3.2","response":"Par","done":false}
//! {"model":"llama3.2","response":"is","done":false}
//! {"model":"llama3.2","response":"","done":true,"total_duration":123}
//! ```
//! Network chunks do not respect line boundaries, so bytes are buffered
//! until a full line is available.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::UpstreamError;

/// One decoded line of the generate stream. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct GenerateLine {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Accumulates raw bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the next complete line, without its `\n` (and `\r`, if any).
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Take whatever is left after the body ended without a final newline.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Parse a single line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<Result<GenerateLine, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed))
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    splitter: LineSplitter,
    body_done: bool,
    finished: bool,
}

/// Turn a raw NDJSON byte stream into a stream of text chunks.
///
/// - Lines that fail to decode are logged and skipped
/// - A line with `"done": true` ends the stream (its text, if any, is yielded first)
/// - A line with an `error` field yields `UpstreamError::Reported` and ends the stream
/// - A transport error yields `UpstreamError::Body` and ends the stream
pub fn decode_generate_stream<S, B, E>(
    body: S,
) -> impl Stream<Item = Result<String, UpstreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let state = DecodeState {
        body: Box::pin(body),
        splitter: LineSplitter::new(),
        body_done: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            let line = match state.splitter.next_line() {
                Some(line) => Some(line),
                None if state.body_done => state.splitter.take_remainder(),
                None => None,
            };

            if let Some(line) = line {
                let parsed = match parse_line(&line) {
                    None => continue,
                    Some(Ok(parsed)) => parsed,
                    Some(Err(e)) => {
                        tracing::warn!("Could not decode line {:?}: {}", line, e);
                        continue;
                    }
                };

                if let Some(message) = parsed.error {
                    state.finished = true;
                    return Some((Err(UpstreamError::Reported(message)), state));
                }

                if parsed.done {
                    state.finished = true;
                    if parsed.response.is_empty() {
                        return None;
                    }
                }

                tracing::trace!("chunk: {:?}", parsed.response);
                return Some((Ok(parsed.response), state));
            }

            if state.body_done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => state.splitter.push(bytes.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(UpstreamError::Body(e.to_string())), state));
                }
                None => state.body_done = true,
            }
        }
    })
}
