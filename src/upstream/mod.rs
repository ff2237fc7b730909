//! Sources of incremental completion text for the streaming route.
//!
//! The streaming responder only sees [`CompletionSource`]; the production
//! implementation talks to a local Ollama server, tests plug in scripted
//! sources.

mod ndjson;
mod ollama;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub use ndjson::{decode_generate_stream, parse_line, GenerateLine, LineSplitter};
pub use ollama::OllamaClient;

/// Errors raised while talking to the language-model service.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP client could not be constructed
    #[error("Failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),

    /// Request never produced a response (refused, DNS, timeout)
    #[error("Connection to '{url}' failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body broke off mid-stream
    #[error("Upstream body error: {0}")]
    Body(String),

    /// The service answered with an `error` object
    #[error("Upstream reported: {0}")]
    Reported(String),
}

/// Ordered text chunks; the stream ends when the completion is finished.
pub type ChunkStream = BoxStream<'static, Result<String, UpstreamError>>;

/// An opened completion: the upstream HTTP status plus its chunks.
pub struct Completion {
    pub status: u16,
    pub chunks: ChunkStream,
}

/// Something that can stream a completion for a prompt.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    /// Returns the name of this source for logging.
    fn name(&self) -> &'static str;

    /// Start a completion.
    ///
    /// Fails only when no response could be obtained at all. Failures after
    /// the response started arrive as `Err` items in `chunks`.
    async fn open(&self, prompt: &str) -> Result<Completion, UpstreamError>;
}
