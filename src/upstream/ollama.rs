use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use super::ndjson::decode_generate_stream;
use super::{Completion, CompletionSource, UpstreamError};
use crate::config::UpstreamConfig;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Streaming client for Ollama's `/api/generate`.
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds as u64))
            .build()
            .map_err(UpstreamError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionSource for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn open(&self, prompt: &str) -> Result<Completion, UpstreamError> {
        let url = self.generate_url();
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: true,
        };

        tracing::debug!(model = %self.model, "POST {}", url);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Connect { url, source: e })?;

        let status = resp.status().as_u16();
        tracing::info!(status, "Upstream responded");

        Ok(Completion {
            status,
            chunks: decode_generate_stream(resp.bytes_stream()).boxed(),
        })
    }
}
