use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Listener settings for the development server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "127.0.0.1", "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port. 0 picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long shutdown waits for open connections, such as event
    /// streams, before dropping them.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

/// Where page and partial templates come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory with `index.html`, `birds.html` and `partials/`.
    /// When unset, the templates compiled into the binary are used.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Local language-model service (Ollama HTTP API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_upstream_base_url")]
    pub base_url: String,
    /// Model name passed to `/api/generate`.
    #[serde(default = "default_model")]
    pub model: String,
    /// Prompt used when the request carries none.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Connection timeout in seconds (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

/// Pacing of the event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Pause after each banner event, in milliseconds.
    #[serde(default)]
    pub stage_delay_ms: u64,
    /// Pause before each forwarded chunk, in milliseconds.
    #[serde(default)]
    pub chunk_delay_ms: u64,
    /// Interval between SSE keep-alive comments.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_seconds: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_upstream_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_prompt() -> String {
    "What is the capital of France?".to_string()
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_keep_alive() -> u64 {
    15
}

impl ServerConfig {
    /// `host:port` for display. Hostnames are resolved at bind time.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base_url(),
            model: default_model(),
            prompt: default_prompt(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stage_delay_ms: 0,
            chunk_delay_ms: 0,
            keep_alive_seconds: default_keep_alive(),
        }
    }
}
