use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{lookup_host, TcpListener};

use crate::config::Config;
use crate::render::{TemplateError, TemplateWatcher, Templates, WatcherError};
use crate::server::connection::ConnectionCounter;
use crate::server::router::{build_router, AppState};
use crate::server::shutdown::ShutdownManager;
use crate::upstream::{OllamaClient, UpstreamError};

const RELOAD_DEBOUNCE_MS: u64 = 200;

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Cannot resolve bind address '{addr}': {source}")]
    InvalidAddr {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("bind() must be called before run()")]
    NotBound,

    #[error(transparent)]
    Templates(#[from] TemplateError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct AppServer {
    host: String,
    port: u16,
    drain_timeout: Duration,
    /// The bound listener, populated by bind(), consumed by run().
    listener: Option<TcpListener>,
    state: AppState,
    shutdown: Arc<ShutdownManager>,
    /// Kept alive for the lifetime of the server when `--reload` is on.
    watcher: Option<TemplateWatcher>,
}

impl AppServer {
    /// Wire the server from configuration: templates, the Ollama client and,
    /// with `reload`, a watcher on the template directory.
    pub fn from_config(config: &Config, reload: bool) -> Result<Self, ServerError> {
        let templates = Templates::from_config(&config.templates)?;
        let source = Arc::new(OllamaClient::new(&config.upstream)?);
        let watcher = if reload {
            Some(TemplateWatcher::start(templates.clone(), RELOAD_DEBOUNCE_MS)?)
        } else {
            None
        };

        let state = AppState::new(templates, source, config);
        let mut server = Self::new(config, state);
        server.watcher = watcher;
        Ok(server)
    }

    /// Server around an already-built state. Used by tests to plug in a
    /// scripted completion source.
    pub fn new(config: &Config, state: AppState) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            drain_timeout: Duration::from_secs(config.server.shutdown_timeout_seconds),
            listener: None,
            state,
            shutdown: Arc::new(ShutdownManager::new()),
            watcher: None,
        }
    }

    /// Resolve the host and bind the listener. Returns the actual address
    /// (port 0 resolves here).
    ///
    /// The listener is held until run(), so the port cannot be claimed by
    /// another process in between.
    pub async fn bind(&mut self) -> Result<SocketAddr, ServerError> {
        let addr = self.resolve().await?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind { addr, source: e })?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!("Bound to {}", addr);
        Ok(addr)
    }

    async fn resolve(&self) -> Result<SocketAddr, ServerError> {
        let invalid = |source: std::io::Error| ServerError::InvalidAddr {
            addr: format!("{}:{}", self.host, self.port),
            source,
        };

        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(invalid)?;
        addrs.next().ok_or_else(|| {
            invalid(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ))
        })
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Serve until Ctrl-C, SIGTERM or `ServerHandle::shutdown()`, then
    /// drain open connections for at most the configured timeout.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.listener.ok_or(ServerError::NotBound)?;
        let addr = listener.local_addr()?;

        tracing::info!("Serving on http://{}", addr);
        if self.watcher.is_some() {
            tracing::info!("Template reload enabled");
        }

        let app = build_router(self.state);
        let make_service = ConnectionCounter::new(app.into_make_service(), self.shutdown.clone());

        // Graceful serve returns once every connection has finished, which
        // an open event stream never does on its own. The drain branch puts
        // a deadline on that.
        let serve = axum::serve(listener, make_service)
            .with_graceful_shutdown(wait_for_signal(self.shutdown.clone()))
            .into_future();
        let shutdown = self.shutdown.clone();
        let drain_timeout = self.drain_timeout;
        let drain = async move {
            wait_for_signal(shutdown.clone()).await;
            shutdown.wait_for_connections(drain_timeout).await;
        };

        tokio::select! {
            result = serve => {
                result?;
                tracing::info!("Shut down gracefully");
            }
            () = drain => {
                let open = self.shutdown.active_connections();
                if open > 0 {
                    tracing::info!("Stopped with {} connections still open", open);
                }
            }
        }

        Ok(())
    }
}

async fn wait_for_signal(shutdown: Arc<ShutdownManager>) {
    if let Err(e) = shutdown.wait_for_shutdown().await {
        tracing::warn!("Signal handler failed, shutting down: {}", e);
    }
}

#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}
