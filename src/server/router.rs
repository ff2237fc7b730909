use std::sync::Arc;

use axum::http::Uri;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{Config, StreamConfig};
use crate::render::Templates;
use crate::server::error::AppError;
use crate::server::{fragments, health, pages, stream};
use crate::upstream::CompletionSource;

/// State shared by every handler. Read-only apart from template reloads.
#[derive(Clone)]
pub struct AppState {
    pub templates: Templates,
    pub source: Arc<dyn CompletionSource>,
    pub stream: StreamConfig,
    pub default_prompt: String,
}

impl AppState {
    pub fn new(templates: Templates, source: Arc<dyn CompletionSource>, config: &Config) -> Self {
        Self {
            templates,
            source,
            stream: config.stream.clone(),
            default_prompt: config.upstream.prompt.clone(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/birds", get(pages::birds))
        .route("/birds/{id}", get(fragments::bird))
        .route("/greet", post(fragments::greet))
        .route("/counter", post(fragments::counter))
        .route("/ai", get(stream::ai))
        .route("/ai/panel", get(fragments::stream_panel))
        .route("/health", get(health::health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        what: format!("Page '{}'", uri.path()),
    }
}
