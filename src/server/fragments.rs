//! Routes that answer with a sliver of HTML for one region of the page.

use axum::extract::{Form, Path, Query, State};
use axum::response::Html;
use minijinja::context;
use serde::Deserialize;

use crate::catalog;
use crate::render;
use crate::server::error::AppError;
use crate::server::router::AppState;

pub const MAX_NAME_CHARS: usize = 64;

#[derive(Debug, Deserialize)]
pub struct GreetForm {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CounterForm {
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct PanelQuery {
    #[serde(default)]
    pub prompt: Option<String>,
}

pub async fn greet(
    State(state): State<AppState>,
    Form(form): Form<GreetForm>,
) -> Result<Html<String>, AppError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::InvalidInput(format!(
            "name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }

    let html = state
        .templates
        .render(render::GREETING, context! { name => name })?;
    Ok(Html(html))
}

/// The current count round-trips through `hx-vals`, so the server keeps no state.
pub async fn counter(
    State(state): State<AppState>,
    Form(form): Form<CounterForm>,
) -> Result<Html<String>, AppError> {
    let next = form
        .count
        .checked_add(1)
        .ok_or_else(|| AppError::InvalidInput("count is already at its maximum".to_string()))?;

    let html = state
        .templates
        .render(render::COUNTER, context! { count => next })?;
    Ok(Html(html))
}

pub async fn bird(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Html<String>, AppError> {
    let bird = catalog::find(id).ok_or_else(|| AppError::NotFound {
        what: format!("Bird {}", id),
    })?;

    let html = state
        .templates
        .render(render::BIRD, context! { bird => bird })?;
    Ok(Html(html))
}

/// Panel that opens the event stream once htmx swaps it in.
pub async fn stream_panel(
    State(state): State<AppState>,
    Query(query): Query<PanelQuery>,
) -> Result<Html<String>, AppError> {
    let prompt = query
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let html = state
        .templates
        .render(render::STREAM_PANEL, context! { prompt => prompt })?;
    Ok(Html(html))
}
