//! Full-document routes. Everything else in the app swaps into these.

use axum::extract::State;
use axum::response::Html;
use minijinja::context;

use crate::catalog;
use crate::render;
use crate::server::error::AppError;
use crate::server::router::AppState;

pub const INDEX_TITLE: &str = "Hypermedia over the wire";
pub const BIRDS_TITLE: &str = "Welcome to the story of birds";

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let html = state.templates.render(
        render::INDEX,
        context! {
            title => INDEX_TITLE,
            birds => catalog::all(),
            count => 0,
            default_prompt => state.default_prompt,
        },
    )?;
    Ok(Html(html))
}

pub async fn birds(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let html = state.templates.render(
        render::BIRDS,
        context! {
            title => BIRDS_TITLE,
            hero_image => catalog::HERO_IMAGE,
            birds => catalog::all(),
        },
    )?;
    Ok(Html(html))
}
