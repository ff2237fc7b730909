//! Page and partial template rendering.
//!
//! Templates are compiled into the binary by default. When a template
//! directory is configured they are read from disk instead, which is what
//! `--reload` watches.

mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minijinja::Environment;
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

use crate::config::TemplatesConfig;

pub use watcher::{TemplateWatcher, WatcherError};

pub const INDEX: &str = "index.html";
pub const BIRDS: &str = "birds.html";
pub const GREETING: &str = "partials/greeting.html";
pub const COUNTER: &str = "partials/counter.html";
pub const BIRD: &str = "partials/bird.html";
pub const STREAM_PANEL: &str = "partials/stream.html";

const EMBEDDED: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    (INDEX, include_str!("../../templates/index.html")),
    (BIRDS, include_str!("../../templates/birds.html")),
    (GREETING, include_str!("../../templates/partials/greeting.html")),
    (COUNTER, include_str!("../../templates/partials/counter.html")),
    (BIRD, include_str!("../../templates/partials/bird.html")),
    (STREAM_PANEL, include_str!("../../templates/partials/stream.html")),
];

/// Errors that can occur while loading or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to load template '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Shared, reloadable template environment.
#[derive(Clone)]
pub struct Templates {
    env: Arc<RwLock<Environment<'static>>>,
    dir: Option<PathBuf>,
}

impl Templates {
    /// Templates compiled into the binary.
    pub fn embedded() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        for &(name, source) in EMBEDDED {
            env.add_template(name, source)
                .map_err(|e| TemplateError::Load {
                    name: name.to_string(),
                    source: e,
                })?;
        }
        Ok(Self {
            env: Arc::new(RwLock::new(env)),
            dir: None,
        })
    }

    /// Templates read from `dir`. Every template the routes use must exist.
    pub fn from_dir(dir: &Path) -> Result<Self, TemplateError> {
        let env = load_dir(dir)?;
        Ok(Self {
            env: Arc::new(RwLock::new(env)),
            dir: Some(dir.to_path_buf()),
        })
    }

    pub fn from_config(config: &TemplatesConfig) -> Result<Self, TemplateError> {
        match &config.dir {
            Some(dir) => Self::from_dir(dir),
            None => Self::embedded(),
        }
    }

    /// Directory the templates come from, if not embedded.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, TemplateError> {
        let env = self.env.read();
        let template = env.get_template(name).map_err(|e| TemplateError::Load {
            name: name.to_string(),
            source: e,
        })?;
        template.render(ctx).map_err(|e| TemplateError::Render {
            name: name.to_string(),
            source: e,
        })
    }

    /// Re-read templates from disk.
    ///
    /// On success, atomically replaces the environment.
    /// On failure, keeps the old templates and returns the error.
    /// Embedded templates never change, so this is a no-op for them.
    pub fn reload(&self) -> Result<(), TemplateError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let env = load_dir(dir)?;
        *self.env.write() = env;
        tracing::info!("Reloaded templates from {}", dir.display());
        Ok(())
    }
}

fn load_dir(dir: &Path) -> Result<Environment<'static>, TemplateError> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(dir));
    for &(name, _) in EMBEDDED {
        env.get_template(name).map_err(|e| TemplateError::Load {
            name: name.to_string(),
            source: e,
        })?;
    }
    Ok(env)
}
