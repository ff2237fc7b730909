//! Template hot-reload with file watching and debouncing.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use super::Templates;

/// Errors that can occur during template watching.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("Failed to create file watcher: {0}")]
    WatcherInit(#[from] notify::Error),

    #[error("Templates are embedded; set templates.dir to use --reload")]
    NoTemplateDir,
}

/// Watches the template directory and reloads templates on changes.
///
/// Runs in a background thread with debouncing to group rapid edits.
pub struct TemplateWatcher {
    // Dropping the watcher closes the event channel, which ends the thread.
    _watcher: RecommendedWatcher,
    _debounce_handle: thread::JoinHandle<()>,
}

impl TemplateWatcher {
    /// Start watching the directory `templates` was loaded from.
    ///
    /// `debounce_ms` is the quiet period after the last change before the
    /// reload happens (typically 200).
    pub fn start(templates: Templates, debounce_ms: u64) -> Result<Self, WatcherError> {
        let dir = templates
            .dir()
            .ok_or(WatcherError::NoTemplateDir)?
            .to_path_buf();

        let (raw_tx, raw_rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Ok(event) = result {
                    let _ = raw_tx.send(event);
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::Recursive)?;
        tracing::info!("Watching {} for template changes", dir.display());

        let debounce_handle = thread::spawn(move || {
            debounce_loop(raw_rx, templates, debounce_ms);
        });

        Ok(Self {
            _watcher: watcher,
            _debounce_handle: debounce_handle,
        })
    }
}

/// Waits for `debounce_ms` after the last event before reloading.
fn debounce_loop(rx: mpsc::Receiver<Event>, templates: Templates, debounce_ms: u64) {
    let debounce = Duration::from_millis(debounce_ms);
    let mut pending_reload: Option<Instant> = None;

    loop {
        let timeout = match pending_reload {
            Some(last) => debounce.saturating_sub(last.elapsed()),
            None => Duration::from_secs(60),
        };

        match rx.recv_timeout(timeout) {
            Ok(event) => {
                if is_template_event(&event) {
                    pending_reload = Some(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(last) = pending_reload {
                    if last.elapsed() >= debounce {
                        if let Err(e) = templates.reload() {
                            tracing::warn!("Template reload failed, keeping previous templates: {}", e);
                        }
                        pending_reload = None;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn is_template_event(event: &Event) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    );

    relevant && event.paths.iter().any(|p| is_template_file(p))
}

fn is_template_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "html")
}
