//! HTTP side of the hypermedia loop: page shells, fragments and the
//! event stream, plus the listener lifecycle around them.

pub mod connection;
pub mod error;
pub mod fragments;
pub mod health;
pub mod pages;
pub mod router;
pub mod shutdown;
pub mod stream;

mod server;

pub use error::AppError;
pub use router::{build_router, AppState};
pub use server::{AppServer, ServerError, ServerHandle};

use tracing_subscriber::EnvFilter;

/// Log to stdout, filtered by `RUST_LOG` (default `info,tower_http=debug`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}
