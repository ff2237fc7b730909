use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;

/// Coordinates graceful shutdown: the stop signal plus a count of open
/// connections to drain.
pub struct ShutdownManager {
    shutdown: AtomicBool,
    active_connections: AtomicUsize,
    notify: Notify,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            active_connections: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Resolves on Ctrl-C, SIGTERM, or `signal_shutdown()`.
    pub async fn wait_for_shutdown(&self) -> std::io::Result<()> {
        // Register with Notify before checking the flag, so a signal fired
        // in between is not lost.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_shutting_down() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = sigterm.recv() => {},
                _ = notified => {},
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = notified => {},
            }
        }

        self.shutdown.store(true, Ordering::SeqCst);
        tracing::info!("Shutting down gracefully...");
        Ok(())
    }

    pub fn signal_shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Count one connection until the returned ticket is dropped.
    pub fn track(self: &Arc<Self>) -> ConnectionTicket {
        self.active_connections.fetch_add(1, Ordering::SeqCst);
        ConnectionTicket {
            manager: Arc::clone(self),
        }
    }

    pub async fn wait_for_connections(&self, timeout: Duration) {
        tracing::info!("Waiting for {} active connections...", self.active_connections());

        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if self.active_connections() == 0 {
                tracing::info!("Server stopped");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tracing::warn!(
            "Forced shutdown after timeout ({} connections remain)",
            self.active_connections()
        );
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII marker for one open connection.
pub struct ConnectionTicket {
    manager: Arc<ShutdownManager>,
}

impl Drop for ConnectionTicket {
    fn drop(&mut self) {
        self.manager.active_connections.fetch_sub(1, Ordering::SeqCst);
    }
}
