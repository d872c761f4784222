//! Shutdown coordination for the gateway.
//!
//! ```text
//! wait_for_signal (Ctrl-C / SIGTERM)
//!     → Shutdown::trigger
//!     → HttpServer::run stops accepting and drains in-flight requests,
//!       including ones sleeping between retries
//! ```

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to the HTTP server and test harnesses.
///
/// Receivers must be taken with `subscribe` before `trigger`; a receiver
/// created afterwards never sees the signal.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Send the shutdown signal. A trigger with no subscribers is dropped.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
