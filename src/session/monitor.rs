// src/session/monitor.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::session::store::SessionStore;

/// Background watchdog for the advisory token expiry.
///
/// A single cooperatively scheduled task: one `tokio::time::interval`, each
/// tick runs to completion before the next is scheduled, and the first tick
/// fires immediately at startup. When the stored expiry has passed, the
/// session is cleared and `on_expire` runs (the caller's "redirect to
/// login"). The task must not outlive its owner, so the handle aborts it on
/// `stop()` and on drop.
pub struct ExpirationMonitor {
    handle: JoinHandle<()>,
}

impl ExpirationMonitor {
    pub fn spawn<F>(store: Arc<dyn SessionStore>, every: Duration, on_expire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let session = store.load();
                if session.is_expired_at(chrono::Utc::now().timestamp_millis()) {
                    tracing::info!("Session token expired; clearing session");
                    if let Err(e) = store.clear() {
                        tracing::error!("Failed to clear expired session: {}", e);
                    }
                    on_expire();
                }
            }
        });
        Self { handle }
    }

    /// Stops the recurring check. Idempotent with the drop path.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ExpirationMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
