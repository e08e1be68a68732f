//! Shutdown coordination for the node's long-running tasks.

use tokio::signal;
use tokio::sync::broadcast;

/// Fan-out shutdown signal shared by the daemon and the node's background
/// tasks.
///
/// The verification loop, the sweep tasks and the realtime server each hold
/// a receiver from [`subscribe`](Self::subscribe) and select on it alongside
/// their work. [`shutdown`](Self::shutdown) fires the signal;
/// [`wait_for_signal`](Self::wait_for_signal) additionally listens for
/// SIGINT and SIGTERM so the daemon can drive shutdown from the OS.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        // Capacity 1: the channel only ever carries the one signal.
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Hand out a receiver for a background task to select on.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Safe with no subscribers and safe to call more than
    /// once.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve on SIGINT, SIGTERM, or a programmatic [`shutdown`] call from
    /// elsewhere, making sure the signal has fired before returning.
    ///
    /// [`shutdown`]: ShutdownController::shutdown
    pub async fn wait_for_signal(&self) {
        let mut triggered = self.subscribe();

        #[cfg(unix)]
        let sigterm = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let sigterm = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("SIGINT received"),
            _ = sigterm => tracing::info!("SIGTERM received"),
            _ = triggered.recv() => {}
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn programmatic_shutdown_reaches_every_subscriber() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.shutdown();
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_signal() {
        let controller = ShutdownController::new();
        controller.shutdown();
        let mut rx = controller.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        controller.shutdown();
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn wait_for_signal_returns_on_programmatic_shutdown() {
        let controller = Arc::new(ShutdownController::new());
        let trigger = Arc::clone(&controller);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.shutdown();
        });
        tokio::time::timeout(Duration::from_secs(5), controller.wait_for_signal())
            .await
            .unwrap();
    }
}
