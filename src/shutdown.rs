//! Cooperative shutdown for background loops
//!
//! Every background task holds a [`Shutdown`] handle and checks it at
//! iteration boundaries; nothing is interrupted mid-step. Tests can cancel
//! after a fixed number of iterations instead of sending process signals.

use tokio::sync::watch;

/// Cancellation handle shared by all background loops
///
/// Cloning is cheap; all clones observe the same signal. Dropping handles
/// does not cancel.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a handle in the not-cancelled state
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Signal all loops to stop at their next iteration boundary
    pub fn cancel(&self) {
        // Receivers always outlive the sender here (self holds one)
        let _ = self.tx.send(true);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested
    ///
    /// Used with `tokio::select!` to make idle sleeps interruptible.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleep for `duration`, returning early if cancelled meanwhile
    pub async fn sleep(&self, duration: std::time::Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled() => {}
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_uncancelled() {
        assert!(!Shutdown::new().is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let shutdown = Shutdown::new();
        let observer = shutdown.clone();
        shutdown.cancel();
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let shutdown = Shutdown::new();
        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled() should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_sleep_returns_early_on_cancel() {
        let shutdown = Shutdown::new();
        shutdown.cancel();
        // Must not actually wait a minute
        tokio::time::timeout(
            Duration::from_secs(1),
            shutdown.sleep(Duration::from_secs(60)),
        )
        .await
        .expect("sleep should be interrupted by cancellation");
    }
}
