use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Cooperative cancellation shared by every task of one session.
///
/// Cancelling is idempotent; clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone, so this only ends on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration`; returns `false` if cancelled first.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_cancel() {
        let token = CancelToken::new();
        assert!(token.sleep(Duration::from_secs(5)).await);
        assert!(!token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_sleep_in_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        let sleeper = tokio::spawn(async move { clone.sleep(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;
        token.cancel();
        token.cancel();
        assert!(!sleeper.await.unwrap());
        assert!(token.is_cancelled());
    }
}
