use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation handle for a cache's background cleanup task.
///
/// All clones observe the same state. Once cancelled a signal stays
/// cancelled; cancelling again has no effect.
///
/// # Example
///
/// ```rust,no_run
/// use mempot_core::{Cache, CacheConfig, StopSignal};
///
/// #[tokio::main]
/// async fn main() {
///     let signal = StopSignal::new();
///     let cache: Cache<String, u64> =
///         Cache::with_config(CacheConfig::default().with_stop_signal(signal.clone()));
///
///     // ... later, on shutdown
///     signal.cancel();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    /// Creates a new, not yet cancelled signal
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        // send_replace updates the value even when nobody is subscribed yet
        self.tx.send_replace(true);
    }

    /// Returns `true` once `cancel` has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the signal is cancelled.
    ///
    /// Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}
