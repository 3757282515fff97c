//! Cooperative cancellation for a sync run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::sync::types::{SyncError, SyncResult};

/// Clonable cancellation signal shared between a caller and a run.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Fail fast if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] once the token is cancelled.
    pub fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation`, dropping it as soon as cancellation is requested.
pub(crate) async fn cancellable<F, T>(operation: F, cancel: &CancelToken) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SyncError::Cancelled),
        result = operation => result,
    }
}

/// Run a network operation bounded by `timeout` overall and aborted on cancel.
///
/// A timeout becomes a transport error for `url`.
pub(crate) async fn guarded<F, T>(
    operation: F,
    url: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> SyncResult<T>
where
    F: Future<Output = SyncResult<T>>,
{
    let bounded = async {
        tokio::time::timeout(timeout, operation)
            .await
            .unwrap_or_else(|_| {
                Err(SyncError::transport(
                    url,
                    format!("timed out after {:.1}s", timeout.as_secs_f64()),
                ))
            })
    };
    cancellable(bounded, cancel).await
}
