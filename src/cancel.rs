//! Cooperative cancellation for in-flight writes.
//!
//! A [`CancelToken`] is a cheaply cloneable handle shared between the caller
//! and a write in progress. The write path checks the flag between packets
//! and races its waits against [`cancelled`](CancelToken::cancelled), so a
//! cancellation takes effect without tearing the connection down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A cloneable cancellation flag.
///
/// Cancellation is one-way and sticky: once [`cancel`](CancelToken::cancel)
/// has been called, every clone observes it forever.
///
/// # Example
///
/// ```
/// use pipelink::CancelToken;
///
/// let token = CancelToken::new();
/// let watcher = token.clone();
/// assert!(!watcher.is_cancelled());
/// token.cancel();
/// assert!(watcher.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    /// Check whether cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancellation is requested.
    ///
    /// Returns immediately if the token is already cancelled.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.inner.notify.notified();
            // Re-check after registering so a concurrent cancel cannot slip
            // between the load and the wait.
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
