//! Cancellation token shared between a run and whoever may stop it.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

/// A cloneable handle for cooperative cancellation.
///
/// All clones observe the same state. Cancellation is idempotent: only the
/// first reason is kept.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every waiter.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.inner.reason.write();
        if slot.is_some() {
            return;
        }
        let reason = reason.into();
        debug!(reason = %reason, "cancellation requested");
        *slot = Some(reason);
        // The reason is visible before anyone can observe the flag.
        self.inner.cancelled.store(true, Ordering::SeqCst);
        drop(slot);
        self.inner.notify.notify_waiters();
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// The first cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.read().clone()
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_cancel_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel("operator");
        token.cancel("second");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("operator".to_string()));
    }

    #[test]
    fn test_reason_is_set_whenever_flag_is_seen() {
        for _ in 0..200 {
            let token = CancellationToken::new();
            let observer = token.clone();
            let watcher = std::thread::spawn(move || {
                while !observer.is_cancelled() {
                    std::hint::spin_loop();
                }
                observer.reason()
            });
            token.cancel("operator");
            assert_eq!(watcher.join().unwrap().as_deref(), Some("operator"));
        }
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let handle = token.clone();
        handle.cancel("from handle");
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancelled_is_pending_until_cancel() {
        let token = CancellationToken::new();
        let mut waiter = tokio_test::task::spawn(token.cancelled());
        tokio_test::assert_pending!(waiter.poll());

        token.cancel("stop");
        assert!(waiter.is_woken());
        tokio_test::assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel("early");
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already-cancelled token resolves immediately");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move {
            waiter.cancelled().await;
            waiter.reason()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel("stop");

        let reason = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter woke")
            .unwrap();
        assert_eq!(reason.as_deref(), Some("stop"));
    }
}
