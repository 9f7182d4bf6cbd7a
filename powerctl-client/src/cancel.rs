//! Cooperative cancellation of a live stream.
//!
//! A [`CancelHandle`] is held by whoever decides to stop (a signal handler, a
//! test); the [`CancelSignal`] is observed by the stream. Cancellation is
//! level-triggered: once set it stays set, so a stream started after the
//! request still sees it.

use tokio_util::sync::CancellationToken;

/// Requests cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    token: CancellationToken,
}

/// Creates a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let token = CancellationToken::new();
    (
        CancelHandle {
            token: token.clone(),
        },
        CancelSignal { token },
    )
}

impl CancelHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl CancelSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    ///
    /// Stays pending forever if every handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_cancel_wakes_pending_future() {
        let (handle, signal) = cancel_pair();
        let mut waiter = task::spawn(signal.cancelled());
        assert_pending!(waiter.poll());
        assert!(!waiter.is_woken());

        handle.cancel();
        assert!(waiter.is_woken());
        assert_ready!(waiter.poll());
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (handle, signal) = cancel_pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn(async move {
            signal.cancelled().await;
            signal.is_cancelled()
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let observed = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(observed);
    }

    #[tokio::test]
    async fn test_cancel_before_wait_is_seen() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_then_drop_handle() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        drop(handle);
        assert!(signal.is_cancelled());

        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .unwrap();
    }

    #[test]
    fn test_cloned_signals_share_cancellation() {
        let (handle, signal) = cancel_pair();
        let observers = [signal.clone(), signal];
        let mut waiters: Vec<_> = observers.iter().map(|s| task::spawn(s.cancelled())).collect();
        for waiter in &mut waiters {
            assert_pending!(waiter.poll());
        }

        handle.clone().cancel();
        for waiter in &mut waiters {
            assert!(waiter.is_woken());
            assert_ready!(waiter.poll());
        }
        assert!(observers.iter().all(CancelSignal::is_cancelled));
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_stays_pending() {
        let signal = CancelSignal::never();
        assert!(!signal.is_cancelled());

        let result = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_without_cancel_stays_pending() {
        let (handle, signal) = cancel_pair();
        drop(handle);

        let result = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
