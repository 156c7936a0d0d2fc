//! Per-call deadline and cancellation
//!
//! A [`CallContext`] travels with every engine call. When its deadline
//! passes or its [`CancelHandle`] fires, the engine abandons the in-flight
//! attempt (dropping the transaction, which rolls it back) and returns
//! `DeadlineExceeded` / `Canceled`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::error::WalletError;

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Fires the cancellation signal of the contexts created with it
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// No deadline, never canceled
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Attach a fresh cancellation signal to this context.
    pub fn cancelable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check
    pub fn check(&self) -> Result<(), WalletError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(WalletError::Canceled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(WalletError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the call must be abandoned. Pending forever for a
    /// background context.
    pub async fn done(&self) -> WalletError {
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        let canceled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        let fired = *rx.borrow_and_update();
                        if fired {
                            break;
                        }
                        if rx.changed().await.is_err() {
                            // Handle dropped without firing
                            std::future::pending::<()>().await;
                        }
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = canceled => WalletError::Canceled,
            _ = deadline => WalletError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let ctx = CallContext::with_timeout(Duration::from_millis(100));
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.done().await, WalletError::DeadlineExceeded);
        assert_eq!(ctx.check(), Err(WalletError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_fires() {
        let (ctx, handle) = CallContext::background().cancelable();
        assert!(ctx.check().is_ok());

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };
        handle.cancel();

        assert_eq!(waiter.await.unwrap(), WalletError::Canceled);
        assert_eq!(ctx.check(), Err(WalletError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_never_cancels() {
        let (ctx, handle) = CallContext::with_timeout(Duration::from_secs(1)).cancelable();
        drop(handle);
        // Falls through to the deadline instead of reporting Canceled
        assert_eq!(ctx.done().await, WalletError::DeadlineExceeded);
    }
}
