/// Cancellable operation context passed to every lookup
use crate::error::{LookupError, LookupResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Deadline and cancellation signal for one logical operation
///
/// Cloning is cheap; all clones observe the same cancellation. A background
/// context can never be cancelled, only time out.
#[derive(Debug, Clone)]
pub struct LookupContext {
    cancelled: watch::Receiver<bool>,
    deadline: Option<Instant>,
}

/// Cancels every clone of the [`LookupContext`] it was created with
#[cfg(test)]
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

#[cfg(test)]
impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl LookupContext {
    /// Context with no deadline that is never cancelled
    pub fn background() -> Self {
        let (_, cancelled) = watch::channel(false);
        Self {
            cancelled,
            deadline: None,
        }
    }

    /// Context with no deadline plus the handle that cancels it
    #[cfg(test)]
    pub fn cancellable() -> (Self, CancelHandle) {
        let (sender, cancelled) = watch::channel(false);
        (
            Self {
                cancelled,
                deadline: None,
            },
            CancelHandle { sender },
        )
    }

    /// Same cancellation, deadline at most `timeout` from now
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancelled: self.cancelled.clone(),
            deadline: Some(match self.deadline {
                Some(existing) => existing.min(deadline),
                None => deadline,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    #[cfg(test)]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the context is cancelled; pends forever otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without cancelling: never fires
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `fut` until it finishes, the context is cancelled, or the
    /// deadline passes, whichever comes first
    pub async fn run<F, T>(&self, operation: &str, fut: F) -> LookupResult<T>
    where
        F: Future<Output = LookupResult<T>>,
    {
        if self.is_cancelled() {
            return Err(LookupError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = fut => result,
            _ = self.cancelled() => Err(LookupError::Cancelled),
            _ = deadline => Err(LookupError::Timeout(operation.to_string())),
        }
    }
}

impl Default for LookupContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let ctx = LookupContext::background();
        let value = ctx.run("noop", async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_operation() {
        let (ctx, handle) = LookupContext::cancellable();

        let task = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                ctx.run("slow", async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
                .await
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert_eq!(result, Err(LookupError::Cancelled));
        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn test_already_cancelled_context_never_polls() {
        let (ctx, handle) = LookupContext::cancellable();
        handle.cancel();

        let polled = std::sync::atomic::AtomicBool::new(false);
        let result = ctx
            .run("never", async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(result, Err(LookupError::Cancelled));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_deadline_surfaces_timeout() {
        let ctx = LookupContext::background().with_timeout(Duration::from_millis(10));

        let result = ctx
            .run("usersingroup", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(LookupError::Timeout("usersingroup".to_string())));
    }

    #[test]
    fn test_with_timeout_keeps_earliest_deadline() {
        let ctx = LookupContext::background().with_timeout(Duration::from_secs(1));
        let first = ctx.deadline().unwrap();
        let widened = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(widened.deadline(), Some(first));
    }
}
