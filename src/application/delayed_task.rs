//! Work that completes after a fixed delay and can be cancelled before then.
//!
//! Built on `tokio::time`, so tests can pause the clock and advance it
//! explicitly instead of waiting on wall-clock time.

use futures::future::{AbortHandle, Abortable, Aborted};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelayedTaskError {
    #[error("Delayed task was cancelled")]
    Cancelled,
    #[error("Delayed task failed: {0}")]
    Failed(String),
}

/// A scheduled unit of work running on the tokio runtime.
pub struct DelayedTask<T> {
    handle: JoinHandle<Result<T, Aborted>>,
    abort: AbortHandle,
    delay: Duration,
}

impl<T: Send + 'static> DelayedTask<T> {
    /// Schedules `work` to run once `delay` has elapsed.
    pub fn schedule<F>(delay: Duration, work: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        let future = Abortable::new(
            async move {
                tokio::time::sleep(delay).await;
                work()
            },
            registration,
        );
        debug!(delay_ms = delay.as_millis() as u64, "Delayed task scheduled");
        Self {
            handle: tokio::spawn(future),
            abort,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels the task. The work is skipped if it has not run yet.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the work to run and returns its output.
    pub async fn wait(self) -> Result<T, DelayedTaskError> {
        match self.handle.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(Aborted)) => Err(DelayedTaskError::Cancelled),
            Err(join_error) => Err(DelayedTaskError::Failed(join_error.to_string())),
        }
    }
}
