//! Run controller
//!
//! Entry point for executing a batch of tests. Picks the sequential or
//! parallel scheduler, applies the deadline, and marks every test that never
//! finished as unresolved.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ParallelScheduler, ResultSink, RunError, SequentialScheduler, TestExecutor};
use crate::config::RunConfig;
use crate::models::{TestItem, TestResult};
use crate::utils::Timer;

/// Horizon used when no timeout is given. Keeps deadline arithmetic finite.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A configured test run
pub struct Run<E> {
    executor: Arc<E>,
    config: Arc<RunConfig>,
    workers: NonZeroUsize,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<E: TestExecutor> Run<E> {
    /// A sequential run with no timeout.
    pub fn new(executor: Arc<E>, config: RunConfig) -> Self {
        Self {
            executor,
            config: Arc::new(config),
            workers: NonZeroUsize::MIN,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token the host can fire to abort the run, e.g. on Ctrl-C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    pub fn is_parallel(&self) -> bool {
        self.workers.get() > 1
    }

    /// Execute `items`, calling `progress` for each completed test.
    ///
    /// Every item ends up with a result. Items that never completed (halted,
    /// timed out, or aborted by an error) are marked unresolved, and
    /// `progress` is not called for them. Returns the elapsed wall time.
    ///
    /// A failing test is not an error. Errors are reserved for broken
    /// executors ([`RunError::Worker`] and friends), returned after results
    /// are finalized, and for [`RunError::Interrupted`], which returns
    /// immediately and leaves unfinished items without a result.
    pub async fn execute<F>(&self, items: &mut [TestItem], progress: F) -> Result<Duration, RunError>
    where
        F: FnMut(&TestItem),
    {
        if items.is_empty() {
            return Ok(Duration::ZERO);
        }

        // Longer timeouts are clamped so `Instant` arithmetic cannot overflow.
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT).min(DEFAULT_TIMEOUT);
        let timer = Timer::start("test run");
        let deadline = Instant::now() + timeout;

        info!(
            tests = items.len(),
            workers = self.workers.get(),
            timeout_secs = self.timeout.map(|t| t.as_secs_f64()),
            "starting test run"
        );

        let mut sink = ResultSink::new(items, self.config.max_failures, progress);
        let outcome = if self.is_parallel() {
            ParallelScheduler::new(
                Arc::clone(&self.executor),
                Arc::clone(&self.config),
                self.workers,
                self.cancel.clone(),
            )
            .execute(&mut sink, deadline)
            .await
        } else {
            SequentialScheduler::new(
                self.executor.as_ref(),
                Arc::clone(&self.config),
                self.cancel.clone(),
            )
            .execute(&mut sink)
            .await
        };
        drop(sink);

        if let Err(RunError::Interrupted) = outcome {
            return Err(RunError::Interrupted);
        }

        let mut unresolved = 0;
        for item in items.iter_mut().filter(|item| !item.has_result()) {
            item.set_result(TestResult::unresolved());
            unresolved += 1;
        }
        if unresolved > 0 {
            warn!(unresolved, "some tests did not complete");
        }

        let elapsed = timer.stop();
        outcome.map(|()| elapsed)
    }
}
