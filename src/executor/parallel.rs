//! Parallel test execution
//!
//! Dispatches every test onto a fixed-size worker pool and consumes
//! completions as they arrive, under a deadline shared by the whole batch.

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pool::{PoolEvent, WorkerPool};
use super::{PermitSet, ResultSink, RunError, TestExecutor};
use crate::config::RunConfig;
use crate::models::TestItem;

/// How the wait loop ended when no error was raised
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WaitOutcome {
    /// Every dispatched test completed
    Completed,
    /// The max-failures threshold was reached
    Halted,
    /// The deadline passed before every test completed
    TimedOut,
}

/// Parallel scheduler
pub struct ParallelScheduler<E> {
    executor: Arc<E>,
    config: Arc<RunConfig>,
    workers: NonZeroUsize,
    cancel: CancellationToken,
}

impl<E: TestExecutor> ParallelScheduler<E> {
    pub fn new(
        executor: Arc<E>,
        config: Arc<RunConfig>,
        workers: NonZeroUsize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            config,
            workers,
            cancel,
        }
    }

    /// Run every test on the pool until done, halted, timed out, or failed.
    ///
    /// The pool is always joined before this returns. On every path other
    /// than full completion it is terminated first.
    pub async fn execute<F>(
        &self,
        sink: &mut ResultSink<'_, F>,
        deadline: Instant,
    ) -> Result<(), RunError>
    where
        F: FnMut(&TestItem),
    {
        let permits = Arc::new(PermitSet::from_groups(&self.config.parallelism_groups));
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut pool = WorkerPool::spawn(
            self.workers,
            Arc::clone(&self.executor),
            Arc::clone(&self.config),
            permits,
            events_tx,
        );

        for (index, item) in sink.items().iter().enumerate() {
            pool.submit(index, item.clone());
        }
        pool.close();

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("run cancelled, terminating workers");
                Err(RunError::Interrupted)
            }
            outcome = wait_for_results(sink, &mut events, deadline) => outcome,
        };

        match &outcome {
            Ok(WaitOutcome::Completed) => {}
            Ok(WaitOutcome::Halted) => {
                info!("halting run, terminating workers");
                pool.terminate();
            }
            Ok(WaitOutcome::TimedOut) => {
                warn!("deadline exceeded, terminating workers");
                pool.terminate();
            }
            Err(e) => {
                debug!("aborting run: {}", e);
                pool.terminate();
            }
        }
        pool.join().await;

        outcome.map(|_| ())
    }
}

/// Wait on dispatched tests in dispatch order.
///
/// Each wait is bounded by the time left until `deadline`, recomputed before
/// every wait. Completions of other tests that arrive meanwhile are consumed
/// right away; an error from a test is raised once the loop reaches it.
async fn wait_for_results<F>(
    sink: &mut ResultSink<'_, F>,
    events: &mut mpsc::UnboundedReceiver<PoolEvent>,
    deadline: Instant,
) -> Result<WaitOutcome, RunError>
where
    F: FnMut(&TestItem),
{
    let total = sink.len();
    let mut settled: Vec<Option<Result<(), RunError>>> = (0..total).map(|_| None).collect();

    for index in 0..total {
        while settled[index].is_none() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match tokio::time::timeout(remaining, events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    let pending = settled.iter().filter(|s| s.is_none()).count();
                    return Err(RunError::PoolExited { pending });
                }
                Err(_) => {
                    let pending = settled.iter().filter(|s| s.is_none()).count();
                    warn!(pending, "timed out waiting for test results");
                    return Ok(WaitOutcome::TimedOut);
                }
            };

            match event {
                PoolEvent::Completed {
                    index: done,
                    outcome: Ok(item),
                } => {
                    sink.consume(done, item);
                    settled[done] = Some(Ok(()));
                }
                PoolEvent::Completed {
                    index: done,
                    outcome: Err(e),
                } => {
                    warn!("test at index {} raised an error: {}", done, e);
                    settled[done] = Some(Err(e));
                }
                PoolEvent::InitFailed { worker, error } => {
                    return Err(RunError::WorkerInit {
                        worker,
                        source: error,
                    });
                }
            }

            if sink.is_halted() {
                return Ok(WaitOutcome::Halted);
            }
        }

        if let Some(Err(e)) = settled[index].take() {
            return Err(e);
        }
    }

    Ok(WaitOutcome::Completed)
}
