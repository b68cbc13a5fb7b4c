//! Sequential test execution
//!
//! Runs tests one at a time, in input order, in the calling task.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{PermitSet, ResultSink, RunError, TestExecutor, WorkerContext};
use crate::config::RunConfig;
use crate::models::TestItem;

/// Sequential scheduler
///
/// The deadline is not enforced here: a single slow test can overrun the
/// requested timeout. Serial mode is the low-throughput fallback.
pub struct SequentialScheduler<'e, E> {
    executor: &'e E,
    config: Arc<RunConfig>,
    cancel: CancellationToken,
}

impl<'e, E: TestExecutor> SequentialScheduler<'e, E> {
    pub fn new(executor: &'e E, config: Arc<RunConfig>, cancel: CancellationToken) -> Self {
        Self {
            executor,
            config,
            cancel,
        }
    }

    /// Run every test in order until done or the sink halts.
    pub async fn execute<F>(&self, sink: &mut ResultSink<'_, F>) -> Result<(), RunError>
    where
        F: FnMut(&TestItem),
    {
        let permits = Arc::new(PermitSet::from_groups(&self.config.parallelism_groups));
        let ctx = WorkerContext::new(0, Arc::clone(&self.config), permits);

        self.executor
            .init_worker(&ctx)
            .map_err(|source| RunError::WorkerInit { worker: 0, source })?;

        for index in 0..sink.len() {
            let item = sink.items()[index].clone();
            let path = item.path.clone();
            debug!(%path, "running test");

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("run cancelled");
                    return Err(RunError::Interrupted);
                }
                outcome = self.executor.run_one(&ctx, index, item) => outcome,
            };

            let completed = outcome.map_err(|source| RunError::Worker { path, source })?;
            sink.consume(index, completed);

            if sink.is_halted() {
                break;
            }
        }

        Ok(())
    }
}
