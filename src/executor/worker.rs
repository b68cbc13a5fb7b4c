//! Executor contract
//!
//! The scheduler never looks inside a test. A [`TestExecutor`] runs one item
//! and hands it back with its result attached.

use std::future::Future;
use std::sync::Arc;

use super::PermitSet;
use crate::config::RunConfig;
use crate::models::TestItem;

/// Shared state handed to every worker
#[derive(Clone, Debug)]
pub struct WorkerContext {
    pub worker_id: usize,
    pub config: Arc<RunConfig>,
    pub permits: Arc<PermitSet>,
}

impl WorkerContext {
    pub fn new(worker_id: usize, config: Arc<RunConfig>, permits: Arc<PermitSet>) -> Self {
        Self {
            worker_id,
            config,
            permits,
        }
    }
}

/// Runs a single test item
///
/// Ordinary test failures must be reported as a result code on the returned
/// item. An `Err` means the environment itself is broken and aborts the run.
///
/// Implementations acquire the permit for the item's parallelism group from
/// [`WorkerContext::permits`] around the part of the test that must respect
/// the group's bound.
pub trait TestExecutor: Send + Sync + 'static {
    /// Called once per worker before it runs its first item.
    fn init_worker(&self, ctx: &WorkerContext) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Execute `item` and return it with its result set.
    fn run_one(
        &self,
        ctx: &WorkerContext,
        index: usize,
        item: TestItem,
    ) -> impl Future<Output = anyhow::Result<TestItem>> + Send;
}
