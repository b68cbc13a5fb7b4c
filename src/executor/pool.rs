//! Worker pool
//!
//! A fixed number of worker tasks pull jobs from a shared queue. Each worker
//! initializes once, then runs jobs until the queue is closed and drained.
//! Completions go back to the controller over a channel; workers never touch
//! the result sink.

use futures::FutureExt;
use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{PermitSet, RunError, TestExecutor, WorkerContext};
use crate::config::RunConfig;
use crate::models::TestItem;

struct Job {
    index: usize,
    item: TestItem,
}

/// Notification sent from a worker to the controller
#[derive(Debug)]
pub enum PoolEvent {
    Completed {
        index: usize,
        outcome: Result<TestItem, RunError>,
    },
    InitFailed {
        worker: usize,
        error: anyhow::Error,
    },
}

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    jobs: Option<mpsc::UnboundedSender<Job>>,
}

impl WorkerPool {
    /// Start `size` workers sharing `config` and `permits`.
    pub fn spawn<E: TestExecutor>(
        size: NonZeroUsize,
        executor: Arc<E>,
        config: Arc<RunConfig>,
        permits: Arc<PermitSet>,
        events: mpsc::UnboundedSender<PoolEvent>,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let jobs_rx = Arc::new(Mutex::new(jobs_rx));

        let workers = (0..size.get())
            .map(|worker_id| {
                let ctx = WorkerContext::new(worker_id, Arc::clone(&config), Arc::clone(&permits));
                tokio::spawn(worker_loop(
                    ctx,
                    Arc::clone(&executor),
                    Arc::clone(&jobs_rx),
                    events.clone(),
                ))
            })
            .collect();

        debug!(workers = size.get(), "started worker pool");

        Self {
            workers,
            jobs: Some(jobs_tx),
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a test for execution. Returns `false` once the pool is closed.
    pub fn submit(&self, index: usize, item: TestItem) -> bool {
        match &self.jobs {
            Some(jobs) => jobs.send(Job { index, item }).is_ok(),
            None => false,
        }
    }

    /// Stop accepting jobs. Workers exit after draining the queue.
    pub fn close(&mut self) {
        self.jobs = None;
    }

    /// Abort every worker, discarding queued and running jobs.
    pub fn terminate(&mut self) {
        self.close();
        for worker in &self.workers {
            worker.abort();
        }
        debug!(workers = self.workers.len(), "terminated worker pool");
    }

    /// Wait for every worker task to finish.
    pub async fn join(&mut self) {
        for worker in self.workers.drain(..) {
            match worker.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!("worker task failed: {}", e),
            }
        }
        debug!("worker pool joined");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            warn!(
                workers = self.workers.len(),
                "worker pool dropped without join, aborting workers"
            );
            for worker in &self.workers {
                worker.abort();
            }
        }
    }
}

async fn worker_loop<E: TestExecutor>(
    ctx: WorkerContext,
    executor: Arc<E>,
    jobs: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    events: mpsc::UnboundedSender<PoolEvent>,
) {
    if let Err(error) = executor.init_worker(&ctx) {
        let _ = events.send(PoolEvent::InitFailed {
            worker: ctx.worker_id,
            error,
        });
        return;
    }

    loop {
        let job = jobs.lock().await.recv().await;
        let Some(Job { index, item }) = job else {
            break;
        };

        let path = item.path.clone();
        debug!(worker = ctx.worker_id, %path, "running test");

        let outcome = match AssertUnwindSafe(executor.run_one(&ctx, index, item))
            .catch_unwind()
            .await
        {
            Ok(Ok(item)) => Ok(item),
            Ok(Err(source)) => Err(RunError::Worker { path, source }),
            Err(panic) => Err(RunError::WorkerPanicked {
                path,
                message: panic_message(panic.as_ref()),
            }),
        };

        if events.send(PoolEvent::Completed { index, outcome }).is_err() {
            break;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::ScriptedExecutor;
    use crate::models::ResultCode;

    #[tokio::test]
    async fn test_pool_runs_submitted_jobs() {
        let executor = Arc::new(ScriptedExecutor::new());
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut pool = WorkerPool::spawn(
            NonZeroUsize::new(2).unwrap(),
            Arc::clone(&executor),
            Arc::new(RunConfig::default()),
            Arc::new(PermitSet::default()),
            events_tx,
        );
        assert_eq!(pool.size(), 2);

        assert!(pool.submit(0, TestItem::new("a")));
        assert!(pool.submit(1, TestItem::new("b")));
        pool.close();
        assert!(!pool.submit(2, TestItem::new("c")));

        let mut completed = Vec::new();
        while let Some(event) = events.recv().await {
            match event {
                PoolEvent::Completed { index, outcome } => {
                    let item = outcome.unwrap();
                    assert_eq!(item.code(), Some(ResultCode::Pass));
                    completed.push(index);
                }
                PoolEvent::InitFailed { .. } => panic!("unexpected init failure"),
            }
        }
        completed.sort();
        assert_eq!(completed, vec![0, 1]);

        pool.join().await;
        assert_eq!(pool.size(), 0);
        assert_eq!(executor.init_calls(), 2);
    }

    #[tokio::test]
    async fn test_terminate_discards_running_jobs() {
        let executor = Arc::new(
            ScriptedExecutor::new().slow("slow", std::time::Duration::from_secs(30)),
        );
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut pool = WorkerPool::spawn(
            NonZeroUsize::MIN,
            Arc::clone(&executor),
            Arc::new(RunConfig::default()),
            Arc::new(PermitSet::default()),
            events_tx,
        );
        pool.submit(0, TestItem::new("slow"));

        tokio::task::yield_now().await;
        pool.terminate();
        pool.join().await;

        assert!(events.recv().await.is_none());
        assert_eq!(Arc::strong_count(&executor), 1);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
