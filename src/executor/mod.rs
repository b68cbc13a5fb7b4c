//! Test execution engine
//!
//! Provides sequential and parallel test scheduling under a deadline and a
//! max-failures threshold. [`Run`] is the entry point.

mod error;
mod parallel;
mod permit;
mod pool;
mod run;
mod runner;
mod sink;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::RunError;
pub use parallel::ParallelScheduler;
pub use permit::{CountingPermit, Permit, PermitGuard, PermitSet, UnlimitedPermit};
pub use pool::{PoolEvent, WorkerPool};
pub use run::{Run, DEFAULT_TIMEOUT};
pub use runner::SequentialScheduler;
pub use sink::ResultSink;
pub use worker::{TestExecutor, WorkerContext};
