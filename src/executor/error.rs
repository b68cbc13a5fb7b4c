//! Scheduler errors
//!
//! Only conditions that abort a run are errors. Test failures, timeouts and
//! the max-failures threshold are part of the result model instead.

use thiserror::Error;

/// Errors that abort a scheduler run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("test '{path}' could not be executed: {source:#}")]
    Worker {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("test '{path}' panicked: {message}")]
    WorkerPanicked { path: String, message: String },

    #[error("worker {worker} failed to initialize: {source:#}")]
    WorkerInit {
        worker: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker pool exited with {pending} test(s) still pending")]
    PoolExited { pending: usize },

    #[error("unknown parallelism group '{group}'")]
    UnknownGroup { group: String },

    #[error("parallelism group '{group}' is closed")]
    PermitClosed { group: String },

    #[error("run interrupted")]
    Interrupted,
}

impl RunError {
    /// Whether the run was stopped by an external cancellation request.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, RunError::Interrupted)
    }
}
