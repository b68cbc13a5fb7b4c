//! Result consumption
//!
//! The sink owns the input-ordered test sequence for the duration of a run,
//! along with the failure count and the halt flag. It is only reachable
//! through `&mut`, so each [`ResultSink::consume`] is one exclusive step.

use std::num::NonZeroUsize;
use tracing::{debug, info};

use crate::models::{ResultCode, TestItem};

pub struct ResultSink<'a, F> {
    items: &'a mut [TestItem],
    progress: F,
    max_failures: Option<NonZeroUsize>,
    failure_count: usize,
    halted: bool,
}

impl<'a, F> ResultSink<'a, F>
where
    F: FnMut(&TestItem),
{
    pub fn new(items: &'a mut [TestItem], max_failures: Option<NonZeroUsize>, progress: F) -> Self {
        Self {
            items,
            progress,
            max_failures,
            failure_count: 0,
            halted: false,
        }
    }

    pub fn items(&self) -> &[TestItem] {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    /// Whether the max-failures threshold has been reached. Never resets.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Record the completed item at `index`.
    ///
    /// Results arriving after the halt flag is set are dropped: the pool is
    /// about to be torn down and nothing more should be reported.
    ///
    /// # Panics
    ///
    /// If `completed` is not the item stored at `index`. That means the
    /// scheduler mixed up its bookkeeping, which is not a test failure.
    pub fn consume(&mut self, index: usize, completed: TestItem) {
        if self.halted {
            debug!(path = %completed.path, "dropping result received after halt");
            return;
        }

        assert_eq!(
            self.items[index].path, completed.path,
            "scheduler and worker disagree on test identity at index {index}"
        );

        let slot = &mut self.items[index];
        *slot = completed;
        (self.progress)(slot);

        if slot.code() == Some(ResultCode::Fail) {
            self.failure_count += 1;
        }

        if let Some(max) = self.max_failures {
            if self.failure_count == max.get() {
                info!(failures = self.failure_count, "reached maximum failures, halting");
                self.halted = true;
            }
        }
    }
}
