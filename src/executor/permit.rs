//! Parallelism group permits
//!
//! Every parallelism group gets one [`Permit`]. Groups declared without a
//! bound get an [`UnlimitedPermit`] that never blocks; bounded groups get a
//! [`CountingPermit`] backed by a semaphore. Permits are released by dropping
//! the returned [`PermitGuard`], so release happens on every exit path.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use super::RunError;

/// Acquire/release capability enforcing a parallelism group's bound
pub trait Permit: Send + Sync + fmt::Debug {
    /// Wait until the group admits one more running test.
    fn acquire(&self) -> BoxFuture<'_, Result<PermitGuard, RunError>>;

    /// Maximum number of concurrent holders, `None` when unlimited.
    fn bound(&self) -> Option<usize>;
}

/// Held while a test runs inside its parallelism group
#[must_use = "the permit is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PermitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

impl PermitGuard {
    fn unlimited() -> Self {
        Self { _permit: None }
    }

    /// Release the permit. Same as dropping the guard.
    pub fn release(self) {}
}

/// Permit for a group with no bound
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlimitedPermit;

impl Permit for UnlimitedPermit {
    fn acquire(&self) -> BoxFuture<'_, Result<PermitGuard, RunError>> {
        Box::pin(async { Ok(PermitGuard::unlimited()) })
    }

    fn bound(&self) -> Option<usize> {
        None
    }
}

/// Counting permit admitting at most `bound` holders at once
#[derive(Debug)]
pub struct CountingPermit {
    group: String,
    bound: NonZeroUsize,
    semaphore: Arc<Semaphore>,
}

impl CountingPermit {
    pub fn new(group: impl Into<String>, bound: NonZeroUsize) -> Self {
        Self {
            group: group.into(),
            bound,
            semaphore: Arc::new(Semaphore::new(bound.get())),
        }
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Permit for CountingPermit {
    fn acquire(&self) -> BoxFuture<'_, Result<PermitGuard, RunError>> {
        let semaphore = Arc::clone(&self.semaphore);
        Box::pin(async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| RunError::PermitClosed {
                    group: self.group.clone(),
                })?;
            trace!(group = %self.group, "acquired parallelism permit");
            Ok(PermitGuard {
                _permit: Some(permit),
            })
        })
    }

    fn bound(&self) -> Option<usize> {
        Some(self.bound.get())
    }
}

/// The permits of every configured parallelism group, shared by all workers
#[derive(Debug, Default)]
pub struct PermitSet {
    permits: BTreeMap<String, Arc<dyn Permit>>,
}

impl PermitSet {
    /// Build one permit per group: unlimited for `None`, counting otherwise.
    pub fn from_groups(groups: &BTreeMap<String, Option<NonZeroUsize>>) -> Self {
        let permits = groups
            .iter()
            .map(|(name, bound)| {
                let permit: Arc<dyn Permit> = match bound {
                    Some(bound) => Arc::new(CountingPermit::new(name.clone(), *bound)),
                    None => Arc::new(UnlimitedPermit),
                };
                (name.clone(), permit)
            })
            .collect();

        Self { permits }
    }

    pub fn get(&self, group: &str) -> Option<&Arc<dyn Permit>> {
        self.permits.get(group)
    }

    pub fn len(&self) -> usize {
        self.permits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permits.is_empty()
    }

    /// Acquire the permit for `group`. Tests outside any group never wait.
    pub async fn acquire(&self, group: Option<&str>) -> Result<PermitGuard, RunError> {
        let Some(group) = group else {
            return Ok(PermitGuard::unlimited());
        };

        let permit = self.get(group).ok_or_else(|| RunError::UnknownGroup {
            group: group.to_string(),
        })?;
        permit.acquire().await
    }
}
