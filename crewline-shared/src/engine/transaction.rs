//! Unit-of-work execution
//!
//! [`TransactionCoordinator`] is the only component that finalizes writes.
//! Callers hand it a closure that receives the open transaction and returns
//! a boxed future:
//!
//! ```ignore
//! coordinator
//!     .run("assign_task", move |tx| {
//!         Box::pin(async move {
//!             let task = tx.assign_task(task_id, user_id).await?;
//!             tx.set_user_availability(user_id, Availability::Busy).await?;
//!             Ok(task)
//!         })
//!     })
//!     .await?;
//! ```
//!
//! The closure must only capture owned values; the transaction reference is
//! valid for the future's lifetime and no longer.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::store::{Store, StoreTx};

/// Runs units of work against a [`Store`]
#[derive(Clone)]
pub struct TransactionCoordinator {
    store: Arc<dyn Store>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TransactionCoordinator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Sets the per-unit deadline; `None` disables it
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `work` in a fresh transaction
    ///
    /// Commits when `work` returns `Ok`. On `Err`, or when the deadline
    /// passes, everything the unit wrote is rolled back and the error is
    /// returned.
    pub async fn run<T, F>(&self, operation: &'static str, work: F) -> EngineResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut dyn StoreTx) -> BoxFuture<'t, EngineResult<T>> + Send,
    {
        let mut tx = self.store.begin().await?;
        debug!(operation, "Unit started");

        let outcome = self.bounded(operation, work(tx.as_mut())).await;

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                debug!(operation, "Unit committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(operation, error = %rollback_err, "Rollback failed");
                }
                warn!(operation, error = %err, "Unit rolled back");
                Err(err)
            }
        }
    }

    /// Runs `work` in a transaction that is always rolled back
    ///
    /// For read-only analyses: whatever `work` does is never persisted.
    pub async fn read<T, F>(&self, operation: &'static str, work: F) -> EngineResult<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut dyn StoreTx) -> BoxFuture<'t, EngineResult<T>> + Send,
    {
        let mut tx = self.store.begin().await?;
        let outcome = self.bounded(operation, work(tx.as_mut())).await;

        if let Err(rollback_err) = tx.rollback().await {
            warn!(operation, error = %rollback_err, "Rollback of read-only unit failed");
        }
        outcome
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "Unit timed out");
                Err(EngineError::Timeout { operation })
            }),
            None => fut.await,
        }
    }
}
