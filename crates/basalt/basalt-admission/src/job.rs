//! Type-erased wait-list entries.
//!
//! The wait list holds tasks with different output and error types, so each
//! one is boxed behind [`Job`] together with the sender that reports back to
//! its [`crate::TaskHandle`].

use crate::error::{QueueClearedError, TaskError};
use crate::handle::{Outcome, TaskId};
use crate::queue::{RunningSlot, Settlement};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::oneshot;
use tokio::time::Instant;

pub(crate) type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(crate) trait Job: Send {
    /// Builds the future that runs the task, releases `slot` and reports the
    /// outcome, in that order.
    fn run(self: Box<Self>, slot: RunningSlot) -> JobFuture;

    /// Settles the handle without running the task.
    fn cancel(self: Box<Self>);
}

pub(crate) struct TypedJob<F, T, E> {
    task: F,
    tx: oneshot::Sender<Outcome<T, E>>,
}

impl<F, T, E> TypedJob<F, T, E> {
    pub(crate) fn new(task: F, tx: oneshot::Sender<Outcome<T, E>>) -> Self {
        Self { task, tx }
    }
}

impl<F, Fut, T, E> Job for TypedJob<F, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn run(self: Box<Self>, slot: RunningSlot) -> JobFuture {
        let TypedJob { task, tx } = *self;
        Box::pin(async move {
            let result = task().await;
            let settlement = match result {
                Ok(_) => Settlement::Completed,
                Err(_) => Settlement::Failed,
            };
            // Free the slot before the caller can observe the result
            slot.settle(settlement);
            let _ = tx.send(result.map_err(TaskError::Failed));
        })
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Err(TaskError::Cleared(QueueClearedError)));
    }
}

/// A task waiting for a free slot.
pub(crate) struct QueueEntry {
    pub(crate) id: TaskId,
    pub(crate) job: Box<dyn Job>,
    pub(crate) enqueued_at: Instant,
}
