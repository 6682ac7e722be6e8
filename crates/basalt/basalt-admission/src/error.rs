use basalt_config::ConfigError;
use basalt_ring::CapacityError;
use thiserror::Error;

/// Returned synchronously by `execute` when the wait list is saturated.
///
/// This is a backpressure signal, not a defect: the caller may retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("admission queue full ({max_queue_size} tasks already waiting)")]
pub struct QueueFullError {
    pub max_queue_size: usize,
}

/// Delivered to tasks that were still waiting when the queue was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("admission queue was cleared before the task started")]
pub struct QueueClearedError;

/// How an admitted task can fail to produce a value.
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task ran and returned its own error, passed through unchanged.
    #[error("task failed: {0}")]
    Failed(E),

    #[error(transparent)]
    Cleared(#[from] QueueClearedError),

    /// The task panicked, or the runtime shut down before it settled.
    #[error("task ended without producing a result")]
    Abandoned,
}

impl<E> TaskError<E> {
    /// The task's own error, if that is what happened.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(err) => Some(err),
            TaskError::Cleared(_) | TaskError::Abandoned => None,
        }
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, TaskError::Cleared(_))
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid admission limits")]
    Config(#[from] ConfigError),

    #[error("invalid queue bound")]
    Capacity(#[from] CapacityError),

    #[error("no tokio runtime available to run admitted tasks")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
