use crate::error::TaskError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Admission order of a task within one queue. Starts at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) type Outcome<T, E> = Result<T, TaskError<E>>;

/// Resolves with the outcome of an admitted task.
///
/// Dropping the handle does not cancel the task; it keeps its slot until it
/// settles and the result is discarded.
pub struct TaskHandle<T, E> {
    id: TaskId,
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    pub(crate) fn new(id: TaskId, rx: oneshot::Receiver<Outcome<T, E>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the job was dropped without settling
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(TaskError::Abandoned)))
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}
