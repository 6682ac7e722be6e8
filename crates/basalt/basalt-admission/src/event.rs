use crate::handle::TaskId;
use std::sync::Arc;
use std::time::Duration;

/// State change reported to the listener registered on the builder.
///
/// Listeners run on whichever thread caused the change, after the queue's
/// internal lock is released. They must be cheap and must not panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Enqueued { task: TaskId, queue_length: usize },
    Started { task: TaskId, active: usize, waited: Duration },
    Completed { task: TaskId, elapsed: Duration },
    Failed { task: TaskId, elapsed: Duration },
    Abandoned { task: TaskId },
    Rejected { reject_count: u64 },
    Cleared { discarded: usize },
}

pub(crate) type Listener = Arc<dyn Fn(&QueueEvent) + Send + Sync>;
