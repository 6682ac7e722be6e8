//! Concurrency-limited admission queue for asynchronous tasks.
//!
//! Tasks submitted through [`AdmissionQueue::execute`] either start right away,
//! wait in a bounded FIFO list, or are rejected on the spot when that list is
//! full. Completion of a task frees its slot and starts the oldest waiter.

mod error;
mod event;
mod handle;
mod job;
mod queue;

pub use error::{QueueClearedError, QueueFullError, SetupError, TaskError};
pub use event::QueueEvent;
pub use handle::{TaskHandle, TaskId};
pub use queue::{AdmissionQueue, AdmissionQueueBuilder, QueueMetrics};

pub use basalt_config::AdmissionConfig;
