//! The admission queue and its dispatch loop.
//!
//! # Task Lifecycle
//!
//! ```text
//!   execute ──► Queued ──► Running ──► Completed | Failed | Abandoned
//!      │           │
//!      ▼           ▼
//!   Rejected    Cleared
//! ```
//!
//! # Locking
//!
//! The wait list, the active count and the metrics live behind one mutex.
//! It is taken only for bookkeeping and is never held across an `.await`,
//! while a task runs, or while the listener is called. This keeps FIFO
//! start order and the concurrency limit intact on a multi-threaded runtime.
//!
//! # Dispatch
//!
//! Every critical section that frees a slot or adds a waiter also moves
//! waiters into free slots before the lock is released, so a full wait list
//! always means every slot is taken. The moved entries are spawned after the
//! lock is dropped by [`Shared::start`]. Spawning onto a runtime that is
//! shutting down drops the future on the spot, which settles its slot and
//! starts the next waiter from inside `start`. Those nested starts are queued
//! on a thread-local list and run by the outermost call, so stack depth never
//! depends on queue length.

use crate::error::{QueueFullError, SetupError};
use crate::event::{Listener, QueueEvent};
use crate::handle::{TaskHandle, TaskId};
use crate::job::{Job, QueueEntry, TypedJob};
use basalt_config::AdmissionConfig;
use basalt_metrics::{MetricsSnapshot, MetricsTracker};
use basalt_ring::BoundedQueue;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bounds concurrent asynchronous work and rejects what cannot be queued.
///
/// Cloning is cheap and every clone drives the same queue. Construct one per
/// owning service and pass it to whatever needs to submit work.
#[derive(Clone)]
pub struct AdmissionQueue {
    shared: Arc<Shared>,
}

pub struct AdmissionQueueBuilder {
    limits: AdmissionConfig,
    runtime: Option<Handle>,
    listener: Option<Listener>,
}

/// Read-only view for monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QueueMetrics {
    pub max_concurrent: usize,
    pub max_queue_size: usize,
    pub active_count: usize,
    pub queue_length: usize,
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
}

struct Shared {
    limits: AdmissionConfig,
    state: Mutex<State>,
    runtime: Handle,
    listener: Option<Listener>,
    /// Signalled whenever the queue becomes idle.
    idle: Notify,
}

struct State {
    waiting: BoundedQueue<QueueEntry>,
    active: usize,
    metrics: MetricsTracker,
    next_id: u64,
}

/// A waiter that has been given a slot but not yet spawned.
struct Admitted {
    entry: QueueEntry,
    active: usize,
}

thread_local! {
    /// Tasks waiting to be spawned by the outermost [`Shared::start`] on this
    /// thread. `None` when no `start` is running here.
    static STARTING: RefCell<Option<VecDeque<(Arc<Shared>, Admitted)>>> =
        const { RefCell::new(None) };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Settlement {
    Completed,
    Failed,
    Abandoned,
}

/// One occupied concurrency slot.
///
/// Dropping it releases the slot, records the outcome and dispatches the
/// next waiter. A task that panics drops its slot during unwinding, so the
/// slot is released as `Abandoned`.
pub(crate) struct RunningSlot {
    shared: Arc<Shared>,
    task: TaskId,
    started: Instant,
    settlement: Settlement,
}

impl AdmissionQueueBuilder {
    /// Runs admitted tasks on `runtime` instead of the ambient one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Registers a callback for every [`QueueEvent`].
    pub fn listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// # Errors
    /// - [`SetupError::Config`] if any limit is zero
    /// - [`SetupError::Capacity`] if a limit is too large for a ring
    /// - [`SetupError::NoRuntime`] if no runtime was given and none is running
    pub fn build(self) -> Result<AdmissionQueue, SetupError> {
        self.limits.validate()?;
        let waiting = BoundedQueue::new(self.limits.max_queue_size)?;
        let metrics = MetricsTracker::new(self.limits.max_metrics_history)?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };

        Ok(AdmissionQueue {
            shared: Arc::new(Shared {
                limits: self.limits,
                state: Mutex::new(State {
                    waiting,
                    active: 0,
                    metrics,
                    next_id: 0,
                }),
                runtime,
                listener: self.listener,
                idle: Notify::new(),
            }),
        })
    }
}

impl AdmissionQueue {
    pub fn builder(limits: AdmissionConfig) -> AdmissionQueueBuilder {
        AdmissionQueueBuilder {
            limits,
            runtime: None,
            listener: None,
        }
    }

    /// Builds a queue that spawns onto the current tokio runtime.
    pub fn new(limits: AdmissionConfig) -> Result<Self, SetupError> {
        Self::builder(limits).build()
    }

    pub fn with_runtime(limits: AdmissionConfig, runtime: Handle) -> Result<Self, SetupError> {
        Self::builder(limits).runtime(runtime).build()
    }

    /// Submits `task` for execution.
    ///
    /// If `max_queue_size` tasks are already waiting, the task is dropped
    /// unrun and [`QueueFullError`] is returned immediately. Otherwise the task
    /// is queued and, when a slot is free, started before this call returns.
    ///
    /// The returned handle resolves with the task's value, its error
    /// unchanged ([`crate::TaskError::Failed`]), or the reason it never ran.
    pub fn execute<F, Fut, T, E>(&self, task: F) -> Result<TaskHandle<T, E>, QueueFullError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job = Box::new(TypedJob::new(task, tx));

        let admitted = {
            let mut state = self.shared.lock();
            let id = TaskId(state.next_id);
            let entry = QueueEntry {
                id,
                job,
                enqueued_at: Instant::now(),
            };
            match state.waiting.try_enqueue(entry) {
                Ok(()) => {
                    state.next_id += 1;
                    let queue_length = state.waiting.len();
                    let ready = state.fill_slots(self.shared.limits.max_concurrent);
                    Ok((id, queue_length, ready))
                }
                Err(rejected) => {
                    state.metrics.record_rejection();
                    Err((rejected, state.metrics.reject_count()))
                }
            }
        };

        let (id, ready) = match admitted {
            Ok((id, queue_length, ready)) => {
                debug!(task = %id, queue_length, "task queued");
                self.shared.emit(QueueEvent::Enqueued {
                    task: id,
                    queue_length,
                });
                (id, ready)
            }
            Err((rejected, reject_count)) => {
                drop(rejected);
                warn!(
                    max_queue_size = self.shared.limits.max_queue_size,
                    reject_count, "admission queue full, task rejected"
                );
                self.shared.emit(QueueEvent::Rejected { reject_count });
                return Err(QueueFullError {
                    max_queue_size: self.shared.limits.max_queue_size,
                });
            }
        };

        self.shared.start(ready);
        Ok(TaskHandle::new(id, rx))
    }

    /// Settles every waiting task with [`crate::QueueClearedError`] and resets
    /// the metrics. Running tasks are left alone.
    ///
    /// Returns the number of tasks discarded.
    pub fn clear(&self) -> usize {
        let (discarded, idle) = {
            let mut state = self.shared.lock();
            let discarded: Vec<QueueEntry> = state.waiting.drain().collect();
            state.metrics.reset();
            (discarded, state.active == 0)
        };

        let count = discarded.len();
        for entry in discarded {
            debug!(task = %entry.id, "queued task discarded");
            entry.job.cancel();
        }

        info!(discarded = count, "admission queue cleared");
        self.shared.emit(QueueEvent::Cleared { discarded: count });
        if idle {
            self.shared.idle.notify_waiters();
        }
        count
    }

    /// Waits until nothing is queued or running.
    ///
    /// Submissions are still accepted meanwhile; a steady stream of new work
    /// can keep this pending indefinitely.
    pub async fn drain(&self) {
        loop {
            // Registered before the check so a wakeup in between is not lost
            let notified = self.shared.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn metrics(&self) -> QueueMetrics {
        let state = self.shared.lock();
        QueueMetrics {
            max_concurrent: self.shared.limits.max_concurrent,
            max_queue_size: self.shared.limits.max_queue_size,
            active_count: state.active,
            queue_length: state.waiting.len(),
            counters: state.metrics.snapshot(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.shared.lock().active
    }

    pub fn queue_length(&self) -> usize {
        self.shared.lock().waiting.len()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock();
        state.active == 0 && state.waiting.is_empty()
    }

    pub fn limits(&self) -> AdmissionConfig {
        self.shared.limits
    }
}

impl fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionQueue")
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent across a panic: no user code runs under the lock
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: QueueEvent) {
        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }

    /// Spawns tasks that already hold a slot, in the order given.
    ///
    /// A call made while another `start` is running on this thread only
    /// appends to that call's list.
    fn start(self: &Arc<Self>, ready: Vec<Admitted>) {
        if ready.is_empty() {
            return;
        }
        let outermost = STARTING.with_borrow_mut(|starting| {
            let outermost = starting.is_none();
            starting
                .get_or_insert_with(VecDeque::new)
                .extend(ready.into_iter().map(|admitted| (Arc::clone(self), admitted)));
            outermost
        });
        if !outermost {
            return;
        }

        let _reset = StartingReset;
        while let Some((shared, admitted)) =
            STARTING.with_borrow_mut(|starting| starting.as_mut().and_then(VecDeque::pop_front))
        {
            shared.launch(admitted);
        }
    }

    fn launch(self: &Arc<Self>, admitted: Admitted) {
        let Admitted { entry, active } = admitted;
        let waited = entry.enqueued_at.elapsed();
        let slot = RunningSlot {
            shared: Arc::clone(self),
            task: entry.id,
            started: Instant::now(),
            settlement: Settlement::Abandoned,
        };

        debug!(task = %entry.id, active, ?waited, "task started");
        self.emit(QueueEvent::Started {
            task: entry.id,
            active,
            waited,
        });
        self.runtime.spawn(entry.job.run(slot));
    }
}

impl State {
    /// Moves waiters into free slots, oldest first.
    fn fill_slots(&mut self, max_concurrent: usize) -> Vec<Admitted> {
        let mut ready = Vec::new();
        while self.active < max_concurrent {
            let Some(entry) = self.waiting.dequeue() else {
                break;
            };
            self.active += 1;
            ready.push(Admitted {
                entry,
                active: self.active,
            });
        }
        ready
    }
}

/// Empties this thread's start list when the outermost `start` returns.
///
/// Only a panicking listener can leave entries behind. Their slots are
/// released as abandoned so the active count stays true.
struct StartingReset;

impl Drop for StartingReset {
    fn drop(&mut self) {
        let leftover = STARTING.with_borrow_mut(Option::take).unwrap_or_default();
        for (shared, admitted) in leftover {
            drop(RunningSlot {
                shared,
                task: admitted.entry.id,
                started: Instant::now(),
                settlement: Settlement::Abandoned,
            });
        }
    }
}

impl RunningSlot {
    pub(crate) fn settle(mut self, settlement: Settlement) {
        self.settlement = settlement;
    }
}

impl Drop for RunningSlot {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let (ready, idle) = {
            let mut state = self.shared.lock();
            state.active = state.active.saturating_sub(1);
            match self.settlement {
                Settlement::Completed => state.metrics.record_processing(elapsed),
                Settlement::Failed | Settlement::Abandoned => state.metrics.record_failure(),
            }
            let ready = state.fill_slots(self.shared.limits.max_concurrent);
            (ready, state.active == 0 && state.waiting.is_empty())
        };

        let task = self.task;
        let event = match self.settlement {
            Settlement::Completed => {
                debug!(task = %task, ?elapsed, "task completed");
                QueueEvent::Completed { task, elapsed }
            }
            Settlement::Failed => {
                debug!(task = %task, ?elapsed, "task failed");
                QueueEvent::Failed { task, elapsed }
            }
            Settlement::Abandoned => {
                warn!(task = %task, "task abandoned before settling");
                QueueEvent::Abandoned { task }
            }
        };
        self.shared.emit(event);

        self.shared.start(ready);
        if idle {
            self.shared.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    fn limits(max_concurrent: usize, max_queue_size: usize) -> AdmissionConfig {
        AdmissionConfig {
            max_concurrent,
            max_queue_size,
            max_metrics_history: 8,
        }
    }

    #[test]
    fn build_without_runtime_fails() {
        let err = AdmissionQueue::new(limits(1, 1)).unwrap_err();
        assert!(matches!(err, SetupError::NoRuntime(_)));
    }

    #[test]
    fn build_with_explicit_runtime() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let queue = AdmissionQueue::with_runtime(limits(2, 4), rt.handle().clone()).unwrap();
        assert_eq!(queue.limits(), limits(2, 4));
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn zero_limits_are_rejected() {
        assert!(matches!(
            AdmissionQueue::new(limits(0, 1)),
            Err(SetupError::Config(_))
        ));
        assert!(matches!(
            AdmissionQueue::new(limits(1, 0)),
            Err(SetupError::Config(_))
        ));
    }

    #[tokio::test]
    async fn oversized_queue_is_rejected() {
        let err = AdmissionQueue::new(limits(1, basalt_ring::MAX_CAPACITY + 1)).unwrap_err();
        assert!(matches!(err, SetupError::Capacity(_)));
    }

    #[tokio::test]
    async fn task_value_reaches_the_handle() {
        let queue = AdmissionQueue::new(limits(1, 1)).unwrap();
        let handle = queue.execute(|| async { Ok::<_, String>(21 * 2) }).unwrap();
        assert_eq!(handle.id(), TaskId(0));
        assert_eq!(handle.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn task_error_is_passed_through_unchanged() {
        let queue = AdmissionQueue::new(limits(1, 1)).unwrap();
        let handle = queue
            .execute(|| async { Err::<(), _>(std::io::Error::other("boom")) })
            .unwrap();
        let err = handle.await.unwrap_err().into_failure().unwrap();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(queue.metrics().counters.total_failed, 1);
    }

    #[tokio::test]
    async fn panicking_task_releases_its_slot() {
        let queue = AdmissionQueue::new(limits(1, 2)).unwrap();
        let panics = queue
            .execute(|| async {
                if true {
                    panic!("task blew up");
                }
                Ok::<(), ()>(())
            })
            .unwrap();
        let next = queue.execute(|| async { Ok::<_, ()>("ran") }).unwrap();

        assert!(matches!(panics.await, Err(TaskError::Abandoned)));
        assert_eq!(next.await.unwrap(), "ran");
        assert!(queue.is_idle());
        assert_eq!(queue.metrics().counters.total_failed, 1);
    }

    #[tokio::test]
    async fn metrics_serialize_flat() {
        let queue = AdmissionQueue::new(limits(3, 5)).unwrap();
        let json = serde_json::to_value(queue.metrics()).unwrap();
        assert_eq!(json["max_concurrent"], 3);
        assert_eq!(json["max_queue_size"], 5);
        assert_eq!(json["active_count"], 0);
        assert_eq!(json["reject_count"], 0);
    }
}
