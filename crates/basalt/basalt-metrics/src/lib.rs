//! Moving-window counters for the admission queue.
//!
//! `MetricsTracker` keeps the last `max_history` processing durations in a
//! [`RingBuffer`] plus a running sum, so the average is O(1) to read and the
//! window never grows. Counters (`total_processed`, `total_failed`,
//! `reject_count`) are cumulative until [`MetricsTracker::reset`].

use basalt_ring::{CapacityError, RingBuffer};
use serde::Serialize;
use std::time::Duration;

pub struct MetricsTracker {
    window: RingBuffer<Duration>,
    /// Sum of every duration currently in `window`.
    window_sum: Duration,
    total_processed: u64,
    total_failed: u64,
    reject_count: u64,
}

/// Point-in-time copy of a tracker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_processed: u64,
    pub total_failed: u64,
    pub reject_count: u64,
    /// Samples currently contributing to the average.
    pub window_len: usize,
    pub average_processing_ms: f64,
}

impl MetricsTracker {
    /// # Errors
    /// Returns [`CapacityError`] if `max_history` is zero or too large for a ring.
    pub fn new(max_history: usize) -> Result<Self, CapacityError> {
        Ok(Self {
            window: RingBuffer::new(max_history)?,
            window_sum: Duration::ZERO,
            total_processed: 0,
            total_failed: 0,
            reject_count: 0,
        })
    }

    /// Records a successful completion that took `elapsed`.
    pub fn record_processing(&mut self, elapsed: Duration) {
        if let Some(evicted) = self.window.push(elapsed) {
            self.window_sum -= evicted;
        }
        self.window_sum += elapsed;
        self.total_processed += 1;
    }

    /// Records a task that settled with an error or never settled.
    pub fn record_failure(&mut self) {
        self.total_failed += 1;
    }

    pub fn record_rejection(&mut self) {
        self.reject_count += 1;
    }

    /// Mean of the durations in the window, or zero if nothing was recorded.
    pub fn average_processing_time(&self) -> Duration {
        match u32::try_from(self.window.len()) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.window_sum / n,
            // MAX_CAPACITY is 2^30, so the window length always fits in u32
            Err(_) => Duration::ZERO,
        }
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    pub fn total_failed(&self) -> u64 {
        self.total_failed
    }

    pub fn reject_count(&self) -> u64 {
        self.reject_count
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn max_history(&self) -> usize {
        self.window.bound()
    }

    /// Durations in the window, oldest first.
    pub fn history(&self) -> impl Iterator<Item = Duration> + '_ {
        self.window.iter().copied()
    }

    /// Zeroes every counter and empties the window.
    pub fn reset(&mut self) {
        self.window.clear();
        self.window_sum = Duration::ZERO;
        self.total_processed = 0;
        self.total_failed = 0;
        self.reject_count = 0;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_processed: self.total_processed,
            total_failed: self.total_failed,
            reject_count: self.reject_count,
            window_len: self.window.len(),
            average_processing_ms: self.average_processing_time().as_secs_f64() * 1_000.0,
        }
    }
}

impl std::fmt::Debug for MetricsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsTracker")
            .field("max_history", &self.max_history())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
