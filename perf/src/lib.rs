//! Shared fixtures for the criterion benches.

use basalt_admission::AdmissionConfig;
use basalt_ring::RingBuffer;
use tokio::runtime::{Builder, Runtime};

/// A ring of `bound` holding `0..bound`, so the next push evicts.
pub fn full_ring(bound: usize) -> RingBuffer<u64> {
    let mut ring = RingBuffer::new(bound).expect("bench bound must be valid");
    ring.extend(0..bound as u64);
    ring
}

pub fn bench_runtime() -> Runtime {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build bench runtime")
}

pub fn bench_limits(max_concurrent: usize, max_queue_size: usize) -> AdmissionConfig {
    AdmissionConfig {
        max_concurrent,
        max_queue_size,
        max_metrics_history: 128,
    }
}
