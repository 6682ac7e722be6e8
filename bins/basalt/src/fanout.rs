//! Simulated outbound fan-out driven through an admission queue.
//!
//! Each job stands in for an upstream call: it sleeps for a latency derived
//! from its index and fails every `failure_every`-th time. When the queue
//! pushes back with QueueFullError, the submitter waits one base latency and
//! retries the same job, which is how a real producer would honour the signal.

use anyhow::anyhow;
use basalt_admission::{AdmissionConfig, AdmissionQueue, QueueMetrics, TaskError, TaskHandle};
use basalt_config::WorkloadConfig;
use basalt_ring::{BoundedQueue, RingBuffer};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// How many failure messages the report keeps.
const RECENT_FAILURES: usize = 8;

pub struct FanOut {
    queue: AdmissionQueue,
    workload: WorkloadConfig,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub pushbacks: u64,
    pub recent_latency: LatencySummary,
    pub recent_failures: Vec<String>,
    pub queue: QueueMetrics,
}

/// End-to-end latency (queue wait + processing) over the rolling window.
#[derive(Debug, Serialize)]
pub struct LatencySummary {
    pub samples: usize,
    pub mean_ms: f64,
    pub max_ms: f64,
}

impl FanOut {
    pub fn new(queue: AdmissionQueue, workload: WorkloadConfig) -> Self {
        Self { queue, workload }
    }

    pub fn limits(&self) -> AdmissionConfig {
        self.queue.limits()
    }

    pub async fn run(&self) -> anyhow::Result<RunReport> {
        let backoff = Duration::from_millis(self.workload.base_latency_ms.max(1));
        let mut handles = Vec::with_capacity(self.workload.tasks);
        let mut pushbacks = 0u64;

        for index in 0..self.workload.tasks {
            let handle = loop {
                match self.submit(index) {
                    Ok(handle) => break handle,
                    Err(full) => {
                        pushbacks += 1;
                        debug!(index, %full, "pushed back, retrying");
                        tokio::time::sleep(backoff).await;
                    }
                }
            };
            handles.push(handle);
        }

        let mut latencies = RingBuffer::new(self.workload.latency_window)?;
        let mut failures = BoundedQueue::new(RECENT_FAILURES)?;
        let mut succeeded = 0;
        let mut failed = 0;

        for handle in handles {
            match handle.await {
                Ok(latency) => {
                    succeeded += 1;
                    latencies.push(latency);
                }
                Err(TaskError::Failed(err)) => {
                    failed += 1;
                    failures.enqueue(err.to_string());
                }
                Err(other) => {
                    failed += 1;
                    failures.enqueue(other.to_string());
                }
            }
        }

        self.queue.drain().await;
        info!(succeeded, failed, pushbacks, "fan-out finished");

        Ok(RunReport {
            submitted: self.workload.tasks,
            succeeded,
            failed,
            pushbacks,
            recent_latency: summarize(&latencies),
            recent_failures: failures.to_vec(),
            queue: self.queue.metrics(),
        })
    }

    fn submit(
        &self,
        index: usize,
    ) -> Result<TaskHandle<Duration, anyhow::Error>, basalt_admission::QueueFullError> {
        let submitted_at = Instant::now();
        let latency = Duration::from_millis(self.workload.base_latency_ms * (1 + index as u64 % 7));
        let fails = self.workload.failure_every != 0 && (index + 1) % self.workload.failure_every == 0;

        self.queue.execute(move || async move {
            tokio::time::sleep(latency).await;
            if fails {
                return Err(anyhow!("upstream call {index} failed after {latency:?}"));
            }
            Ok(submitted_at.elapsed())
        })
    }
}

fn summarize(latencies: &RingBuffer<Duration>) -> LatencySummary {
    let samples = latencies.len();
    let total: Duration = latencies.iter().sum();
    let max = latencies.iter().max().copied().unwrap_or_default();
    let mean_ms = if samples == 0 {
        0.0
    } else {
        total.as_secs_f64() * 1_000.0 / samples as f64
    };
    LatencySummary {
        samples,
        mean_ms,
        max_ms: max.as_secs_f64() * 1_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn every_job_is_accounted_for_despite_pushback() {
        let queue = AdmissionQueue::new(AdmissionConfig {
            max_concurrent: 2,
            max_queue_size: 3,
            max_metrics_history: 16,
        })
        .unwrap();
        let fanout = FanOut::new(
            queue,
            WorkloadConfig {
                tasks: 20,
                latency_window: 4,
                failure_every: 5,
                base_latency_ms: 2,
            },
        );

        let report = fanout.run().await.unwrap();
        assert_eq!(report.submitted, 20);
        assert_eq!(report.succeeded, 16);
        assert_eq!(report.failed, 4);
        assert!(report.pushbacks > 0);
        assert_eq!(report.recent_latency.samples, 4);
        assert_eq!(report.recent_failures.len(), 4);
        assert_eq!(report.queue.counters.reject_count, report.pushbacks);
        assert_eq!(report.queue.active_count, 0);
    }

    #[test]
    fn summary_of_empty_window_is_zero() {
        let ring = RingBuffer::new(2).unwrap();
        let summary = summarize(&ring);
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.mean_ms, 0.0);
        assert_eq!(summary.max_ms, 0.0);
    }
}
