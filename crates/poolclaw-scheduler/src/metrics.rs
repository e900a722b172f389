//! Cumulative pool counters
//!
//! Terminal counts and latency are accumulated as events happen rather than
//! recomputed from the task registry, so evicting old terminal tasks does not
//! change what `metrics()` reports.

use poolclaw_core::{PoolMetrics, TaskStatus, Worker, WorkerStatus};

#[derive(Debug, Default, Clone)]
pub struct PoolCounters {
    completed: usize,
    failed: usize,
    cancelled: usize,
    latency_total_ms: f64,
    latency_samples: usize,
}

impl PoolCounters {
    pub fn record_assignment_latency(&mut self, latency_ms: f64) {
        self.latency_total_ms += latency_ms;
        self.latency_samples += 1;
    }

    pub fn record_terminal(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
            TaskStatus::Pending | TaskStatus::InProgress => {}
        }
    }

    pub fn mean_assignment_latency_ms(&self) -> Option<f64> {
        if self.latency_samples == 0 {
            None
        } else {
            Some(self.latency_total_ms / self.latency_samples as f64)
        }
    }

    /// Every PENDING task sits in the queue and every IN_PROGRESS task is
    /// held by exactly one busy worker, so live counts come from those.
    /// `tracked_tasks` is the registry size, open plus retained terminal.
    pub fn snapshot(
        &self,
        workers: &[Worker],
        queue_depth: usize,
        max_queue_depth: usize,
        tracked_tasks: usize,
    ) -> PoolMetrics {
        let pool_size = workers.len();
        let in_progress = workers.iter().filter(|w| w.status.is_busy()).count();
        let non_idle = workers
            .iter()
            .filter(|w| w.status != WorkerStatus::Idle)
            .count();
        let degraded_workers = workers
            .iter()
            .filter(|w| w.status == WorkerStatus::Degraded)
            .count();
        let utilization = if pool_size == 0 {
            0.0
        } else {
            non_idle as f64 / pool_size as f64
        };

        PoolMetrics {
            pending: queue_depth,
            in_progress,
            completed: self.completed,
            failed: self.failed,
            cancelled: self.cancelled,
            queue_depth,
            max_queue_depth,
            pool_size,
            degraded_workers,
            utilization,
            tracked_tasks,
            mean_assignment_latency_ms: self.mean_assignment_latency_ms(),
        }
    }
}
