//! CoordinationPool — the scheduler core
//!
//! Owns the worker set, the task registry and the queue. Every method is
//! synchronous and runs to completion, so whoever owns the pool (normally the
//! runtime actor) serializes all state changes through it.
//!
//! Assignment only happens in reaction to an event (submit, completion,
//! worker failure, restore); there is no timer. Each event re-scans the queue
//! head-first, so retried tasks and older submissions get idle workers before
//! newer ones, and a category that was degraded is picked up on the next
//! event after its dependency recovers.

use crate::audit::AuditLog;
use crate::degradation::{AllowAll, DegradationPolicy, HealthThresholds};
use crate::isolation::{isolation_report, IsolationGuard};
use crate::machine::{next_task_status, next_worker_status, TaskEvent, WorkerEvent};
use crate::metrics::PoolCounters;
use crate::queue::TaskQueue;
use chrono::{DateTime, Utc};
use poolclaw_core::{
    Error, IsolationViolation, PoolLimits, PoolMetrics, Result, ShutdownReport, Task,
    TaskCategory, TaskId, TaskStatus, Worker, WorkerHealth, WorkerId, WorkerStatus,
    MAX_POOL_SIZE,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A task handed to a worker, ready to be executed off the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct Dispatch {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub category: TaskCategory,
    pub payload: serde_json::Value,
    /// 1-based attempt number.
    pub attempt: u32,
}

pub struct CoordinationPool {
    limits: PoolLimits,
    thresholds: HealthThresholds,
    workers: Vec<Worker>,
    tasks: HashMap<TaskId, Task>,
    /// Terminal tasks in retirement order, oldest first.
    retired: VecDeque<TaskId>,
    queue: TaskQueue,
    guard: IsolationGuard,
    policy: Arc<dyn DegradationPolicy>,
    audit: AuditLog,
    counters: PoolCounters,
    outbox: Vec<Dispatch>,
    initialized: bool,
}

fn millis_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start)
        .num_microseconds()
        .map(|us| us as f64 / 1000.0)
        .unwrap_or(0.0)
        .max(0.0)
}

/// Higher category affinity first, then longest idle, then lowest id.
fn rank(a: &Worker, b: &Worker, category: TaskCategory) -> Ordering {
    b.performance
        .affinity(category)
        .cmp(&a.performance.affinity(category))
        .then_with(|| a.idle_since.cmp(&b.idle_since))
        .then_with(|| a.worker_id.cmp(&b.worker_id))
}

impl CoordinationPool {
    pub fn new(limits: PoolLimits) -> Self {
        Self {
            limits,
            thresholds: HealthThresholds::default(),
            workers: Vec::new(),
            tasks: HashMap::new(),
            retired: VecDeque::new(),
            queue: TaskQueue::new(limits.max_queue_depth),
            guard: IsolationGuard::new(),
            policy: Arc::new(AllowAll),
            audit: AuditLog::disabled(),
            counters: PoolCounters::default(),
            outbox: Vec::new(),
            initialized: false,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn DegradationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_health_thresholds(mut self, thresholds: HealthThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create `size` workers with fresh, pairwise-disjoint isolation ids.
    /// On an already-initialized pool the worker set is replaced and every
    /// open task is cancelled.
    pub fn initialize(&mut self, size: usize) -> Result<Vec<Worker>> {
        if size == 0 || size > MAX_POOL_SIZE {
            return Err(Error::InvalidPoolSize {
                size,
                max: MAX_POOL_SIZE,
            });
        }
        let sets = self.guard.mint_set(size)?;

        if self.initialized {
            warn!(
                "Re-initializing pool with {} workers; dropping in-flight tasks",
                size
            );
            self.cancel_open_tasks("pool re-initialized");
        }

        self.workers = sets
            .into_iter()
            .enumerate()
            .map(|(i, ids)| Worker::new(WorkerId::for_slot(i), ids))
            .collect();
        for worker in &self.workers {
            self.audit.worker(worker, None, Some("created"));
        }
        self.queue = TaskQueue::new(self.limits.max_queue_depth);
        self.outbox.clear();
        self.initialized = true;

        info!("Pool initialized with {} workers", size);
        Ok(self.workers.clone())
    }

    /// Cancel all open work and destroy every worker. A new `initialize`
    /// is required afterwards.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let cancelled_tasks = self.cancel_open_tasks("pool shutdown");
        let workers_destroyed = self.workers.len();
        for worker in &self.workers {
            self.audit.worker(worker, Some(worker.status), Some("destroyed"));
        }
        self.workers.clear();
        self.initialized = false;

        info!(
            "Pool shut down: {} tasks cancelled, {} workers destroyed",
            cancelled_tasks, workers_destroyed
        );
        ShutdownReport {
            cancelled_tasks,
            workers_destroyed,
        }
    }

    fn cancel_open_tasks(&mut self, note: &str) -> usize {
        let open: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .map(|t| t.task_id.clone())
            .collect();
        let now = Utc::now();

        for task_id in &open {
            if let Some(task) = self.tasks.get_mut(task_id) {
                let from = task.status;
                if let Ok(to) = next_task_status(from, TaskEvent::Cancel) {
                    task.status = to;
                    task.completed_at = Some(now);
                    self.audit.task(task, Some(from), Some(note));
                    self.counters.record_terminal(to);
                }
            }
            self.retire(task_id);
        }
        self.queue.drain();
        self.outbox.clear();
        open.len()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    // ------------------------------------------------------------------
    // Admission and assignment
    // ------------------------------------------------------------------

    /// Admit a task, then try to hand it (and anything queued ahead of it)
    /// to an idle worker. Rejected submissions leave no trace.
    pub fn submit(&mut self, category: TaskCategory, payload: serde_json::Value) -> Result<Task> {
        self.ensure_initialized()?;

        let depth = self.queue.len() + self.in_progress_count();
        if depth >= self.limits.max_queue_depth {
            warn!("Rejecting {} task: queue full ({} tasks)", category, depth);
            return Err(Error::QueueFull { depth });
        }

        let task = Task::new(category, payload);
        let task_id = task.task_id.clone();
        self.queue.push_back(task_id.clone())?;
        self.audit.task(&task, None, Some("submitted"));
        self.tasks.insert(task_id.clone(), task);

        self.dispatch_queued();
        self.task(&task_id).cloned()
    }

    fn in_progress_count(&self) -> usize {
        self.workers.iter().filter(|w| w.status.is_busy()).count()
    }

    fn has_idle_worker(&self) -> bool {
        self.workers.iter().any(|w| w.status == WorkerStatus::Idle)
    }

    /// Walk the queue head-first, assigning every task that has an eligible
    /// idle worker. Stops early once no worker is idle.
    fn dispatch_queued(&mut self) -> usize {
        let mut assigned = 0;
        for task_id in self.queue.snapshot() {
            if !self.has_idle_worker() {
                break;
            }
            if self.try_assign(&task_id) {
                self.queue.remove(&task_id);
                assigned += 1;
            }
        }
        if assigned > 0 {
            debug!(
                "Queue scan assigned {} tasks, {} still queued",
                assigned,
                self.queue.len()
            );
        }
        assigned
    }

    fn try_assign(&mut self, task_id: &TaskId) -> bool {
        let (category, excluded) = match self.tasks.get(task_id) {
            Some(t) if t.status == TaskStatus::Pending => {
                (t.task_category, t.failed_worker_ids.clone())
            }
            _ => return false,
        };

        if !self.policy.allows(category) {
            debug!("Category {} is degraded; task {} stays queued", category, task_id);
            return false;
        }

        let chosen = self
            .workers
            .iter()
            .enumerate()
            .filter(|(_, w)| w.status == WorkerStatus::Idle && !excluded.contains(&w.worker_id))
            .min_by(|(_, a), (_, b)| rank(a, b, category))
            .map(|(i, _)| i);
        let Some(idx) = chosen else {
            return false;
        };

        let worker_from = self.workers[idx].status;
        let (worker_to, task_to) = match (
            next_worker_status(worker_from, WorkerEvent::Assign),
            next_task_status(TaskStatus::Pending, TaskEvent::Assign),
        ) {
            (Ok(w), Ok(t)) => (w, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Cannot assign task {}: {}", task_id, e);
                return false;
            }
        };

        let now = Utc::now();
        let worker = &mut self.workers[idx];
        if matches!(worker.last_category, Some(prev) if prev != category) {
            worker.performance.context_switch_count += 1;
        }
        worker.status = worker_to;
        worker.last_category = Some(category);
        worker.current_task_id = Some(task_id.clone());
        worker.assigned_at = Some(now);
        let worker_id = worker.worker_id.clone();
        self.audit.worker(worker, Some(worker_from), Some(task_id.as_str()));

        let Some(task) = self.tasks.get_mut(task_id) else {
            return false;
        };
        task.status = task_to;
        task.assigned_worker_id = Some(worker_id.clone());
        if task.first_started_at.is_none() {
            let latency = millis_between(task.created_at, now);
            task.first_started_at = Some(now);
            task.assignment_latency_ms = Some(latency);
            self.counters.record_assignment_latency(latency);
        }
        self.audit.task(task, Some(TaskStatus::Pending), None);

        let attempt = task.attempt_count + 1;
        info!(
            "Assigned task {} ({}) to {} [attempt {}]",
            task_id, category, worker_id, attempt
        );
        self.outbox.push(Dispatch {
            task_id: task_id.clone(),
            worker_id,
            category,
            payload: task.payload.clone(),
            attempt,
        });
        true
    }

    /// Dispatches produced since the last call. The owner must run each one.
    pub fn take_dispatches(&mut self) -> Vec<Dispatch> {
        std::mem::take(&mut self.outbox)
    }

    // ------------------------------------------------------------------
    // Completion and failure
    // ------------------------------------------------------------------

    /// ANALYZING → EXECUTING, reported when the payload actually starts.
    pub fn begin_execution(&mut self, worker_id: &WorkerId) -> Result<()> {
        let idx = self.worker_index(worker_id)?;
        let from = self.workers[idx].status;
        let to = next_worker_status(from, WorkerEvent::BeginExecution)?;
        self.workers[idx].status = to;
        self.audit.worker(&self.workers[idx], Some(from), None);
        Ok(())
    }

    /// A worker finished its task. Failures go through retry-with-exclusion.
    pub fn complete(&mut self, task_id: &TaskId, success: bool) -> Result<Task> {
        if success {
            self.complete_success(task_id)
        } else {
            self.complete_with_error(task_id, "execution failed")
        }
    }

    pub fn complete_with_error(&mut self, task_id: &TaskId, error: impl Into<String>) -> Result<Task> {
        let worker_id = self.holder_of(task_id, TaskEvent::Retry)?;
        let snapshot = self.handle_failure(task_id, &worker_id, WorkerEvent::Release, error.into())?;
        self.dispatch_queued();
        Ok(self.tasks.get(task_id).cloned().unwrap_or(snapshot))
    }

    fn complete_success(&mut self, task_id: &TaskId) -> Result<Task> {
        let worker_id = self.holder_of(task_id, TaskEvent::Succeed)?;
        let idx = self.worker_index(&worker_id)?;
        let worker_from = self.workers[idx].status;
        let worker_to = next_worker_status(worker_from, WorkerEvent::Release)?;
        let now = Utc::now();

        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let task_from = task.status;
        task.status = next_task_status(task_from, TaskEvent::Succeed)?;
        task.completed_at = Some(now);
        self.audit.task(task, Some(task_from), None);
        self.counters.record_terminal(task.status);
        let category = task.task_category;
        let snapshot = task.clone();

        let worker = &mut self.workers[idx];
        worker.status = worker_to;
        worker.current_task_id = None;
        worker.idle_since = now;
        worker.performance.tasks_completed += 1;
        *worker
            .performance
            .category_successes
            .entry(category)
            .or_insert(0) += 1;
        if let Some(assigned_at) = worker.assigned_at.take() {
            worker.performance.record_duration(millis_between(assigned_at, now));
        }
        self.audit.worker(worker, Some(worker_from), Some("released"));

        info!("Task {} completed by {}", task_id, worker_id);
        self.retire(task_id);
        self.dispatch_queued();
        Ok(snapshot)
    }

    /// The worker currently running `task_id`, or an error if the task is
    /// not in progress.
    fn holder_of(&self, task_id: &TaskId, event: TaskEvent) -> Result<WorkerId> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        match (task.status, &task.assigned_worker_id) {
            (TaskStatus::InProgress, Some(worker_id)) => Ok(worker_id.clone()),
            (status, _) => Err(Error::invalid_transition("task", status, event)),
        }
    }

    /// True iff `task_id` is in progress on `worker_id`. Used to drop
    /// completions that arrive after the task was reassigned or cancelled.
    pub fn is_assigned(&self, task_id: &TaskId, worker_id: &WorkerId) -> bool {
        self.tasks.get(task_id).is_some_and(|t| {
            t.status == TaskStatus::InProgress && t.assigned_worker_id.as_ref() == Some(worker_id)
        })
    }

    /// Record a failed attempt: exclude the worker, bump the attempt count,
    /// then either put the task back at the queue head or fail it for good.
    fn handle_failure(
        &mut self,
        task_id: &TaskId,
        worker_id: &WorkerId,
        worker_event: WorkerEvent,
        reason: String,
    ) -> Result<Task> {
        let idx = self.worker_index(worker_id)?;
        let worker_from = self.workers[idx].status;
        let worker_to = next_worker_status(worker_from, worker_event)?;
        let pool_ids: Vec<WorkerId> = self.workers.iter().map(|w| w.worker_id.clone()).collect();
        let max_retries = self.limits.max_retries;
        let now = Utc::now();

        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let task_from = task.status;
        let attempts = task.attempt_count + 1;
        let mut excluded = task.failed_worker_ids.clone();
        excluded.insert(worker_id.clone());
        let no_candidates = pool_ids.iter().all(|w| excluded.contains(w));
        let event = if attempts >= max_retries || no_candidates {
            TaskEvent::Exhaust
        } else {
            TaskEvent::Retry
        };
        let task_to = next_task_status(task_from, event)?;

        task.status = task_to;
        task.attempt_count = attempts;
        task.failed_worker_ids = excluded;
        task.last_error = Some(reason.clone());
        let note = format!("{} failed: {}", worker_id, reason);
        if event == TaskEvent::Retry {
            task.assigned_worker_id = None;
        } else {
            task.completed_at = Some(now);
            self.counters.record_terminal(task_to);
        }
        self.audit.task(task, Some(task_from), Some(&note));
        let snapshot = task.clone();

        let worker = &mut self.workers[idx];
        worker.status = worker_to;
        worker.current_task_id = None;
        worker.performance.tasks_failed += 1;
        if let Some(assigned_at) = worker.assigned_at.take() {
            worker.performance.record_duration(millis_between(assigned_at, now));
        }
        if worker_to == WorkerStatus::Idle {
            worker.idle_since = now;
        }
        self.audit.worker(worker, Some(worker_from), Some(&note));

        if event == TaskEvent::Retry {
            info!(
                "Task {} failed on {} (attempt {}/{}), retrying: {}",
                task_id, worker_id, attempts, max_retries, reason
            );
            self.queue.push_front(task_id.clone())?;
        } else {
            warn!(
                "Task {} FAILED after {} attempts (last on {}): {}",
                task_id, attempts, worker_id, reason
            );
            self.retire(task_id);
        }
        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Worker health
    // ------------------------------------------------------------------

    /// External failure signal: the worker goes DEGRADED and its current
    /// task, if any, counts as a failed attempt.
    pub fn fail_worker(&mut self, worker_id: &WorkerId) -> Result<Worker> {
        self.degrade(worker_id, "worker failed health probe")
    }

    fn degrade(&mut self, worker_id: &WorkerId, reason: &str) -> Result<Worker> {
        let idx = self.worker_index(worker_id)?;
        let from = self.workers[idx].status;

        match self.workers[idx].current_task_id.clone() {
            Some(task_id) if from.is_busy() => {
                self.handle_failure(&task_id, worker_id, WorkerEvent::Degrade, reason.to_string())?;
            }
            _ => {
                let to = next_worker_status(from, WorkerEvent::Degrade)?;
                self.workers[idx].status = to;
                self.audit.worker(&self.workers[idx], Some(from), Some(reason));
            }
        }
        warn!("Worker {} DEGRADED (was {:?}): {}", worker_id, from, reason);

        self.dispatch_queued();
        Ok(self.workers[idx].clone())
    }

    /// DEGRADED → IDLE. The worker becomes a candidate again immediately.
    pub fn restore_worker(&mut self, worker_id: &WorkerId) -> Result<Worker> {
        let idx = self.worker_index(worker_id)?;
        let from = self.workers[idx].status;
        let to = next_worker_status(from, WorkerEvent::Restore)?;

        let worker = &mut self.workers[idx];
        worker.status = to;
        worker.idle_since = Utc::now();
        worker.health = WorkerHealth::default();
        self.audit.worker(worker, Some(from), Some("restored"));
        info!("Worker {} restored to IDLE", worker_id);

        self.dispatch_queued();
        Ok(self.workers[idx].clone())
    }

    /// Record a health sample; crossing a threshold degrades the worker.
    pub fn report_health(
        &mut self,
        worker_id: &WorkerId,
        memory_usage: f64,
        cpu_usage: f64,
    ) -> Result<Worker> {
        let idx = self.worker_index(worker_id)?;
        let health = WorkerHealth::new(memory_usage, cpu_usage);
        self.workers[idx].health = health;

        if self.thresholds.crossed(&health) && self.workers[idx].status != WorkerStatus::Degraded {
            let reason = format!(
                "health threshold crossed (memory {:.2}, cpu {:.2})",
                health.memory_usage, health.cpu_usage
            );
            return self.degrade(worker_id, &reason);
        }
        Ok(self.workers[idx].clone())
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    /// Cancel a queued task. Tasks already running cannot be cancelled.
    pub fn cancel_task(&mut self, task_id: &TaskId) -> Result<Task> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let from = task.status;
        if from != TaskStatus::Pending {
            return Err(Error::invalid_transition("task", from, TaskEvent::Cancel));
        }
        task.status = next_task_status(from, TaskEvent::Cancel)?;
        task.completed_at = Some(Utc::now());
        self.audit.task(task, Some(from), Some("cancelled"));
        self.counters.record_terminal(task.status);
        let snapshot = task.clone();

        self.queue.remove(task_id);
        self.retire(task_id);
        info!("Task {} cancelled", task_id);
        Ok(snapshot)
    }

    fn retire(&mut self, task_id: &TaskId) {
        self.retired.push_back(task_id.clone());
        while self.retired.len() > self.limits.task_retention {
            if let Some(oldest) = self.retired.pop_front() {
                self.tasks.remove(&oldest);
            }
        }
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn task(&self, task_id: &TaskId) -> Result<&Task> {
        self.tasks
            .get(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    fn worker_index(&self, worker_id: &WorkerId) -> Result<usize> {
        self.workers
            .iter()
            .position(|w| &w.worker_id == worker_id)
            .ok_or_else(|| Error::WorkerNotFound(worker_id.to_string()))
    }

    pub fn worker(&self, worker_id: &WorkerId) -> Result<&Worker> {
        let idx = self.worker_index(worker_id)?;
        Ok(&self.workers[idx])
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    pub fn queued(&self) -> Vec<TaskId> {
        self.queue.snapshot()
    }

    pub fn pool_size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.counters.snapshot(
            &self.workers,
            self.queue.len(),
            self.limits.max_queue_depth,
            self.tasks.len(),
        )
    }

    pub fn isolation_report(&self) -> Vec<IsolationViolation> {
        isolation_report(&self.workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool(size: usize) -> CoordinationPool {
        let mut pool = CoordinationPool::new(PoolLimits::default());
        pool.initialize(size).unwrap();
        pool
    }

    #[test]
    fn rank_prefers_affinity_then_longest_idle() {
        let mut p = pool(3);
        let now = Utc::now();
        p.workers[0].idle_since = now;
        p.workers[1].idle_since = now - chrono::Duration::seconds(10);
        p.workers[2].idle_since = now - chrono::Duration::seconds(5);

        let by_idle = p
            .workers
            .iter()
            .min_by(|a, b| rank(a, b, TaskCategory::General))
            .unwrap();
        assert_eq!(by_idle.worker_id, WorkerId::for_slot(1));

        p.workers[0]
            .performance
            .category_successes
            .insert(TaskCategory::KnowledgeGraph, 2);
        let by_affinity = p
            .workers
            .iter()
            .min_by(|a, b| rank(a, b, TaskCategory::KnowledgeGraph))
            .unwrap();
        assert_eq!(by_affinity.worker_id, WorkerId::for_slot(0));
    }

    #[test]
    fn rank_ties_break_on_worker_id() {
        let mut p = pool(2);
        let now = Utc::now();
        p.workers[0].idle_since = now;
        p.workers[1].idle_since = now;
        assert_eq!(
            rank(&p.workers[0], &p.workers[1], TaskCategory::General),
            Ordering::Less
        );
    }

    #[test]
    fn context_switch_counted_on_category_change() {
        let mut p = pool(1);
        let t1 = p.submit(TaskCategory::SelfContained, json!(1)).unwrap();
        p.complete(&t1.task_id, true).unwrap();
        let t2 = p.submit(TaskCategory::SelfContained, json!(2)).unwrap();
        p.complete(&t2.task_id, true).unwrap();
        assert_eq!(p.workers[0].performance.context_switch_count, 0);

        let t3 = p.submit(TaskCategory::LlmGeneration, json!(3)).unwrap();
        p.complete(&t3.task_id, true).unwrap();
        assert_eq!(p.workers[0].performance.context_switch_count, 1);
        assert_eq!(p.workers[0].performance.tasks_completed, 3);
        assert_eq!(
            p.workers[0].performance.affinity(TaskCategory::SelfContained),
            2
        );
    }

    #[test]
    fn dispatches_are_drained_once() {
        let mut p = pool(2);
        let t = p.submit(TaskCategory::General, json!({"n": 1})).unwrap();
        let dispatches = p.take_dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].task_id, t.task_id);
        assert_eq!(dispatches[0].attempt, 1);
        assert_eq!(dispatches[0].payload, json!({"n": 1}));
        assert!(p.take_dispatches().is_empty());
    }

    #[test]
    fn begin_execution_requires_analyzing() {
        let mut p = pool(1);
        p.submit(TaskCategory::General, json!(null)).unwrap();
        let w = WorkerId::for_slot(0);
        p.begin_execution(&w).unwrap();
        assert_eq!(p.workers[0].status, WorkerStatus::Executing);
        assert!(p.begin_execution(&w).is_err());
    }

    #[test]
    fn retention_evicts_oldest_terminal_tasks() {
        let mut p = CoordinationPool::new(PoolLimits {
            task_retention: 2,
            ..PoolLimits::default()
        });
        p.initialize(1).unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            let t = p.submit(TaskCategory::General, json!(i)).unwrap();
            p.complete(&t.task_id, true).unwrap();
            ids.push(t.task_id);
        }
        assert!(p.task(&ids[0]).is_err());
        assert!(p.task(&ids[1]).is_ok());
        assert!(p.task(&ids[2]).is_ok());
        assert_eq!(p.metrics().completed, 3);
    }
}
