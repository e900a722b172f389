//! Core types for Poolclaw: workers, tasks, and their statuses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Worker identifier
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Stable, zero-padded id for the worker in slot `index`.
    pub fn for_slot(index: usize) -> Self {
        Self(format!("worker-{:02}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Task identifier
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn generate() -> Self {
        Self(format!("task-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! id_conversions {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

id_conversions!(WorkerId);
id_conversions!(TaskId);

/// The three per-worker identifiers that keep concurrently active workers
/// from observing each other's state. Minted once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationIds {
    pub execution_context_id: String,
    pub tool_session_id: String,
    pub memory_handle_id: String,
}

impl IsolationIds {
    pub fn as_array(&self) -> [&str; 3] {
        [
            &self.execution_context_id,
            &self.tool_session_id,
            &self.memory_handle_id,
        ]
    }

    /// Identifiers of `self` that also appear anywhere in `other`.
    pub fn shared_with(&self, other: &IsolationIds) -> Vec<String> {
        let theirs = other.as_array();
        self.as_array()
            .into_iter()
            .filter(|id| theirs.contains(id))
            .map(String::from)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Categories and dependencies
// ---------------------------------------------------------------------------

/// External service a task category needs in order to run.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    GraphStore,
    LlmProvider,
    ExternalApi,
}

impl Dependency {
    pub const ALL: [Dependency; 3] = [
        Dependency::GraphStore,
        Dependency::LlmProvider,
        Dependency::ExternalApi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dependency::GraphStore => "graph_store",
            Dependency::LlmProvider => "llm_provider",
            Dependency::ExternalApi => "external_api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

/// Routing class of a task. Unknown names fall back to `General`.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskCategory {
    KnowledgeGraph,
    LlmGeneration,
    ExternalApi,
    SelfContained,
    #[default]
    General,
}

impl TaskCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::KnowledgeGraph => "knowledge_graph",
            TaskCategory::LlmGeneration => "llm_generation",
            TaskCategory::ExternalApi => "external_api",
            TaskCategory::SelfContained => "self_contained",
            TaskCategory::General => "general",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "knowledge_graph" => TaskCategory::KnowledgeGraph,
            "llm_generation" => TaskCategory::LlmGeneration,
            "external_api" => TaskCategory::ExternalApi,
            "self_contained" => TaskCategory::SelfContained,
            _ => TaskCategory::General,
        }
    }

    pub fn required_dependency(self) -> Option<Dependency> {
        match self {
            TaskCategory::KnowledgeGraph => Some(Dependency::GraphStore),
            TaskCategory::LlmGeneration => Some(Dependency::LlmProvider),
            TaskCategory::ExternalApi => Some(Dependency::ExternalApi),
            TaskCategory::SelfContained | TaskCategory::General => None,
        }
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TaskCategory {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<TaskCategory> for String {
    fn from(c: TaskCategory) -> Self {
        c.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Idle,
    /// Assigned, preparing.
    Analyzing,
    /// Actively processing.
    Executing,
    Degraded,
}

impl WorkerStatus {
    /// Holding a task.
    pub fn is_busy(self) -> bool {
        matches!(self, WorkerStatus::Analyzing | WorkerStatus::Executing)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkerPerformance {
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Running mean, milliseconds from assignment to completion.
    pub average_task_duration_ms: f64,
    pub context_switch_count: u64,
    /// Successful completions per category; drives assignment affinity.
    pub category_successes: BTreeMap<TaskCategory, u64>,
}

impl WorkerPerformance {
    pub fn affinity(&self, category: TaskCategory) -> u64 {
        self.category_successes.get(&category).copied().unwrap_or(0)
    }

    pub fn record_duration(&mut self, duration_ms: f64) {
        let finished = (self.tasks_completed + self.tasks_failed) as f64;
        if finished <= 1.0 {
            self.average_task_duration_ms = duration_ms;
        } else {
            self.average_task_duration_ms += (duration_ms - self.average_task_duration_ms) / finished;
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerHealth {
    /// Fraction in [0, 1].
    pub memory_usage: f64,
    /// Fraction in [0, 1].
    pub cpu_usage: f64,
}

impl WorkerHealth {
    pub fn new(memory_usage: f64, cpu_usage: f64) -> Self {
        Self {
            memory_usage: clamp_unit(memory_usage),
            cpu_usage: clamp_unit(cpu_usage),
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: WorkerId,
    #[serde(flatten)]
    pub isolation: IsolationIds,
    pub status: WorkerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task_id: Option<TaskId>,
    pub performance: WorkerPerformance,
    pub health: WorkerHealth,
    /// When the worker last became IDLE.
    pub idle_since: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_category: Option<TaskCategory>,
}

impl Worker {
    pub fn new(worker_id: WorkerId, isolation: IsolationIds) -> Self {
        Self {
            worker_id,
            isolation,
            status: WorkerStatus::Idle,
            current_task_id: None,
            performance: WorkerPerformance::default(),
            health: WorkerHealth::default(),
            idle_since: Utc::now(),
            assigned_at: None,
            last_category: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_category: TaskCategory,
    /// Opaque to the pool.
    pub payload: serde_json::Value,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_worker_id: Option<WorkerId>,
    pub attempt_count: u32,
    pub failed_worker_ids: BTreeSet<WorkerId>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Milliseconds from `created_at` to first assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Task {
    pub fn new(task_category: TaskCategory, payload: serde_json::Value) -> Self {
        Self {
            task_id: TaskId::generate(),
            task_category,
            payload,
            status: TaskStatus::Pending,
            assigned_worker_id: None,
            attempt_count: 0,
            failed_worker_ids: BTreeSet::new(),
            created_at: Utc::now(),
            first_started_at: None,
            completed_at: None,
            assignment_latency_ms: None,
            last_error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Two non-idle workers sharing an isolation identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IsolationViolation {
    pub worker_a: WorkerId,
    pub worker_b: WorkerId,
    pub shared_identifiers: Vec<String>,
    pub note: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub queue_depth: usize,
    pub max_queue_depth: usize,
    pub pool_size: usize,
    pub degraded_workers: usize,
    /// `count(non-IDLE workers) / pool_size`; 0 for an empty pool.
    pub utilization: f64,
    /// Tasks held in the registry: open ones plus retained terminal ones.
    pub tracked_tasks: usize,
    pub mean_assignment_latency_ms: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub cancelled_tasks: usize,
    pub workers_destroyed: usize,
}
