//! Durable transition log — one JSON object per line
//!
//! Every task and worker transition is appended so metrics and audits can be
//! rebuilt after a restart. Write failures are logged and never block
//! scheduling.

use chrono::{DateTime, Utc};
use poolclaw_core::{Result, Task, TaskStatus, Worker, WorkerStatus};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEntity {
    Task,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: DateTime<Utc>,
    pub entity: AuditEntity,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn status_name<S: Serialize>(status: &S) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Log that records nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn task(&self, task: &Task, from: Option<TaskStatus>, note: Option<&str>) {
        self.append(&AuditRecord {
            ts: Utc::now(),
            entity: AuditEntity::Task,
            id: task.task_id.to_string(),
            from: from.map(|s| status_name(&s)),
            to: status_name(&task.status),
            worker_id: task.assigned_worker_id.as_ref().map(|w| w.to_string()),
            attempt: Some(task.attempt_count),
            note: note.map(String::from),
        });
    }

    pub fn worker(&self, worker: &Worker, from: Option<WorkerStatus>, note: Option<&str>) {
        self.append(&AuditRecord {
            ts: Utc::now(),
            entity: AuditEntity::Worker,
            id: worker.worker_id.to_string(),
            from: from.map(|s| status_name(&s)),
            to: status_name(&worker.status),
            worker_id: None,
            attempt: None,
            note: note.map(String::from),
        });
    }

    fn append(&self, record: &AuditRecord) {
        let Some(path) = &self.path else {
            return;
        };
        let line = match serde_json::to_string(record) {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to serialize audit record: {}", e);
                return;
            }
        };
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| writeln!(f, "{}", line));
        if let Err(e) = result {
            error!("Failed to append audit record to {}: {}", path.display(), e);
        }
    }
}

/// Read back every record in an audit file, skipping unparseable lines.
pub fn read_records(path: &Path) -> Result<Vec<AuditRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolclaw_core::{IsolationIds, TaskCategory, WorkerId};

    #[test]
    fn disabled_log_writes_nothing() {
        let log = AuditLog::disabled();
        let task = Task::new(TaskCategory::General, serde_json::Value::Null);
        log.task(&task, None, None);
        assert!(log.path().is_none());
    }

    #[test]
    fn records_append_as_jsonl() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("audit.jsonl");
        let log = AuditLog::to_file(&path);

        let mut task = Task::new(TaskCategory::LlmGeneration, serde_json::json!({"p": 1}));
        log.task(&task, None, Some("submitted"));
        task.status = TaskStatus::InProgress;
        log.task(&task, Some(TaskStatus::Pending), None);

        let worker = Worker::new(
            WorkerId::for_slot(0),
            IsolationIds {
                execution_context_id: "e".into(),
                tool_session_id: "t".into(),
                memory_handle_id: "m".into(),
            },
        );
        log.worker(&worker, None, Some("created"));

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].to, "PENDING");
        assert_eq!(records[0].note.as_deref(), Some("submitted"));
        assert_eq!(records[1].from.as_deref(), Some("PENDING"));
        assert_eq!(records[1].to, "IN_PROGRESS");
        assert_eq!(records[2].entity, AuditEntity::Worker);
        assert_eq!(records[2].id, "worker-00");
    }

    #[test]
    fn unwritable_path_does_not_panic() {
        let log = AuditLog::to_file("/nonexistent-dir/definitely/audit.jsonl");
        let task = Task::new(TaskCategory::General, serde_json::Value::Null);
        log.task(&task, None, None);
    }
}
