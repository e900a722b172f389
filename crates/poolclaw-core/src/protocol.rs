//! Pool RPC protocol — JSON-RPC style, transport agnostic
//!
//! Wire format:
//!
//! Client → Server:
//!   { "id": "req-1", "method": "task.submit", "params": { "category": "llm_generation", "payload": {...} } }
//!
//! Server → Client:
//!   { "id": "req-1", "result": { "task_id": "task-...", "status": "IN_PROGRESS", ... } }
//!   { "id": "req-1", "error": { "code": -32010, "message": "queue full: 64 tasks queued or in progress" } }

use crate::error::Error;
use crate::types::{Dependency, TaskCategory, TaskId, WorkerId};
use serde::{Deserialize, Serialize};

pub const CODE_AUTH: i32 = -32000;
pub const CODE_NOT_FOUND: i32 = -32001;
pub const CODE_QUEUE_FULL: i32 = -32010;
pub const CODE_INVALID_POOL_SIZE: i32 = -32011;
pub const CODE_NOT_INITIALIZED: i32 = -32012;
pub const CODE_INVALID_TRANSITION: i32 = -32013;
pub const CODE_METHOD_NOT_FOUND: i32 = -32601;
pub const CODE_INVALID_PARAMS: i32 = -32602;
pub const CODE_INTERNAL: i32 = -32603;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// RPC request from client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// RPC response to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// RPC error detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl From<&Error> for RpcError {
    fn from(e: &Error) -> Self {
        let code = match e {
            Error::TaskNotFound(_) | Error::WorkerNotFound(_) => CODE_NOT_FOUND,
            Error::QueueFull { .. } => CODE_QUEUE_FULL,
            Error::InvalidPoolSize { .. } => CODE_INVALID_POOL_SIZE,
            Error::NotInitialized => CODE_NOT_INITIALIZED,
            Error::InvalidTransition { .. } => CODE_INVALID_TRANSITION,
            Error::Json(_) => CODE_INVALID_PARAMS,
            Error::AuthFailed(_) => CODE_AUTH,
            Error::IsolationViolation(_)
            | Error::RuntimeStopped
            | Error::Config(_)
            | Error::Io(_) => CODE_INTERNAL,
        };
        Self {
            code,
            message: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Method params
// ---------------------------------------------------------------------------

/// `pool.initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    pub size: usize,
}

/// `task.submit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitParams {
    #[serde(default)]
    pub category: TaskCategory,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `task.get`, `task.cancel`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskParams {
    pub task_id: TaskId,
}

/// `task.complete`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteParams {
    pub task_id: TaskId,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `worker.fail`, `worker.restore`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerParams {
    pub worker_id: WorkerId,
}

/// `worker.health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthParams {
    pub worker_id: WorkerId,
    pub memory_usage: f64,
    pub cpu_usage: f64,
}

/// `dependency.set`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyParams {
    pub dependency: Dependency,
    pub available: bool,
}
