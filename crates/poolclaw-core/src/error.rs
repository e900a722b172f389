//! Error types for Poolclaw

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("queue full: {depth} tasks queued or in progress")]
    QueueFull { depth: usize },

    #[error("invalid pool size {size}: must be between 1 and {max}")]
    InvalidPoolSize { size: usize, max: usize },

    #[error("pool not initialized")]
    NotInitialized,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("invalid transition: {entity} cannot handle {event} while {from}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: String,
    },

    #[error("isolation violation: {0}")]
    IsolationViolation(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("pool runtime stopped")]
    RuntimeStopped,

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Debug,
        event: impl std::fmt::Debug,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: format!("{:?}", from),
            event: format!("{:?}", event),
        }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthFailed(msg.into())
    }

    /// Rejected before any state mutation; the caller may back off and retry.
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Error::QueueFull { .. } | Error::InvalidPoolSize { .. } | Error::NotInitialized
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::TaskNotFound(_) | Error::WorkerNotFound(_))
    }
}
