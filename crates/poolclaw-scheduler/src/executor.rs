//! Task executors — where a dispatched payload actually runs

use crate::pool::Dispatch;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success,
    Failure(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

/// Runs one dispatched task. Implementations must not touch pool state;
/// the outcome is reported back to the scheduler by the runtime.
#[async_trait::async_trait]
pub trait TaskExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, dispatch: &Dispatch) -> ExecutionOutcome;
}

/// Succeeds immediately. Useful when tasks are completed out of band.
pub struct NoopExecutor;

#[async_trait::async_trait]
impl TaskExecutor for NoopExecutor {
    fn name(&self) -> &str { "noop" }

    async fn execute(&self, dispatch: &Dispatch) -> ExecutionOutcome {
        debug!("noop executor: {} on {}", dispatch.task_id, dispatch.worker_id);
        ExecutionOutcome::Success
    }
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    task_id: &'a str,
    worker_id: &'a str,
    category: &'a str,
    attempt: u32,
    payload: &'a serde_json::Value,
}

/// POSTs each task to an HTTP endpoint. Any 2xx response is a success;
/// other statuses, transport errors and timeouts are failures.
pub struct WebhookExecutor {
    client: Client,
    url: String,
    timeout: Duration,
}

impl WebhookExecutor {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl TaskExecutor for WebhookExecutor {
    fn name(&self) -> &str { "webhook" }

    async fn execute(&self, dispatch: &Dispatch) -> ExecutionOutcome {
        let body = WebhookBody {
            task_id: dispatch.task_id.as_str(),
            worker_id: dispatch.worker_id.as_str(),
            category: dispatch.category.as_str(),
            attempt: dispatch.attempt,
            payload: &dispatch.payload,
        };

        debug!("POST {} for task {}", self.url, dispatch.task_id);
        let response = match self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return ExecutionOutcome::Failure(format!("timed out after {:?}", self.timeout));
            }
            Err(e) => return ExecutionOutcome::Failure(format!("request failed: {}", e)),
        };

        let status = response.status();
        if status.is_success() {
            ExecutionOutcome::Success
        } else {
            let text = response.text().await.unwrap_or_default();
            error!("Webhook error {} for task {}: {}", status, dispatch.task_id, text);
            ExecutionOutcome::Failure(format!("{}: {}", status, text))
        }
    }
}
