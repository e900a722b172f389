//! Pool runtime — one tokio task owns the CoordinationPool
//!
//! Every caller talks to the pool through a cloneable `PoolHandle`, which
//! sends a `Command` over an mpsc channel and awaits the reply on a oneshot.
//! The loop is the single consumer, so pool operations are applied strictly
//! one at a time in arrival order.
//!
//! After each command the loop drains new dispatches, marks each worker
//! EXECUTING and spawns the executor. Outcomes come back through the same
//! channel as `Finished` commands. Executions hold only a weak sender, so the
//! loop exits once every handle is dropped.

use crate::executor::{ExecutionOutcome, TaskExecutor};
use crate::pool::CoordinationPool;
use poolclaw_core::{
    Error, IsolationViolation, PoolMetrics, Result, ShutdownReport, Task, TaskCategory, TaskId,
    Worker, WorkerId,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    Initialize { size: usize, reply: Reply<Vec<Worker>> },
    Submit { category: TaskCategory, payload: serde_json::Value, reply: Reply<Task> },
    GetTask { task_id: TaskId, reply: Reply<Task> },
    CancelTask { task_id: TaskId, reply: Reply<Task> },
    Complete { task_id: TaskId, outcome: ExecutionOutcome, reply: Reply<Task> },
    FailWorker { worker_id: WorkerId, reply: Reply<Worker> },
    RestoreWorker { worker_id: WorkerId, reply: Reply<Worker> },
    ReportHealth { worker_id: WorkerId, memory_usage: f64, cpu_usage: f64, reply: Reply<Worker> },
    Workers { reply: Reply<Vec<Worker>> },
    Metrics { reply: Reply<PoolMetrics> },
    IsolationReport { reply: Reply<Vec<IsolationViolation>> },
    Shutdown { reply: Reply<ShutdownReport> },
    /// An executor finished. No reply; stale outcomes are dropped.
    Finished { task_id: TaskId, worker_id: WorkerId, outcome: ExecutionOutcome },
}

pub struct PoolRuntime {
    pool: CoordinationPool,
    executor: Arc<dyn TaskExecutor>,
    commands: mpsc::Receiver<Command>,
    self_tx: mpsc::WeakSender<Command>,
}

impl PoolRuntime {
    /// Start the loop on the current tokio runtime. The join handle resolves
    /// to the pool once every `PoolHandle` has been dropped.
    pub fn spawn(
        pool: CoordinationPool,
        executor: Arc<dyn TaskExecutor>,
    ) -> (PoolHandle, JoinHandle<CoordinationPool>) {
        let (tx, commands) = mpsc::channel(1024);
        let runtime = Self {
            pool,
            executor,
            commands,
            self_tx: tx.downgrade(),
        };
        let join = tokio::spawn(runtime.run());
        (PoolHandle { tx }, join)
    }

    async fn run(mut self) -> CoordinationPool {
        info!("Pool runtime started (executor: {})", self.executor.name());
        while let Some(command) = self.commands.recv().await {
            self.handle(command);
            self.launch_dispatches();
        }
        info!("Pool runtime stopped: all handles dropped");
        self.pool
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Initialize { size, reply } => {
                let _ = reply.send(self.pool.initialize(size));
            }
            Command::Submit { category, payload, reply } => {
                let _ = reply.send(self.pool.submit(category, payload));
            }
            Command::GetTask { task_id, reply } => {
                let _ = reply.send(self.pool.task(&task_id).cloned());
            }
            Command::CancelTask { task_id, reply } => {
                let _ = reply.send(self.pool.cancel_task(&task_id));
            }
            Command::Complete { task_id, outcome, reply } => {
                let result = match outcome {
                    ExecutionOutcome::Success => self.pool.complete(&task_id, true),
                    ExecutionOutcome::Failure(reason) => self.pool.complete_with_error(&task_id, reason),
                };
                let _ = reply.send(result);
            }
            Command::FailWorker { worker_id, reply } => {
                let _ = reply.send(self.pool.fail_worker(&worker_id));
            }
            Command::RestoreWorker { worker_id, reply } => {
                let _ = reply.send(self.pool.restore_worker(&worker_id));
            }
            Command::ReportHealth { worker_id, memory_usage, cpu_usage, reply } => {
                let _ = reply.send(self.pool.report_health(&worker_id, memory_usage, cpu_usage));
            }
            Command::Workers { reply } => {
                let _ = reply.send(Ok(self.pool.workers().to_vec()));
            }
            Command::Metrics { reply } => {
                let _ = reply.send(Ok(self.pool.metrics()));
            }
            Command::IsolationReport { reply } => {
                let _ = reply.send(Ok(self.pool.isolation_report()));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(Ok(self.pool.shutdown()));
            }
            Command::Finished { task_id, worker_id, outcome } => {
                self.finish(task_id, worker_id, outcome);
            }
        }
    }

    fn finish(&mut self, task_id: TaskId, worker_id: WorkerId, outcome: ExecutionOutcome) {
        if !self.pool.is_assigned(&task_id, &worker_id) {
            warn!(
                "Ignoring stale completion of {} from {} ({:?})",
                task_id, worker_id, outcome
            );
            return;
        }
        let result = match outcome {
            ExecutionOutcome::Success => self.pool.complete(&task_id, true),
            ExecutionOutcome::Failure(reason) => self.pool.complete_with_error(&task_id, reason),
        };
        if let Err(e) = result {
            warn!("Completion of {} from {} rejected: {}", task_id, worker_id, e);
        }
    }

    fn launch_dispatches(&mut self) {
        for dispatch in self.pool.take_dispatches() {
            if let Err(e) = self.pool.begin_execution(&dispatch.worker_id) {
                warn!("Not launching {} on {}: {}", dispatch.task_id, dispatch.worker_id, e);
                continue;
            }
            debug!("Launching {} on {}", dispatch.task_id, dispatch.worker_id);

            let executor = self.executor.clone();
            let tx = self.self_tx.clone();
            tokio::spawn(async move {
                // Inner task so a panicking executor still reports an outcome.
                let run = {
                    let dispatch = dispatch.clone();
                    tokio::spawn(async move { executor.execute(&dispatch).await })
                };
                let outcome = match run.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Executor for {} on {} died: {}", dispatch.task_id, dispatch.worker_id, e);
                        ExecutionOutcome::Failure(format!("executor panicked: {}", e))
                    }
                };
                if let Some(tx) = tx.upgrade() {
                    let _ = tx
                        .send(Command::Finished {
                            task_id: dispatch.task_id,
                            worker_id: dispatch.worker_id,
                            outcome,
                        })
                        .await;
                }
            });
        }
    }
}

/// Cloneable front door to a running pool.
#[derive(Clone)]
pub struct PoolHandle {
    tx: mpsc::Sender<Command>,
}

impl PoolHandle {
    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| Error::RuntimeStopped)?;
        rx.await.map_err(|_| Error::RuntimeStopped)?
    }

    pub async fn initialize(&self, size: usize) -> Result<Vec<Worker>> {
        self.request(|reply| Command::Initialize { size, reply }).await
    }

    pub async fn submit(&self, category: TaskCategory, payload: serde_json::Value) -> Result<Task> {
        self.request(|reply| Command::Submit { category, payload, reply }).await
    }

    pub async fn task(&self, task_id: TaskId) -> Result<Task> {
        self.request(|reply| Command::GetTask { task_id, reply }).await
    }

    pub async fn cancel_task(&self, task_id: TaskId) -> Result<Task> {
        self.request(|reply| Command::CancelTask { task_id, reply }).await
    }

    /// Report an outcome for an in-progress task from outside the executor.
    /// The executor's own outcome for that attempt is then ignored as stale.
    pub async fn complete(&self, task_id: TaskId, outcome: ExecutionOutcome) -> Result<Task> {
        self.request(|reply| Command::Complete { task_id, outcome, reply }).await
    }

    pub async fn fail_worker(&self, worker_id: WorkerId) -> Result<Worker> {
        self.request(|reply| Command::FailWorker { worker_id, reply }).await
    }

    pub async fn restore_worker(&self, worker_id: WorkerId) -> Result<Worker> {
        self.request(|reply| Command::RestoreWorker { worker_id, reply }).await
    }

    pub async fn report_health(
        &self,
        worker_id: WorkerId,
        memory_usage: f64,
        cpu_usage: f64,
    ) -> Result<Worker> {
        self.request(|reply| Command::ReportHealth {
            worker_id,
            memory_usage,
            cpu_usage,
            reply,
        })
        .await
    }

    pub async fn workers(&self) -> Result<Vec<Worker>> {
        self.request(|reply| Command::Workers { reply }).await
    }

    pub async fn metrics(&self) -> Result<PoolMetrics> {
        self.request(|reply| Command::Metrics { reply }).await
    }

    pub async fn isolation_report(&self) -> Result<Vec<IsolationViolation>> {
        self.request(|reply| Command::IsolationReport { reply }).await
    }

    pub async fn shutdown(&self) -> Result<ShutdownReport> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
