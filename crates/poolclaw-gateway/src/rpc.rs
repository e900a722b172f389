//! RPC router — dispatches JSON-RPC method calls to handlers
//!
//! Each method (task.submit, worker.fail, metrics.get, ...) is handled by a
//! dedicated async function that forwards to the pool runtime. Pool errors
//! map to stable error codes via `RpcError::from`.

use poolclaw_core::{
    CompleteParams, DependencyParams, Error, HealthParams, InitializeParams, RpcError,
    RpcResponse, SubmitParams, TaskParams, WorkerParams, CODE_AUTH, CODE_INVALID_PARAMS,
    CODE_METHOD_NOT_FOUND,
};
use poolclaw_scheduler::{DependencyBoard, ExecutionOutcome, PoolHandle};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Everything an RPC handler may touch.
#[derive(Clone)]
pub struct RpcContext {
    pub authenticated: bool,
    pub pool: PoolHandle,
    pub board: Arc<DependencyBoard>,
    pub started_at: Instant,
}

/// Result type for RPC handlers.
pub type RpcResult = Result<Value, (i32, String)>;

/// Route an RPC method call to the appropriate handler.
pub async fn route_rpc(method: &str, params: Value, ctx: &RpcContext) -> RpcResult {
    if !ctx.authenticated && method != "health" {
        return Err((CODE_AUTH, "Not authenticated".to_string()));
    }

    match method {
        "pool.initialize" => handle_pool_initialize(params, ctx).await,
        "pool.shutdown" => handle_pool_shutdown(ctx).await,
        "task.submit" => handle_task_submit(params, ctx).await,
        "task.get" => handle_task_get(params, ctx).await,
        "task.cancel" => handle_task_cancel(params, ctx).await,
        "task.complete" => handle_task_complete(params, ctx).await,
        "worker.list" => to_value(ctx.pool.workers().await),
        "worker.fail" => handle_worker_fail(params, ctx).await,
        "worker.restore" => handle_worker_restore(params, ctx).await,
        "worker.health" => handle_worker_health(params, ctx).await,
        "metrics.get" => to_value(ctx.pool.metrics().await),
        "isolation.report" => to_value(ctx.pool.isolation_report().await),
        "dependency.set" => handle_dependency_set(params, ctx),
        "dependency.list" => handle_dependency_list(ctx),
        "health" => handle_health(ctx).await,
        _ => Err((CODE_METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    }
}

/// Convert an RPC result to an RpcResponse.
pub fn to_response(id: &str, result: RpcResult) -> RpcResponse {
    match result {
        Ok(value) => RpcResponse::ok(id, value),
        Err((code, message)) => RpcResponse::err(id, code, message),
    }
}

pub fn pool_error(e: &Error) -> (i32, String) {
    let rpc = RpcError::from(e);
    (rpc.code, rpc.message)
}

fn params<T: DeserializeOwned>(params: Value) -> Result<T, (i32, String)> {
    serde_json::from_value(params)
        .map_err(|e| (CODE_INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_value<T: serde::Serialize>(result: poolclaw_core::Result<T>) -> RpcResult {
    let value = result.map_err(|e| pool_error(&e))?;
    serde_json::to_value(value).map_err(|e| pool_error(&Error::from(e)))
}

// ---------------------------------------------------------------------------
// pool.*
// ---------------------------------------------------------------------------

async fn handle_pool_initialize(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: InitializeParams = params(params_value)?;
    info!("RPC pool.initialize size={}", p.size);
    to_value(ctx.pool.initialize(p.size).await)
}

async fn handle_pool_shutdown(ctx: &RpcContext) -> RpcResult {
    info!("RPC pool.shutdown");
    to_value(ctx.pool.shutdown().await)
}

// ---------------------------------------------------------------------------
// task.*
// ---------------------------------------------------------------------------

async fn handle_task_submit(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: SubmitParams = params(params_value)?;
    to_value(ctx.pool.submit(p.category, p.payload).await)
}

async fn handle_task_get(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: TaskParams = params(params_value)?;
    to_value(ctx.pool.task(p.task_id).await)
}

async fn handle_task_cancel(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: TaskParams = params(params_value)?;
    to_value(ctx.pool.cancel_task(p.task_id).await)
}

async fn handle_task_complete(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: CompleteParams = params(params_value)?;
    let outcome = if p.success {
        ExecutionOutcome::Success
    } else {
        ExecutionOutcome::Failure(p.error.unwrap_or_else(|| "reported failure".to_string()))
    };
    to_value(ctx.pool.complete(p.task_id, outcome).await)
}

// ---------------------------------------------------------------------------
// worker.*
// ---------------------------------------------------------------------------

async fn handle_worker_fail(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: WorkerParams = params(params_value)?;
    to_value(ctx.pool.fail_worker(p.worker_id).await)
}

async fn handle_worker_restore(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: WorkerParams = params(params_value)?;
    to_value(ctx.pool.restore_worker(p.worker_id).await)
}

async fn handle_worker_health(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: HealthParams = params(params_value)?;
    to_value(
        ctx.pool
            .report_health(p.worker_id, p.memory_usage, p.cpu_usage)
            .await,
    )
}

// ---------------------------------------------------------------------------
// dependency.* — flags only; queued tasks are picked up on the next pool event
// ---------------------------------------------------------------------------

fn handle_dependency_set(params_value: Value, ctx: &RpcContext) -> RpcResult {
    let p: DependencyParams = params(params_value)?;
    ctx.board.set(p.dependency, p.available);
    Ok(json!({
        "dependency": p.dependency,
        "available": p.available,
    }))
}

fn handle_dependency_list(ctx: &RpcContext) -> RpcResult {
    let flags: serde_json::Map<String, Value> = ctx
        .board
        .snapshot()
        .into_iter()
        .map(|(dep, available)| (dep.as_str().to_string(), Value::Bool(available)))
        .collect();
    Ok(Value::Object(flags))
}

// ---------------------------------------------------------------------------
// health
// ---------------------------------------------------------------------------

async fn handle_health(ctx: &RpcContext) -> RpcResult {
    let metrics = ctx.pool.metrics().await.map_err(|e| pool_error(&e))?;
    Ok(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": ctx.started_at.elapsed().as_secs(),
        "pool_size": metrics.pool_size,
        "degraded_workers": metrics.degraded_workers,
        "queue_depth": metrics.queue_depth,
    }))
}
