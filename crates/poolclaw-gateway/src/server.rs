//! Gateway server — `/rpc` plus a few read-only REST conveniences

use crate::auth::ResolvedAuth;
use crate::rpc::{pool_error, route_rpc, to_response, RpcContext};
use axum::{
    extract::{Path as AxumPath, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use poolclaw_core::{Error, RpcRequest, TaskId, CODE_AUTH};
use poolclaw_scheduler::{DependencyBoard, PoolHandle};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct GatewayConfig {
    pub port: u16,
    pub bind: String,
    pub token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 18790,
            bind: "127.0.0.1".to_string(),
            token: None,
        }
    }
}

/// Shared state for all HTTP handlers.
pub struct GatewayState {
    pub auth: ResolvedAuth,
    pub pool: PoolHandle,
    pub board: Arc<DependencyBoard>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(auth: ResolvedAuth, pool: PoolHandle, board: Arc<DependencyBoard>) -> Self {
        Self {
            auth,
            pool,
            board,
            started_at: Instant::now(),
        }
    }

    fn context(&self, authenticated: bool) -> RpcContext {
        RpcContext {
            authenticated,
            pool: self.pool.clone(),
            board: self.board.clone(),
            started_at: self.started_at,
        }
    }
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/isolation", get(isolation_handler))
        .route("/tasks/:task_id", get(task_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn start_gateway(
    config: GatewayConfig,
    pool: PoolHandle,
    board: Arc<DependencyBoard>,
) -> anyhow::Result<()> {
    let env_token = std::env::var("POOLCLAW_GATEWAY_TOKEN").ok();
    let auth = ResolvedAuth::from_config(config.token, env_token);
    let auth_enabled = auth.enabled();
    let state = Arc::new(GatewayState::new(auth, pool, board));
    let app = router(state);

    let bind_addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {}:{}: {}", config.bind, config.port, e))?;

    info!("Poolclaw Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  RPC:       http://{}/rpc", bind_addr);
    info!("  Auth:      {}", if auth_enabled { "bearer token" } else { "none" });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_status(e: &Error) -> StatusCode {
    match e {
        Error::AuthFailed(_) => StatusCode::UNAUTHORIZED,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        Error::RuntimeStopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &Error) -> Response {
    let (code, message) = pool_error(e);
    (
        error_status(e),
        Json(json!({ "error": { "code": code, "message": message } })),
    )
        .into_response()
}

async fn rpc_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(request): Json<RpcRequest>,
) -> Response {
    let authenticated = match state.auth.verify_headers(&headers) {
        Ok(()) => true,
        Err(e) => {
            warn!("Rejected RPC {}: {}", request.method, e);
            false
        }
    };
    let ctx = state.context(authenticated);
    let result = route_rpc(&request.method, request.params, &ctx).await;
    let status = match &result {
        Err((CODE_AUTH, _)) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::OK,
    };
    (status, Json(to_response(&request.id, result))).into_response()
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> Response {
    match route_rpc("health", serde_json::Value::Null, &state.context(true)).await {
        Ok(value) => Json(value).into_response(),
        Err((code, message)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": { "code": code, "message": message } })),
        )
            .into_response(),
    }
}

async fn metrics_handler(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    if let Err(e) = state.auth.verify_headers(&headers) {
        return error_response(&e);
    }
    match state.pool.metrics().await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn isolation_handler(State(state): State<Arc<GatewayState>>, headers: HeaderMap) -> Response {
    if let Err(e) = state.auth.verify_headers(&headers) {
        return error_response(&e);
    }
    match state.pool.isolation_report().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn task_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    AxumPath(task_id): AxumPath<String>,
) -> Response {
    if let Err(e) = state.auth.verify_headers(&headers) {
        return error_response(&e);
    }
    match state.pool.task(TaskId::new(task_id)).await {
        Ok(task) => Json(task).into_response(),
        Err(e) => error_response(&e),
    }
}
