//! Poolclaw Gateway - HTTP/JSON surface over the coordination pool

pub mod auth;
pub mod rpc;
pub mod server;

pub use auth::ResolvedAuth;
pub use rpc::{route_rpc, to_response, RpcContext, RpcResult};
pub use server::{router, start_gateway, GatewayConfig, GatewayState};
