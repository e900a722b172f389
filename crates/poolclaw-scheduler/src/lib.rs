//! Poolclaw Scheduler - Coordination pool, isolation, degradation, and the runtime that drives it

pub mod audit;
pub mod config;
pub mod degradation;
pub mod executor;
pub mod isolation;
pub mod machine;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod runtime;

pub use audit::{read_records, AuditEntity, AuditLog, AuditRecord};
pub use config::PoolConfig;
pub use degradation::{
    AllowAll, DegradationPolicy, DependencyBoard, DependencyOracle, DependencyPolicy,
    HealthThresholds,
};
pub use executor::{ExecutionOutcome, NoopExecutor, TaskExecutor, WebhookExecutor};
pub use isolation::{isolation_report, verify_disjoint, IsolationGuard};
pub use pool::{CoordinationPool, Dispatch};
pub use runtime::{PoolHandle, PoolRuntime};
