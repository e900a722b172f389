//! Poolclaw configuration
//!
//! Loaded from TOML at startup, falls back to defaults if no config file
//! exists. CLI flags override individual values after loading.

use crate::audit::AuditLog;
use crate::degradation::{DependencyBoard, DependencyPolicy, HealthThresholds};
use crate::executor::{NoopExecutor, TaskExecutor, WebhookExecutor};
use crate::pool::CoordinationPool;
use poolclaw_core::{Dependency, Error, PoolLimits, Result, MAX_POOL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub pool: PoolSection,
    pub limits: PoolLimits,
    pub health: HealthThresholds,
    pub gateway: GatewaySection,
    pub audit: AuditSection,
    pub executor: ExecutorSection,
    pub dependencies: DependencySection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Workers created at startup. 0 waits for an explicit `pool.initialize`.
    pub initial_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub port: u16,
    pub bind: String,
    /// Bearer token. Unset means no auth unless POOLCLAW_GATEWAY_TOKEN is set.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// JSONL file receiving every state transition.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    /// POST each task here. Unset runs the no-op executor.
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

/// Initial availability of each external dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySection {
    pub graph_store: bool,
    pub llm_provider: bool,
    pub external_api: bool,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            port: 18790,
            bind: "127.0.0.1".to_string(),
            token: None,
        }
    }
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 30,
        }
    }
}

impl Default for DependencySection {
    fn default() -> Self {
        Self {
            graph_store: true,
            llm_provider: true,
            external_api: true,
        }
    }
}

impl DependencySection {
    pub fn get(&self, dependency: Dependency) -> bool {
        match dependency {
            Dependency::GraphStore => self.graph_store,
            Dependency::LlmProvider => self.llm_provider,
            Dependency::ExternalApi => self.external_api,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl PoolConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        if self.pool.initial_size > MAX_POOL_SIZE {
            return Err(Error::Config(format!(
                "pool.initial_size {} exceeds {}",
                self.pool.initial_size, MAX_POOL_SIZE
            )));
        }
        for (name, value) in [
            ("memory_threshold", self.health.memory_threshold),
            ("cpu_threshold", self.health.cpu_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Config(format!("health.{} must be in (0, 1]", name)));
            }
        }
        if self.executor.timeout_secs == 0 {
            return Err(Error::Config("executor.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Dependency board seeded from `[dependencies]`.
    pub fn dependency_board(&self) -> Arc<DependencyBoard> {
        let board = DependencyBoard::new();
        for dep in Dependency::ALL {
            board.set(dep, self.dependencies.get(dep));
        }
        Arc::new(board)
    }

    /// An uninitialized pool wired to `board` and the configured audit log.
    pub fn build_pool(&self, board: Arc<DependencyBoard>) -> CoordinationPool {
        let audit = match &self.audit.path {
            Some(path) => AuditLog::to_file(path),
            None => AuditLog::disabled(),
        };
        CoordinationPool::new(self.limits)
            .with_policy(Arc::new(DependencyPolicy::new(board)))
            .with_health_thresholds(self.health)
            .with_audit(audit)
    }

    pub fn build_executor(&self) -> Arc<dyn TaskExecutor> {
        match &self.executor.webhook_url {
            Some(url) => Arc::new(WebhookExecutor::new(
                url.clone(),
                Duration::from_secs(self.executor.timeout_secs),
            )),
            None => Arc::new(NoopExecutor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degradation::DependencyOracle;

    #[test]
    fn defaults_validate() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.initial_size, 0);
        assert_eq!(config.limits.max_queue_depth, 64);
        assert_eq!(config.limits.max_retries, 3);
        assert!(config.dependencies.get(Dependency::GraphStore));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: PoolConfig = toml::from_str(
            r#"
            [limits]
            max_retries = 5

            [dependencies]
            llm_provider = false
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.max_retries, 5);
        assert_eq!(config.limits.max_queue_depth, 64);
        assert!(!config.dependencies.llm_provider);
        assert!(config.dependencies.graph_store);
        assert_eq!(config.gateway.port, 18790);
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut config = PoolConfig::default();
        config.pool.initial_size = 4;
        config.executor.webhook_url = Some("http://localhost:9000/run".into());
        let parsed: PoolConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.pool.initial_size, 4);
        assert_eq!(parsed.executor.webhook_url.as_deref(), Some("http://localhost:9000/run"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = PoolConfig::load(Path::new("/nonexistent/poolclaw.toml"));
        assert_eq!(config.gateway.bind, "127.0.0.1");
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = PoolConfig::default();
        config.pool.initial_size = MAX_POOL_SIZE + 1;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.health.cpu_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.limits.max_queue_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn board_seeded_from_dependencies() {
        let mut config = PoolConfig::default();
        config.dependencies.external_api = false;
        let board = config.dependency_board();
        assert!(!board.is_available(Dependency::ExternalApi));
        assert!(board.is_available(Dependency::LlmProvider));
    }

    #[test]
    fn executor_selection() {
        let mut config = PoolConfig::default();
        assert_eq!(config.build_executor().name(), "noop");
        config.executor.webhook_url = Some("http://localhost:1/x".into());
        assert_eq!(config.build_executor().name(), "webhook");
    }
}
