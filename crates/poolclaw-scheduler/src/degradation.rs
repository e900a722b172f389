//! Graceful degradation — category gating and worker health thresholds
//!
//! A `DegradationPolicy` is asked on every assignment attempt whether a task
//! category may be dispatched right now. Denied tasks stay queued; they are
//! never failed for an unavailable dependency.

use dashmap::DashMap;
use poolclaw_core::{Dependency, TaskCategory, WorkerHealth};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Decides whether a task category may be dispatched. Evaluated fresh on
/// every assignment attempt, never cached.
pub trait DegradationPolicy: Send + Sync {
    fn allows(&self, category: TaskCategory) -> bool;
}

/// Dispatches everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl DegradationPolicy for AllowAll {
    fn allows(&self, _category: TaskCategory) -> bool {
        true
    }
}

/// Live reachability of the external services task categories depend on.
pub trait DependencyOracle: Send + Sync {
    fn is_available(&self, dependency: Dependency) -> bool;
}

/// Availability flags flipped by health probes or operators.
/// Dependencies never reported are assumed available.
#[derive(Debug, Default)]
pub struct DependencyBoard {
    flags: DashMap<Dependency, bool>,
}

impl DependencyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dependency: Dependency, available: bool) {
        let previous = self.flags.insert(dependency, available);
        if previous != Some(available) {
            info!(
                "Dependency {} is now {}",
                dependency.as_str(),
                if available { "available" } else { "unavailable" }
            );
        }
    }

    pub fn snapshot(&self) -> Vec<(Dependency, bool)> {
        Dependency::ALL
            .into_iter()
            .map(|d| (d, self.is_available(d)))
            .collect()
    }
}

impl DependencyOracle for DependencyBoard {
    fn is_available(&self, dependency: Dependency) -> bool {
        self.flags.get(&dependency).map(|v| *v).unwrap_or(true)
    }
}

/// Allows a category iff its required dependency (if any) is reachable.
pub struct DependencyPolicy {
    oracle: Arc<dyn DependencyOracle>,
}

impl DependencyPolicy {
    pub fn new(oracle: Arc<dyn DependencyOracle>) -> Self {
        Self { oracle }
    }
}

impl DegradationPolicy for DependencyPolicy {
    fn allows(&self, category: TaskCategory) -> bool {
        match category.required_dependency() {
            Some(dep) => self.oracle.is_available(dep),
            None => true,
        }
    }
}

/// Health levels at which a worker is taken out of rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub memory_threshold: f64,
    pub cpu_threshold: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            memory_threshold: 0.9,
            cpu_threshold: 0.95,
        }
    }
}

impl HealthThresholds {
    pub fn crossed(&self, health: &WorkerHealth) -> bool {
        health.memory_usage >= self.memory_threshold || health.cpu_usage >= self.cpu_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_defaults_to_available() {
        let board = DependencyBoard::new();
        for dep in Dependency::ALL {
            assert!(board.is_available(dep));
        }
    }

    #[test]
    fn policy_follows_board_live() {
        let board = Arc::new(DependencyBoard::new());
        let policy = DependencyPolicy::new(board.clone());

        board.set(Dependency::GraphStore, false);
        assert!(!policy.allows(TaskCategory::KnowledgeGraph));
        assert!(policy.allows(TaskCategory::LlmGeneration));
        assert!(policy.allows(TaskCategory::SelfContained));

        board.set(Dependency::GraphStore, true);
        assert!(policy.allows(TaskCategory::KnowledgeGraph));
    }

    #[test]
    fn general_category_never_gated() {
        let board = Arc::new(DependencyBoard::new());
        for dep in Dependency::ALL {
            board.set(dep, false);
        }
        let policy = DependencyPolicy::new(board);
        assert!(policy.allows(TaskCategory::General));
        assert!(!policy.allows(TaskCategory::ExternalApi));
    }

    #[test]
    fn thresholds_are_inclusive() {
        let t = HealthThresholds::default();
        assert!(!t.crossed(&WorkerHealth::new(0.5, 0.5)));
        assert!(t.crossed(&WorkerHealth::new(0.9, 0.1)));
        assert!(t.crossed(&WorkerHealth::new(0.1, 0.99)));
    }
}
