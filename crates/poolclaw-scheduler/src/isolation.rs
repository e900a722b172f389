//! IsolationGuard — mints and verifies per-worker isolation identifiers
//!
//! Every worker gets an execution-context id, a tool-session id, and a
//! memory-handle id. Each `mint_set` starts a new generation; a fresh id is
//! checked against the current and previous generations only, so the guard
//! stays bounded at two pools' worth of ids across repeated re-initialization.

use poolclaw_core::{Error, IsolationIds, IsolationViolation, Result, Worker, WorkerStatus};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Default)]
pub struct IsolationGuard {
    current: HashSet<String>,
    previous: HashSet<String>,
}

impl IsolationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(&mut self, prefix: &str) -> String {
        loop {
            let id = format!("{}-{}", prefix, uuid::Uuid::new_v4());
            if !self.previous.contains(&id) && self.current.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Mint one set of identifiers unused in this or the previous generation.
    pub fn mint(&mut self) -> IsolationIds {
        IsolationIds {
            execution_context_id: self.fresh("exec"),
            tool_session_id: self.fresh("tool"),
            memory_handle_id: self.fresh("mem"),
        }
    }

    /// Start a new generation, mint `count` sets and verify they are
    /// pairwise disjoint.
    pub fn mint_set(&mut self, count: usize) -> Result<Vec<IsolationIds>> {
        self.previous = std::mem::take(&mut self.current);
        let sets: Vec<IsolationIds> = (0..count).map(|_| self.mint()).collect();
        verify_disjoint(&sets)?;
        Ok(sets)
    }

    /// Ids currently remembered: this generation plus the one before.
    pub fn issued_count(&self) -> usize {
        self.current.len() + self.previous.len()
    }
}

/// Fails on the first identifier that appears in more than one slot.
pub fn verify_disjoint(sets: &[IsolationIds]) -> Result<()> {
    let mut seen = HashSet::new();
    for set in sets {
        for id in set.as_array() {
            if !seen.insert(id) {
                return Err(Error::IsolationViolation(format!(
                    "identifier {} issued more than once",
                    id
                )));
            }
        }
    }
    Ok(())
}

/// Check every pair of non-idle workers for shared identifiers.
pub fn isolation_report(workers: &[Worker]) -> Vec<IsolationViolation> {
    let active: Vec<&Worker> = workers
        .iter()
        .filter(|w| w.status != WorkerStatus::Idle)
        .collect();

    let mut violations = Vec::new();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            let shared = a.isolation.shared_with(&b.isolation);
            if shared.is_empty() {
                continue;
            }
            let note = format!(
                "{} ({:?}) and {} ({:?}) share {}",
                a.worker_id,
                a.status,
                b.worker_id,
                b.status,
                shared.join(", ")
            );
            warn!("Isolation violation: {}", note);
            violations.push(IsolationViolation {
                worker_a: a.worker_id.clone(),
                worker_b: b.worker_id.clone(),
                shared_identifiers: shared,
                note,
            });
        }
    }
    violations
}
