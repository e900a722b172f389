//! Pool limits

use serde::{Deserialize, Serialize};

/// Hard upper bound on the number of workers in a pool.
pub const MAX_POOL_SIZE: usize = 16;
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TASK_RETENTION: usize = 10_000;

/// Tunable admission and retry limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolLimits {
    /// Bound on `len(queue) + count(IN_PROGRESS)`.
    pub max_queue_depth: usize,
    /// Failed attempts after which a task becomes FAILED.
    pub max_retries: u32,
    /// Terminal tasks kept for inspection before the oldest are evicted.
    pub task_retention: usize,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            max_retries: DEFAULT_MAX_RETRIES,
            task_retention: DEFAULT_TASK_RETENTION,
        }
    }
}

impl PoolLimits {
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_queue_depth == 0 {
            return Err(crate::Error::Config("max_queue_depth must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(crate::Error::Config("max_retries must be at least 1".into()));
        }
        Ok(())
    }
}
