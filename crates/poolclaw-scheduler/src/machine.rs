//! Task and worker state machines as explicit transition tables
//!
//! Each row is `(from, event) -> to`. Anything not in the table is an
//! `InvalidTransition`. Side effects (queue moves, counters, timestamps) are
//! applied by the pool after a row is matched.

use poolclaw_core::{Error, Result, TaskStatus, WorkerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// Handed to an idle worker.
    Assign,
    /// Worker reported success.
    Succeed,
    /// Failed with retries left; back to the queue head.
    Retry,
    /// Failed with no retries or candidates left.
    Exhaust,
    /// Explicit cancel or shutdown.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerEvent {
    Assign,
    BeginExecution,
    /// Task finished (either way); slot is free again.
    Release,
    Degrade,
    Restore,
}

use TaskStatus as T;
use WorkerStatus as W;

pub const TASK_TRANSITIONS: &[(TaskStatus, TaskEvent, TaskStatus)] = &[
    (T::Pending, TaskEvent::Assign, T::InProgress),
    (T::Pending, TaskEvent::Cancel, T::Cancelled),
    (T::InProgress, TaskEvent::Succeed, T::Completed),
    (T::InProgress, TaskEvent::Retry, T::Pending),
    (T::InProgress, TaskEvent::Exhaust, T::Failed),
    (T::InProgress, TaskEvent::Cancel, T::Cancelled),
];

pub const WORKER_TRANSITIONS: &[(WorkerStatus, WorkerEvent, WorkerStatus)] = &[
    (W::Idle, WorkerEvent::Assign, W::Analyzing),
    (W::Analyzing, WorkerEvent::BeginExecution, W::Executing),
    (W::Analyzing, WorkerEvent::Release, W::Idle),
    (W::Executing, WorkerEvent::Release, W::Idle),
    (W::Idle, WorkerEvent::Degrade, W::Degraded),
    (W::Analyzing, WorkerEvent::Degrade, W::Degraded),
    (W::Executing, WorkerEvent::Degrade, W::Degraded),
    (W::Degraded, WorkerEvent::Degrade, W::Degraded),
    (W::Degraded, WorkerEvent::Restore, W::Idle),
];

pub fn next_task_status(from: TaskStatus, event: TaskEvent) -> Result<TaskStatus> {
    TASK_TRANSITIONS
        .iter()
        .find(|(f, e, _)| *f == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or_else(|| Error::invalid_transition("task", from, event))
}

pub fn next_worker_status(from: WorkerStatus, event: WorkerEvent) -> Result<WorkerStatus> {
    WORKER_TRANSITIONS
        .iter()
        .find(|(f, e, _)| *f == from && *e == event)
        .map(|(_, _, to)| *to)
        .ok_or_else(|| Error::invalid_transition("worker", from, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TASK_STATUSES: [TaskStatus; 5] = [
        T::Pending,
        T::InProgress,
        T::Completed,
        T::Failed,
        T::Cancelled,
    ];
    const ALL_TASK_EVENTS: [TaskEvent; 5] = [
        TaskEvent::Assign,
        TaskEvent::Succeed,
        TaskEvent::Retry,
        TaskEvent::Exhaust,
        TaskEvent::Cancel,
    ];

    #[test]
    fn terminal_states_have_no_exits() {
        for from in ALL_TASK_STATUSES.iter().filter(|s| s.is_terminal()) {
            for event in ALL_TASK_EVENTS {
                assert!(
                    next_task_status(*from, event).is_err(),
                    "{:?} --{:?}--> should be rejected",
                    from,
                    event
                );
            }
        }
    }

    #[test]
    fn task_table_is_deterministic() {
        for (i, (f, e, _)) in TASK_TRANSITIONS.iter().enumerate() {
            for (g, d, _) in &TASK_TRANSITIONS[i + 1..] {
                assert!(!(f == g && e == d), "duplicate row for {:?}/{:?}", f, e);
            }
        }
    }

    #[test]
    fn happy_path() {
        let s = next_task_status(T::Pending, TaskEvent::Assign).unwrap();
        assert_eq!(s, T::InProgress);
        assert_eq!(next_task_status(s, TaskEvent::Succeed).unwrap(), T::Completed);
    }

    #[test]
    fn retry_returns_to_pending() {
        assert_eq!(
            next_task_status(T::InProgress, TaskEvent::Retry).unwrap(),
            T::Pending
        );
        assert!(next_task_status(T::Pending, TaskEvent::Retry).is_err());
    }

    #[test]
    fn worker_cycle() {
        let s = next_worker_status(W::Idle, WorkerEvent::Assign).unwrap();
        let s = next_worker_status(s, WorkerEvent::BeginExecution).unwrap();
        assert_eq!(s, W::Executing);
        assert_eq!(next_worker_status(s, WorkerEvent::Release).unwrap(), W::Idle);
    }

    #[test]
    fn busy_or_degraded_worker_cannot_be_assigned() {
        for from in [W::Analyzing, W::Executing, W::Degraded] {
            assert!(next_worker_status(from, WorkerEvent::Assign).is_err());
        }
    }

    #[test]
    fn only_degraded_workers_restore() {
        assert_eq!(
            next_worker_status(W::Degraded, WorkerEvent::Restore).unwrap(),
            W::Idle
        );
        assert!(next_worker_status(W::Idle, WorkerEvent::Restore).is_err());
        let err = next_worker_status(W::Executing, WorkerEvent::Restore).unwrap_err();
        assert!(err.to_string().contains("worker"));
    }
}
