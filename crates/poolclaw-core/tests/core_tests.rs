//! Tests for poolclaw-core: ids, categories, statuses, protocol, errors

use poolclaw_core::*;

// ===========================================================================
// Identifiers
// ===========================================================================

#[test]
fn worker_id_for_slot_is_zero_padded_and_ordered() {
    let a = WorkerId::for_slot(2);
    let b = WorkerId::for_slot(10);
    assert_eq!(a.as_str(), "worker-02");
    assert_eq!(format!("{}", b), "worker-10");
    assert!(a < b);
}

#[test]
fn task_ids_are_unique() {
    let a = TaskId::generate();
    let b = TaskId::generate();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("task-"));
}

#[test]
fn ids_serialize_as_plain_strings() {
    let id = TaskId::new("task-1");
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""task-1""#);
    let back: WorkerId = serde_json::from_str(r#""worker-03""#).unwrap();
    assert_eq!(back, WorkerId::for_slot(3));
}

#[test]
fn isolation_ids_shared_with_detects_cross_field_reuse() {
    let a = IsolationIds {
        execution_context_id: "ctx-1".into(),
        tool_session_id: "tool-1".into(),
        memory_handle_id: "mem-1".into(),
    };
    let b = IsolationIds {
        execution_context_id: "ctx-2".into(),
        tool_session_id: "ctx-1".into(),
        memory_handle_id: "mem-2".into(),
    };
    assert_eq!(a.shared_with(&b), vec!["ctx-1".to_string()]);

    let c = IsolationIds {
        execution_context_id: "ctx-3".into(),
        tool_session_id: "tool-3".into(),
        memory_handle_id: "mem-3".into(),
    };
    assert!(a.shared_with(&c).is_empty());
}

// ===========================================================================
// TaskCategory / Dependency
// ===========================================================================

#[test]
fn category_parses_known_names() {
    assert_eq!(TaskCategory::parse("knowledge_graph"), TaskCategory::KnowledgeGraph);
    assert_eq!(TaskCategory::parse("llm_generation"), TaskCategory::LlmGeneration);
    assert_eq!(TaskCategory::parse("external_api"), TaskCategory::ExternalApi);
    assert_eq!(TaskCategory::parse("self_contained"), TaskCategory::SelfContained);
}

#[test]
fn unknown_category_falls_back_to_general() {
    let c: TaskCategory = serde_json::from_str(r#""marketing_copy""#).unwrap();
    assert_eq!(c, TaskCategory::General);
    assert_eq!(TaskCategory::default(), TaskCategory::General);
}

#[test]
fn category_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&TaskCategory::LlmGeneration).unwrap(),
        r#""llm_generation""#
    );
}

#[test]
fn category_dependencies() {
    assert_eq!(
        TaskCategory::KnowledgeGraph.required_dependency(),
        Some(Dependency::GraphStore)
    );
    assert_eq!(
        TaskCategory::LlmGeneration.required_dependency(),
        Some(Dependency::LlmProvider)
    );
    assert_eq!(TaskCategory::SelfContained.required_dependency(), None);
    assert_eq!(TaskCategory::General.required_dependency(), None);
}

#[test]
fn dependency_parse_matches_as_str() {
    for dep in Dependency::ALL {
        assert_eq!(Dependency::parse(dep.as_str()), Some(dep));
    }
    assert_eq!(Dependency::parse("database"), None);
}

// ===========================================================================
// Statuses
// ===========================================================================

#[test]
fn task_status_terminality() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::InProgress.is_terminal());
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());
}

#[test]
fn statuses_serialize_screaming_snake() {
    assert_eq!(
        serde_json::to_string(&TaskStatus::InProgress).unwrap(),
        r#""IN_PROGRESS""#
    );
    assert_eq!(serde_json::to_string(&WorkerStatus::Idle).unwrap(), r#""IDLE""#);
}

#[test]
fn worker_busy_only_when_holding_task() {
    assert!(!WorkerStatus::Idle.is_busy());
    assert!(WorkerStatus::Analyzing.is_busy());
    assert!(WorkerStatus::Executing.is_busy());
    assert!(!WorkerStatus::Degraded.is_busy());
}

// ===========================================================================
// Task / Worker
// ===========================================================================

#[test]
fn new_task_starts_pending_with_no_attempts() {
    let task = Task::new(TaskCategory::General, serde_json::json!({"k": 1}));
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.attempt_count, 0);
    assert!(task.failed_worker_ids.is_empty());
    assert!(task.assigned_worker_id.is_none());
    assert!(task.assignment_latency_ms.is_none());
}

#[test]
fn worker_json_flattens_isolation_ids() {
    let worker = Worker::new(
        WorkerId::for_slot(0),
        IsolationIds {
            execution_context_id: "ctx-a".into(),
            tool_session_id: "tool-a".into(),
            memory_handle_id: "mem-a".into(),
        },
    );
    let json = serde_json::to_value(&worker).unwrap();
    assert_eq!(json["execution_context_id"], "ctx-a");
    assert_eq!(json["status"], "IDLE");
    assert!(json.get("current_task_id").is_none());
}

#[test]
fn health_values_are_clamped() {
    let h = WorkerHealth::new(1.7, -0.2);
    assert_eq!(h.memory_usage, 1.0);
    assert_eq!(h.cpu_usage, 0.0);
    assert_eq!(WorkerHealth::new(f64::NAN, 0.5).memory_usage, 0.0);
}

#[test]
fn performance_running_mean() {
    let mut perf = WorkerPerformance::default();
    perf.tasks_completed = 1;
    perf.record_duration(100.0);
    assert_eq!(perf.average_task_duration_ms, 100.0);
    perf.tasks_completed = 2;
    perf.record_duration(300.0);
    assert_eq!(perf.average_task_duration_ms, 200.0);
}

#[test]
fn performance_affinity_defaults_to_zero() {
    let mut perf = WorkerPerformance::default();
    assert_eq!(perf.affinity(TaskCategory::KnowledgeGraph), 0);
    perf.category_successes.insert(TaskCategory::KnowledgeGraph, 4);
    assert_eq!(perf.affinity(TaskCategory::KnowledgeGraph), 4);
}

// ===========================================================================
// Limits
// ===========================================================================

#[test]
fn default_limits() {
    let limits = PoolLimits::default();
    assert_eq!(limits.max_queue_depth, DEFAULT_MAX_QUEUE_DEPTH);
    assert_eq!(limits.max_retries, 3);
    assert!(limits.validate().is_ok());
    assert_eq!(MAX_POOL_SIZE, 16);
}

#[test]
fn zero_limits_are_rejected() {
    let limits = PoolLimits {
        max_queue_depth: 0,
        ..PoolLimits::default()
    };
    assert!(matches!(limits.validate(), Err(Error::Config(_))));
    let limits = PoolLimits {
        max_retries: 0,
        ..PoolLimits::default()
    };
    assert!(limits.validate().is_err());
}

// ===========================================================================
// Errors and protocol
// ===========================================================================

#[test]
fn error_classification() {
    assert!(Error::QueueFull { depth: 3 }.is_admission());
    assert!(Error::InvalidPoolSize { size: 0, max: 16 }.is_admission());
    assert!(Error::TaskNotFound("t".into()).is_not_found());
    assert!(!Error::TaskNotFound("t".into()).is_admission());
}

#[test]
fn error_display() {
    let e = Error::InvalidPoolSize { size: 17, max: 16 };
    assert_eq!(e.to_string(), "invalid pool size 17: must be between 1 and 16");
}

#[test]
fn rpc_error_codes_from_errors() {
    assert_eq!(RpcError::from(&Error::QueueFull { depth: 1 }).code, CODE_QUEUE_FULL);
    assert_eq!(
        RpcError::from(&Error::WorkerNotFound("w".into())).code,
        CODE_NOT_FOUND
    );
    assert_eq!(RpcError::from(&Error::NotInitialized).code, CODE_NOT_INITIALIZED);
    assert_eq!(RpcError::from(&Error::auth_failed("nope")).code, CODE_AUTH);
}

#[test]
fn rpc_response_ok_omits_error() {
    let resp = RpcResponse::ok("1", serde_json::json!({"ok": true}));
    let json = serde_json::to_string(&resp).unwrap();
    assert!(json.contains(r#""result""#));
    assert!(!json.contains(r#""error""#));
}

#[test]
fn rpc_request_params_default_to_null() {
    let req: RpcRequest = serde_json::from_str(r#"{"id":"1","method":"metrics.get"}"#).unwrap();
    assert!(req.params.is_null());
}

#[test]
fn submit_params_default_category() {
    let p: SubmitParams = serde_json::from_str(r#"{"payload":{"x":1}}"#).unwrap();
    assert_eq!(p.category, TaskCategory::General);
    assert_eq!(p.payload["x"], 1);
}

#[test]
fn dependency_params_parse() {
    let p: DependencyParams =
        serde_json::from_str(r#"{"dependency":"graph_store","available":false}"#).unwrap();
    assert_eq!(p.dependency, Dependency::GraphStore);
    assert!(!p.available);
}

#[test]
fn complete_params_error_is_optional() {
    let p: CompleteParams =
        serde_json::from_str(r#"{"task_id":"task-1","success":true}"#).unwrap();
    assert!(p.success);
    assert!(p.error.is_none());
}
