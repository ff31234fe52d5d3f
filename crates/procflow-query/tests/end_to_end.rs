//! Capture-to-query flow
//!
//! Events recorded through a unit of work only become queryable after the
//! job pipeline has drained; these tests drive the full path instead of
//! writing to the store directly.

use pretty_assertions::assert_eq;
use procflow_core::{HistoryLevel, Id, VariableScopeKey, VariableValue};
use procflow_history::{
    CaptureEventBody, HistoricProcessInstance, HistoricTaskInstance, HistoryStore,
    InMemoryHistoryStore, NewTaskLogEntry, TaskLogEntryType,
};
use procflow_pipeline::{
    HistoryEventsHandler, InMemoryJobStorage, JobPipeline, PipelineConfig, UnitOfWork,
};
use procflow_query::{
    HistoricProcessInstanceQuery, HistoricTaskInstanceQuery, TaskLogEntryQuery,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    storage: Arc<InMemoryJobStorage>,
    store: Arc<InMemoryHistoryStore>,
    pipeline: JobPipeline,
}

impl Harness {
    fn new() -> Self {
        let storage = Arc::new(InMemoryJobStorage::new());
        let store = Arc::new(InMemoryHistoryStore::new());
        let config = PipelineConfig::default()
            .owner("e2e-worker")
            .lock_timeout(Duration::from_secs(60));
        let mut pipeline = JobPipeline::new(storage.clone(), config);
        pipeline.register_handler(Arc::new(HistoryEventsHandler::new(store.clone())));
        Self {
            storage,
            store,
            pipeline,
        }
    }

    fn unit(&self, level: HistoryLevel) -> UnitOfWork {
        UnitOfWork::new(level, self.storage.clone())
    }
}

fn record_order_fulfilment(unit: &mut UnitOfWork) {
    let start = chrono::Utc::now();
    let mut instance = HistoricProcessInstance::started("proc-1", start);
    instance.process_definition_key = Some("orderFulfilment".to_string());
    unit.record(CaptureEventBody::ProcessInstanceStarted { instance });

    let mut task = HistoricTaskInstance::created("task-1", "proc-1", start);
    task.assignee = Some("kermit".to_string());
    unit.record(CaptureEventBody::TaskCreated { task });

    unit.record(CaptureEventBody::VariableSet {
        key: VariableScopeKey::process("proc-1", "amount"),
        value: VariableValue::from(450i64),
        revision: 0,
    });
    unit.record(CaptureEventBody::TaskLogEntryAdded {
        entry: NewTaskLogEntry::new("task-1", TaskLogEntryType::Created, start),
    });
}

#[tokio::test]
async fn test_committed_capture_becomes_queryable_after_drain() {
    let harness = Harness::new();
    let mut unit = harness.unit(HistoryLevel::Audit);
    record_order_fulfilment(&mut unit);
    unit.commit().await.unwrap();

    // Nothing is visible until the pipeline runs
    let before = HistoricProcessInstanceQuery::new(harness.store.clone())
        .count()
        .await
        .unwrap();
    assert_eq!(before, 0);

    harness.pipeline.drain().await.unwrap();

    let instance = HistoricProcessInstanceQuery::new(harness.store.clone())
        .process_definition_key("orderFulfilment")
        .variable_value_equals("amount", 450i64)
        .unwrap()
        .include_process_variables()
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(instance.entity.id, Id::from("proc-1"));
    assert_eq!(
        instance.variables.unwrap()["amount"],
        VariableValue::from(450i64)
    );

    let task = HistoricTaskInstanceQuery::new(harness.store.clone())
        .task_assignee("kermit")
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.entity.id, Id::from("task-1"));

    let log = TaskLogEntryQuery::new(harness.store, "task-1")
        .list()
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].log_number, 1);
}

#[tokio::test]
async fn test_rolled_back_capture_never_reaches_the_store() {
    let harness = Harness::new();
    let mut unit = harness.unit(HistoryLevel::Full);
    record_order_fulfilment(&mut unit);
    unit.rollback("simulated constraint violation");

    harness.pipeline.drain().await.unwrap();

    let counts = harness.store.counts().await.unwrap();
    assert_eq!(counts.process_instances, 0);
    assert_eq!(counts.task_instances, 0);
    assert_eq!(counts.variables, 0);
}

/// Raising the configured level never captures less
#[tokio::test]
async fn test_level_monotonicity_across_the_full_path() {
    let mut persisted = Vec::new();
    for level in [
        HistoryLevel::None,
        HistoryLevel::Activity,
        HistoryLevel::Audit,
        HistoryLevel::Full,
    ] {
        let harness = Harness::new();
        let mut unit = harness.unit(level);
        record_order_fulfilment(&mut unit);
        unit.record(CaptureEventBody::VariableDetail {
            detail: procflow_history::HistoricDetail {
                id: Id::from("det-1"),
                process_instance_id: Id::from("proc-1"),
                execution_id: None,
                task_id: None,
                name: "amount".to_string(),
                value: VariableValue::from(450i64),
                revision: 0,
                time: chrono::Utc::now(),
            },
        });
        unit.commit().await.unwrap();
        harness.pipeline.drain().await.unwrap();

        let counts = harness.store.counts().await.unwrap();
        let total = counts.process_instances
            + counts.task_instances
            + counts.variables
            + counts.details
            + counts.task_log_entries;
        persisted.push(total);
    }

    assert_eq!(persisted[0], 0);
    assert!(persisted.windows(2).all(|w| w[0] <= w[1]));
    // Audit adds the task rows, Full adds the detail row
    assert!(persisted[2] > persisted[1]);
    assert!(persisted[3] > persisted[2]);
}

#[tokio::test]
async fn test_cleared_definition_references_leave_history_queryable() {
    let harness = Harness::new();
    let mut unit = harness.unit(HistoryLevel::Audit);

    let start = chrono::Utc::now();
    let mut instance = HistoricProcessInstance::started("proc-1", start);
    instance.process_definition_id = Some(Id::from("def-1"));
    instance.process_definition_key = Some("invoice".to_string());
    instance.process_definition_version = Some(2);
    unit.record(CaptureEventBody::ProcessInstanceStarted { instance });
    unit.record(CaptureEventBody::TaskCreated {
        task: HistoricTaskInstance::created("task-1", "proc-1", start),
    });
    unit.commit().await.unwrap();
    harness.pipeline.drain().await.unwrap();

    harness
        .store
        .clear_definition_references(&Id::from("def-1"))
        .await
        .unwrap();

    // The instance row survives with its definition naming nulled
    let instance = HistoricProcessInstanceQuery::new(harness.store.clone())
        .process_instance_id("proc-1")
        .single_result()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(instance.entity.process_definition_key, None);
    assert_eq!(instance.entity.process_definition_version, None);

    // Attached history is still reachable
    let tasks = HistoricTaskInstanceQuery::new(harness.store)
        .process_instance_id("proc-1")
        .count()
        .await
        .unwrap();
    assert_eq!(tasks, 1);
}
