//! Historic activity instance queries

use crate::ast::FieldOp;
use crate::builder::BuilderCore;
use crate::engine::{self, QueryContext, Queryable};
use crate::error::Result;
use procflow_core::{DateTime, Id, VariableValue};
use procflow_history::{HistoricActivityInstance, HistoryStore};
use std::sync::Arc;

/// Orderable/filterable columns of a historic activity instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityInstanceField {
    Id,
    ActivityId,
    ActivityName,
    ActivityType,
    ProcessInstanceId,
    ExecutionId,
    Assignee,
    StartTime,
    EndTime,
    DurationMs,
    TenantId,
}

impl Queryable for HistoricActivityInstance {
    type Field = ActivityInstanceField;

    fn id(&self) -> &Id {
        &self.id
    }

    fn field_value(&self, field: ActivityInstanceField) -> Option<VariableValue> {
        match field {
            ActivityInstanceField::Id => Some(VariableValue::from(self.id.as_str())),
            ActivityInstanceField::ActivityId => {
                Some(VariableValue::from(self.activity_id.as_str()))
            }
            ActivityInstanceField::ActivityName => {
                self.activity_name.as_deref().map(VariableValue::from)
            }
            ActivityInstanceField::ActivityType => {
                Some(VariableValue::from(self.activity_type.as_str()))
            }
            ActivityInstanceField::ProcessInstanceId => {
                Some(VariableValue::from(self.process_instance_id.as_str()))
            }
            ActivityInstanceField::ExecutionId => self
                .execution_id
                .as_ref()
                .map(|id| VariableValue::from(id.as_str())),
            ActivityInstanceField::Assignee => self.assignee.as_deref().map(VariableValue::from),
            ActivityInstanceField::StartTime => Some(VariableValue::from(self.start_time)),
            ActivityInstanceField::EndTime => self.end_time.map(VariableValue::from),
            ActivityInstanceField::DurationMs => self.duration_ms.map(VariableValue::from),
            ActivityInstanceField::TenantId => self.tenant_id.as_deref().map(VariableValue::from),
        }
    }

    fn process_instance_id(&self) -> &Id {
        &self.process_instance_id
    }

    fn task_id(&self) -> Option<&Id> {
        None
    }
}

/// Fluent query over historic activity instances
pub struct HistoricActivityInstanceQuery {
    store: Arc<dyn HistoryStore>,
    core: BuilderCore<ActivityInstanceField>,
}

impl HistoricActivityInstanceQuery {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            core: BuilderCore::default(),
        }
    }

    pub fn activity_instance_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            ActivityInstanceField::Id,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    /// The activity's id in the process model
    pub fn activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.core.field(
            ActivityInstanceField::ActivityId,
            FieldOp::Equals(VariableValue::from(activity_id.into())),
        );
        self
    }

    pub fn activity_name(mut self, name: impl Into<String>) -> Self {
        self.core.field(
            ActivityInstanceField::ActivityName,
            FieldOp::Equals(VariableValue::from(name.into())),
        );
        self
    }

    pub fn activity_type(mut self, activity_type: impl Into<String>) -> Self {
        self.core.field(
            ActivityInstanceField::ActivityType,
            FieldOp::Equals(VariableValue::from(activity_type.into())),
        );
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            ActivityInstanceField::ProcessInstanceId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn execution_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            ActivityInstanceField::ExecutionId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn task_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.core.field(
            ActivityInstanceField::Assignee,
            FieldOp::Equals(VariableValue::from(assignee.into())),
        );
        self
    }

    pub fn started_before(mut self, time: DateTime) -> Self {
        self.core.field(
            ActivityInstanceField::StartTime,
            FieldOp::LessThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn started_after(mut self, time: DateTime) -> Self {
        self.core.field(
            ActivityInstanceField::StartTime,
            FieldOp::GreaterThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    /// Only activities that have ended
    pub fn finished(mut self) -> Self {
        self.core
            .field(ActivityInstanceField::EndTime, FieldOp::IsNotNull);
        self
    }

    /// Only activities still running
    pub fn unfinished(mut self) -> Self {
        self.core
            .field(ActivityInstanceField::EndTime, FieldOp::IsNull);
        self
    }

    pub fn activity_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.core.field(
            ActivityInstanceField::TenantId,
            FieldOp::Equals(VariableValue::from(tenant_id.into())),
        );
        self
    }

    pub fn activity_without_tenant_id(mut self) -> Self {
        self.core
            .field(ActivityInstanceField::TenantId, FieldOp::IsNull);
        self
    }

    pub fn order_by(mut self, field: ActivityInstanceField) -> Self {
        self.core.order_by(field);
        self
    }

    pub fn asc(mut self) -> Self {
        self.core.ascending();
        self
    }

    pub fn desc(mut self) -> Self {
        self.core.descending();
        self
    }

    // -- execution ---------------------------------------------------------

    pub async fn list(&self) -> Result<Vec<HistoricActivityInstance>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        self.matched(&ctx).await
    }

    pub async fn list_page(
        &self,
        first_result: usize,
        max_results: usize,
    ) -> Result<Vec<HistoricActivityInstance>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        Ok(engine::page(matched, first_result, max_results))
    }

    pub async fn count(&self) -> Result<usize> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        Ok(self.matched(&ctx).await?.len())
    }

    pub async fn single_result(&self) -> Result<Option<HistoricActivityInstance>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        engine::single_result(matched)
    }

    async fn matched(&self, ctx: &QueryContext) -> Result<Vec<HistoricActivityInstance>> {
        let nodes = self.core.nodes()?;
        let entities = self.store.activity_instances().await?;
        Ok(engine::evaluate(entities, nodes, &self.core.order, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use procflow_history::{CaptureEvent, CaptureEventBody, InMemoryHistoryStore};

    async fn seed(store: &InMemoryHistoryStore) {
        let start = chrono::Utc::now();
        let bodies = vec![
            CaptureEventBody::ActivityStarted {
                activity: HistoricActivityInstance::started(
                    "ai-1", "startEvent1", "startEvent", "proc-1", start,
                ),
            },
            CaptureEventBody::ActivityStarted {
                activity: HistoricActivityInstance::started(
                    "ai-2",
                    "reviewTask",
                    "userTask",
                    "proc-1",
                    start + chrono::Duration::seconds(1),
                ),
            },
            CaptureEventBody::ActivityEnded {
                activity_instance_id: Id::from("ai-1"),
                end_time: start + chrono::Duration::seconds(1),
                delete_reason: None,
            },
        ];
        let events: Vec<CaptureEvent> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| CaptureEvent {
                sequence: (i + 1) as u64,
                correlation_id: Id::from("corr-1"),
                time: start,
                body,
            })
            .collect();
        store.apply_events(&Id::from("job-seed"), &events).await.unwrap();
    }

    #[tokio::test]
    async fn test_filter_by_type_and_state() {
        let store = Arc::new(InMemoryHistoryStore::new());
        seed(&store).await;

        let actual = HistoricActivityInstanceQuery::new(store.clone())
            .activity_type("userTask")
            .single_result()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actual.id, Id::from("ai-2"));

        let finished = HistoricActivityInstanceQuery::new(store.clone())
            .finished()
            .count()
            .await
            .unwrap();
        assert_eq!(finished, 1);

        let unfinished = HistoricActivityInstanceQuery::new(store)
            .unfinished()
            .single_result()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unfinished.activity_id, "reviewTask");
    }

    #[tokio::test]
    async fn test_order_by_start_time() {
        let store = Arc::new(InMemoryHistoryStore::new());
        seed(&store).await;

        let actual = HistoricActivityInstanceQuery::new(store)
            .process_instance_id("proc-1")
            .order_by(ActivityInstanceField::StartTime)
            .desc()
            .list()
            .await
            .unwrap();
        let ids: Vec<&str> = actual.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["ai-2", "ai-1"]);
    }
}
