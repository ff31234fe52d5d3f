//! Historic task instance queries
//!
//! Tasks carry two variable scopes: task-local rows and the enclosing
//! process instance's global rows. The `task_variable_*` filters hit the
//! local scope, the `process_variable_*` filters the global one, and
//! hydration can include either or both (local wins on name collisions).

use crate::ast::{FieldOp, Predicate, VariableOperator, VariablePredicate};
use crate::builder::{require_id_set, BuilderCore};
use crate::engine::{self, QueryContext, QueryRow, Queryable};
use crate::error::{QueryError, Result};
use procflow_core::{DateTime, Id, VariableValue};
use procflow_history::{HistoricTaskInstance, HistoryStore};
use std::sync::Arc;

/// Orderable/filterable columns of a historic task instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskInstanceField {
    Id,
    ProcessInstanceId,
    ProcessDefinitionId,
    ExecutionId,
    Name,
    Description,
    Assignee,
    Owner,
    Priority,
    DueDate,
    CreateTime,
    EndTime,
    DurationMs,
    DeleteReason,
    TenantId,
}

impl Queryable for HistoricTaskInstance {
    type Field = TaskInstanceField;

    fn id(&self) -> &Id {
        &self.id
    }

    fn field_value(&self, field: TaskInstanceField) -> Option<VariableValue> {
        match field {
            TaskInstanceField::Id => Some(VariableValue::from(self.id.as_str())),
            TaskInstanceField::ProcessInstanceId => {
                Some(VariableValue::from(self.process_instance_id.as_str()))
            }
            TaskInstanceField::ProcessDefinitionId => self
                .process_definition_id
                .as_ref()
                .map(|id| VariableValue::from(id.as_str())),
            TaskInstanceField::ExecutionId => self
                .execution_id
                .as_ref()
                .map(|id| VariableValue::from(id.as_str())),
            TaskInstanceField::Name => self.name.as_deref().map(VariableValue::from),
            TaskInstanceField::Description => self.description.as_deref().map(VariableValue::from),
            TaskInstanceField::Assignee => self.assignee.as_deref().map(VariableValue::from),
            TaskInstanceField::Owner => self.owner.as_deref().map(VariableValue::from),
            TaskInstanceField::Priority => Some(VariableValue::from(i64::from(self.priority))),
            TaskInstanceField::DueDate => self.due_date.map(VariableValue::from),
            TaskInstanceField::CreateTime => Some(VariableValue::from(self.create_time)),
            TaskInstanceField::EndTime => self.end_time.map(VariableValue::from),
            TaskInstanceField::DurationMs => self.duration_ms.map(VariableValue::from),
            TaskInstanceField::DeleteReason => {
                self.delete_reason.as_deref().map(VariableValue::from)
            }
            TaskInstanceField::TenantId => self.tenant_id.as_deref().map(VariableValue::from),
        }
    }

    fn process_instance_id(&self) -> &Id {
        &self.process_instance_id
    }

    fn task_id(&self) -> Option<&Id> {
        Some(&self.id)
    }
}

/// Fluent query over historic task instances
pub struct HistoricTaskInstanceQuery {
    store: Arc<dyn HistoryStore>,
    core: BuilderCore<TaskInstanceField>,
}

impl std::fmt::Debug for HistoricTaskInstanceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricTaskInstanceQuery")
            .finish_non_exhaustive()
    }
}

impl HistoricTaskInstanceQuery {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            core: BuilderCore::default(),
        }
    }

    // -- task filters ------------------------------------------------------

    pub fn task_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            TaskInstanceField::Id,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn process_instance_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            TaskInstanceField::ProcessInstanceId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    /// Restrict to tasks of a set of process instances
    pub fn process_instance_ids(mut self, ids: Option<Vec<Id>>) -> Result<Self> {
        let ids = require_id_set(ids, "process instance ids")?;
        self.core
            .field(TaskInstanceField::ProcessInstanceId, FieldOp::In(ids));
        Ok(self)
    }

    pub fn process_definition_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            TaskInstanceField::ProcessDefinitionId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn execution_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            TaskInstanceField::ExecutionId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn task_name(mut self, name: impl Into<String>) -> Self {
        self.core.field(
            TaskInstanceField::Name,
            FieldOp::Equals(VariableValue::from(name.into())),
        );
        self
    }

    pub fn task_name_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(TaskInstanceField::Name, FieldOp::Like(pattern.into()));
        self
    }

    pub fn task_description_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(TaskInstanceField::Description, FieldOp::Like(pattern.into()));
        self
    }

    pub fn task_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.core.field(
            TaskInstanceField::Assignee,
            FieldOp::Equals(VariableValue::from(assignee.into())),
        );
        self
    }

    pub fn task_assignee_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(TaskInstanceField::Assignee, FieldOp::Like(pattern.into()));
        self
    }

    pub fn task_unassigned(mut self) -> Self {
        self.core.field(TaskInstanceField::Assignee, FieldOp::IsNull);
        self
    }

    pub fn task_owner(mut self, owner: impl Into<String>) -> Self {
        self.core.field(
            TaskInstanceField::Owner,
            FieldOp::Equals(VariableValue::from(owner.into())),
        );
        self
    }

    pub fn task_priority(mut self, priority: i32) -> Self {
        self.core.field(
            TaskInstanceField::Priority,
            FieldOp::Equals(VariableValue::from(i64::from(priority))),
        );
        self
    }

    pub fn task_min_priority(mut self, priority: i32) -> Self {
        self.core.field(
            TaskInstanceField::Priority,
            FieldOp::GreaterThanOrEqual(VariableValue::from(i64::from(priority))),
        );
        self
    }

    pub fn task_max_priority(mut self, priority: i32) -> Self {
        self.core.field(
            TaskInstanceField::Priority,
            FieldOp::LessThanOrEqual(VariableValue::from(i64::from(priority))),
        );
        self
    }

    pub fn task_due_before(mut self, time: DateTime) -> Self {
        self.core.field(
            TaskInstanceField::DueDate,
            FieldOp::LessThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn task_due_after(mut self, time: DateTime) -> Self {
        self.core.field(
            TaskInstanceField::DueDate,
            FieldOp::GreaterThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn task_created_before(mut self, time: DateTime) -> Self {
        self.core.field(
            TaskInstanceField::CreateTime,
            FieldOp::LessThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn task_created_after(mut self, time: DateTime) -> Self {
        self.core.field(
            TaskInstanceField::CreateTime,
            FieldOp::GreaterThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    /// Only tasks that have ended
    pub fn finished(mut self) -> Self {
        self.core.field(TaskInstanceField::EndTime, FieldOp::IsNotNull);
        self
    }

    /// Only tasks still open
    pub fn unfinished(mut self) -> Self {
        self.core.field(TaskInstanceField::EndTime, FieldOp::IsNull);
        self
    }

    pub fn task_delete_reason(mut self, reason: impl Into<String>) -> Self {
        self.core.field(
            TaskInstanceField::DeleteReason,
            FieldOp::Equals(VariableValue::from(reason.into())),
        );
        self
    }

    /// The user appears in an identity link of the task
    pub fn task_involved_user(mut self, user_id: impl Into<String>) -> Self {
        self.core.add(Predicate::InvolvedUser(user_id.into()));
        self
    }

    /// The group appears in a candidate identity link of the task
    pub fn task_candidate_group(mut self, group_id: impl Into<String>) -> Self {
        self.core.add(Predicate::CandidateGroup(group_id.into()));
        self
    }

    // -- tenant filters ----------------------------------------------------

    pub fn task_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.core.field(
            TaskInstanceField::TenantId,
            FieldOp::Equals(VariableValue::from(tenant_id.into())),
        );
        self
    }

    pub fn task_tenant_id_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(TaskInstanceField::TenantId, FieldOp::Like(pattern.into()));
        self
    }

    pub fn task_without_tenant_id(mut self) -> Self {
        self.core.field(TaskInstanceField::TenantId, FieldOp::IsNull);
        self
    }

    // -- variable filters --------------------------------------------------

    /// Task-local variable equality
    pub fn task_variable_value_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::Equals,
            Some(value.into()),
            true,
        )
    }

    pub fn task_variable_value_not_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::NotEquals,
            Some(value.into()),
            true,
        )
    }

    pub fn task_variable_value_equals_ignore_case(
        self,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<Self> {
        if name.is_none() {
            return Err(QueryError::illegal_argument("name is null"));
        }
        self.variable(
            name.map(str::to_string),
            VariableOperator::EqualsIgnoreCase,
            value.map(VariableValue::from),
            true,
        )
    }

    pub fn task_variable_value_like(
        self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::Like,
            Some(VariableValue::from(pattern.into())),
            true,
        )
    }

    pub fn task_variable_value_greater_than(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::GreaterThan,
            Some(value.into()),
            true,
        )
    }

    pub fn task_variable_value_less_than(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::LessThan,
            Some(value.into()),
            true,
        )
    }

    pub fn task_variable_exists(mut self, name: impl Into<String>) -> Self {
        self.core.add(Predicate::VariableExists {
            name: name.into(),
            local: true,
        });
        self
    }

    pub fn task_variable_not_exists(mut self, name: impl Into<String>) -> Self {
        self.core.add(Predicate::VariableNotExists {
            name: name.into(),
            local: true,
        });
        self
    }

    /// Process-global variable equality, joined through the task's process
    /// instance
    pub fn process_variable_value_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::Equals,
            Some(value.into()),
            false,
        )
    }

    pub fn process_variable_value_not_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::NotEquals,
            Some(value.into()),
            false,
        )
    }

    pub fn process_variable_value_equals_ignore_case(
        self,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<Self> {
        if name.is_none() {
            return Err(QueryError::illegal_argument("name is null"));
        }
        self.variable(
            name.map(str::to_string),
            VariableOperator::EqualsIgnoreCase,
            value.map(VariableValue::from),
            false,
        )
    }

    pub fn process_variable_value_like(
        self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::Like,
            Some(VariableValue::from(pattern.into())),
            false,
        )
    }

    pub fn process_variable_value_greater_than(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::GreaterThan,
            Some(value.into()),
            false,
        )
    }

    pub(crate) fn variable(
        mut self,
        name: Option<String>,
        operator: VariableOperator,
        value: Option<VariableValue>,
        local: bool,
    ) -> Result<Self> {
        let predicate = VariablePredicate::new(name, operator, value, local)?;
        self.core.add(Predicate::Variable(predicate));
        Ok(self)
    }

    // -- composition -------------------------------------------------------

    pub fn or(mut self) -> Result<Self> {
        self.core.begin_or()?;
        Ok(self)
    }

    pub fn end_or(mut self) -> Result<Self> {
        self.core.end_or()?;
        Ok(self)
    }

    // -- ordering and hydration --------------------------------------------

    pub fn order_by(mut self, field: TaskInstanceField) -> Self {
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

    /// Attach the enclosing process instance's variables to each row
    pub fn include_process_variables(mut self) -> Self {
        self.core.include_process_variables = true;
        self
    }

    /// Attach each task's local variables to its row
    pub fn include_task_local_variables(mut self) -> Self {
        self.core.include_task_local_variables = true;
        self
    }

    // -- execution ---------------------------------------------------------

    pub async fn list(&self) -> Result<Vec<QueryRow<HistoricTaskInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        Ok(self.hydrate_all(matched, &ctx))
    }

    pub async fn list_page(
        &self,
        first_result: usize,
        max_results: usize,
    ) -> Result<Vec<QueryRow<HistoricTaskInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        let paged = engine::page(matched, first_result, max_results);
        Ok(self.hydrate_all(paged, &ctx))
    }

    pub async fn count(&self) -> Result<usize> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        Ok(self.matched(&ctx).await?.len())
    }

    pub async fn single_result(&self) -> Result<Option<QueryRow<HistoricTaskInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        let single = engine::single_result(matched)?;
        Ok(single.map(|e| {
            engine::hydrate(
                e,
                &ctx,
                self.core.include_process_variables,
                self.core.include_task_local_variables,
            )
        }))
    }

    async fn matched(&self, ctx: &QueryContext) -> Result<Vec<HistoricTaskInstance>> {
        let nodes = self.core.nodes()?;
        let entities = self.store.task_instances().await?;
        Ok(engine::evaluate(entities, nodes, &self.core.order, ctx))
    }

    fn hydrate_all(
        &self,
        rows: Vec<HistoricTaskInstance>,
        ctx: &QueryContext,
    ) -> Vec<QueryRow<HistoricTaskInstance>> {
        rows.into_iter()
            .map(|e| {
                engine::hydrate(
                    e,
                    ctx,
                    self.core.include_process_variables,
                    self.core.include_task_local_variables,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use procflow_core::VariableScopeKey;
    use procflow_history::{
        CaptureEvent, CaptureEventBody, HistoricIdentityLink, InMemoryHistoryStore,
    };

    async fn apply(store: &InMemoryHistoryStore, tag: &str, bodies: Vec<CaptureEventBody>) {
        let events: Vec<CaptureEvent> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| CaptureEvent {
                sequence: (i + 1) as u64,
                correlation_id: Id::from(tag),
                time: chrono::Utc::now(),
                body,
            })
            .collect();
        store
            .apply_events(&Id::from(format!("job-{tag}")), &events)
            .await
            .unwrap();
    }

    fn task_body(id: &str, assignee: Option<&str>, priority: i32) -> CaptureEventBody {
        let mut task = HistoricTaskInstance::created(id, "proc-1", chrono::Utc::now());
        task.assignee = assignee.map(str::to_string);
        task.priority = priority;
        CaptureEventBody::TaskCreated { task }
    }

    async fn seeded_store() -> Arc<InMemoryHistoryStore> {
        let store = Arc::new(InMemoryHistoryStore::new());
        apply(
            &store,
            "seed",
            vec![
                task_body("task-1", Some("kermit"), 50),
                task_body("task-2", Some("gonzo"), 80),
                task_body("task-3", None, 20),
                CaptureEventBody::VariableSet {
                    key: VariableScopeKey::task_local("proc-1", "task-1", "approved"),
                    value: VariableValue::from(true),
                    revision: 0,
                },
                CaptureEventBody::VariableSet {
                    key: VariableScopeKey::process("proc-1", "amount"),
                    value: VariableValue::from(300i64),
                    revision: 0,
                },
                CaptureEventBody::IdentityLinkAdded {
                    link: HistoricIdentityLink {
                        id: Id::from("link-1"),
                        process_instance_id: Id::from("proc-1"),
                        task_id: Some(Id::from("task-2")),
                        user_id: None,
                        group_id: Some("accounting".to_string()),
                        link_type: "candidate".to_string(),
                    },
                },
            ],
        )
        .await;
        store
    }

    #[tokio::test]
    async fn test_assignee_and_priority_filters() {
        let store = seeded_store().await;

        let actual = HistoricTaskInstanceQuery::new(store.clone())
            .task_assignee("kermit")
            .count()
            .await
            .unwrap();
        assert_eq!(actual, 1);

        let actual = HistoricTaskInstanceQuery::new(store.clone())
            .task_min_priority(50)
            .count()
            .await
            .unwrap();
        assert_eq!(actual, 2);

        let actual = HistoricTaskInstanceQuery::new(store)
            .task_unassigned()
            .single_result()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actual.entity.id, Id::from("task-3"));
    }

    #[tokio::test]
    async fn test_local_variable_filter_does_not_leak_across_tasks() {
        let store = seeded_store().await;

        let actual = HistoricTaskInstanceQuery::new(store)
            .task_variable_value_equals("approved", true)
            .unwrap()
            .list()
            .await
            .unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].entity.id, Id::from("task-1"));
    }

    #[tokio::test]
    async fn test_process_variable_filter_matches_all_scope_tasks() {
        let store = seeded_store().await;

        let actual = HistoricTaskInstanceQuery::new(store)
            .process_variable_value_equals("amount", 300i64)
            .unwrap()
            .count()
            .await
            .unwrap();
        // All three tasks belong to proc-1
        assert_eq!(actual, 3);
    }

    #[tokio::test]
    async fn test_candidate_group_joins_on_task_links() {
        let store = seeded_store().await;

        let actual = HistoricTaskInstanceQuery::new(store)
            .task_candidate_group("accounting")
            .single_result()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(actual.entity.id, Id::from("task-2"));
    }

    #[tokio::test]
    async fn test_hydration_merges_scopes_with_local_precedence() {
        let store = Arc::new(InMemoryHistoryStore::new());
        apply(
            &store,
            "merge",
            vec![
                task_body("task-1", None, 50),
                CaptureEventBody::VariableSet {
                    key: VariableScopeKey::process("proc-1", "status"),
                    value: VariableValue::from("global"),
                    revision: 0,
                },
                CaptureEventBody::VariableSet {
                    key: VariableScopeKey::task_local("proc-1", "task-1", "status"),
                    value: VariableValue::from("local"),
                    revision: 0,
                },
            ],
        )
        .await;

        let actual = HistoricTaskInstanceQuery::new(store)
            .include_process_variables()
            .include_task_local_variables()
            .single_result()
            .await
            .unwrap()
            .unwrap();
        let variables = actual.variables.unwrap();
        assert_eq!(variables["status"], VariableValue::from("local"));
    }

    #[tokio::test]
    async fn test_or_group_over_assignees() {
        let store = seeded_store().await;

        let actual = HistoricTaskInstanceQuery::new(store)
            .or()
            .unwrap()
            .task_assignee("kermit")
            .task_assignee("gonzo")
            .end_or()
            .unwrap()
            .order_by(TaskInstanceField::Priority)
            .asc()
            .list()
            .await
            .unwrap();
        let ids: Vec<&str> = actual.iter().map(|r| r.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["task-1", "task-2"]);
    }

    #[tokio::test]
    async fn test_process_instance_ids_validation_message() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let actual = HistoricTaskInstanceQuery::new(store)
            .process_instance_ids(Some(Vec::new()))
            .unwrap_err();
        assert_eq!(actual.to_string(), "Set of process instance ids is empty");
    }
}
