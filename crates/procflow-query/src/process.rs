//! Historic process instance queries

use crate::ast::{FieldOp, Predicate, VariableOperator, VariablePredicate};
use crate::builder::{require_id_set, BuilderCore};
use crate::engine::{self, QueryContext, QueryRow, Queryable};
use crate::error::{QueryError, Result};
use procflow_core::{DateTime, Id, VariableValue};
use procflow_history::{HistoricProcessInstance, HistoryStore};
use std::sync::Arc;

/// Orderable/filterable columns of a historic process instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessInstanceField {
    Id,
    ProcessDefinitionId,
    ProcessDefinitionKey,
    ProcessDefinitionName,
    ProcessDefinitionVersion,
    BusinessKey,
    StartTime,
    EndTime,
    DurationMs,
    StartUserId,
    Deleted,
    TenantId,
}

impl Queryable for HistoricProcessInstance {
    type Field = ProcessInstanceField;

    fn id(&self) -> &Id {
        &self.id
    }

    fn field_value(&self, field: ProcessInstanceField) -> Option<VariableValue> {
        match field {
            ProcessInstanceField::Id => Some(VariableValue::from(self.id.as_str())),
            ProcessInstanceField::ProcessDefinitionId => self
                .process_definition_id
                .as_ref()
                .map(|id| VariableValue::from(id.as_str())),
            ProcessInstanceField::ProcessDefinitionKey => self
                .process_definition_key
                .as_deref()
                .map(VariableValue::from),
            ProcessInstanceField::ProcessDefinitionName => self
                .process_definition_name
                .as_deref()
                .map(VariableValue::from),
            ProcessInstanceField::ProcessDefinitionVersion => self
                .process_definition_version
                .map(|v| VariableValue::from(i64::from(v))),
            ProcessInstanceField::BusinessKey => {
                self.business_key.as_deref().map(VariableValue::from)
            }
            ProcessInstanceField::StartTime => Some(VariableValue::from(self.start_time)),
            ProcessInstanceField::EndTime => self.end_time.map(VariableValue::from),
            ProcessInstanceField::DurationMs => self.duration_ms.map(VariableValue::from),
            ProcessInstanceField::StartUserId => {
                self.start_user_id.as_deref().map(VariableValue::from)
            }
            ProcessInstanceField::Deleted => Some(VariableValue::from(self.deleted)),
            ProcessInstanceField::TenantId => self.tenant_id.as_deref().map(VariableValue::from),
        }
    }

    fn process_instance_id(&self) -> &Id {
        &self.id
    }

    fn task_id(&self) -> Option<&Id> {
        None
    }
}

/// Fluent query over historic process instances. Filters accumulate as a
/// conjunction; `or()`/`end_or()` wrap a run of filters into one
/// disjunctive conjunct.
pub struct HistoricProcessInstanceQuery {
    store: Arc<dyn HistoryStore>,
    core: BuilderCore<ProcessInstanceField>,
}

impl std::fmt::Debug for HistoricProcessInstanceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoricProcessInstanceQuery")
            .finish_non_exhaustive()
    }
}

impl HistoricProcessInstanceQuery {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            core: BuilderCore::default(),
        }
    }

    // -- instance filters --------------------------------------------------

    pub fn process_instance_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            ProcessInstanceField::Id,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    /// Restrict to a set of instance ids. A missing or empty set is an
    /// input error, reported distinctly.
    pub fn process_instance_ids(mut self, ids: Option<Vec<Id>>) -> Result<Self> {
        let ids = require_id_set(ids, "process instance ids")?;
        self.core.field(ProcessInstanceField::Id, FieldOp::In(ids));
        Ok(self)
    }

    pub fn process_instance_business_key(mut self, business_key: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::BusinessKey,
            FieldOp::Equals(VariableValue::from(business_key.into())),
        );
        self
    }

    pub fn process_instance_business_key_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(ProcessInstanceField::BusinessKey, FieldOp::Like(pattern.into()));
        self
    }

    // -- definition filters ------------------------------------------------

    pub fn process_definition_id(mut self, id: impl Into<Id>) -> Self {
        self.core.field(
            ProcessInstanceField::ProcessDefinitionId,
            FieldOp::Equals(VariableValue::from(id.into().into_string())),
        );
        self
    }

    pub fn process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::ProcessDefinitionKey,
            FieldOp::Equals(VariableValue::from(key.into())),
        );
        self
    }

    pub fn process_definition_key_like(mut self, pattern: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::ProcessDefinitionKey,
            FieldOp::Like(pattern.into()),
        );
        self
    }

    pub fn process_definition_name(mut self, name: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::ProcessDefinitionName,
            FieldOp::Equals(VariableValue::from(name.into())),
        );
        self
    }

    pub fn process_definition_version(mut self, version: i32) -> Self {
        self.core.field(
            ProcessInstanceField::ProcessDefinitionVersion,
            FieldOp::Equals(VariableValue::from(i64::from(version))),
        );
        self
    }

    // -- lifecycle filters -------------------------------------------------

    pub fn started_by(mut self, user_id: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::StartUserId,
            FieldOp::Equals(VariableValue::from(user_id.into())),
        );
        self
    }

    pub fn started_before(mut self, time: DateTime) -> Self {
        self.core.field(
            ProcessInstanceField::StartTime,
            FieldOp::LessThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn started_after(mut self, time: DateTime) -> Self {
        self.core.field(
            ProcessInstanceField::StartTime,
            FieldOp::GreaterThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn finished_before(mut self, time: DateTime) -> Self {
        self.core.field(
            ProcessInstanceField::EndTime,
            FieldOp::LessThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    pub fn finished_after(mut self, time: DateTime) -> Self {
        self.core.field(
            ProcessInstanceField::EndTime,
            FieldOp::GreaterThanOrEqual(VariableValue::from(time)),
        );
        self
    }

    /// Only instances that have ended
    pub fn finished(mut self) -> Self {
        self.core
            .field(ProcessInstanceField::EndTime, FieldOp::IsNotNull);
        self
    }

    /// Only instances still running
    pub fn unfinished(mut self) -> Self {
        self.core
            .field(ProcessInstanceField::EndTime, FieldOp::IsNull);
        self
    }

    /// Only instances removed by deletion rather than normal completion
    pub fn deleted(mut self) -> Self {
        self.core.field(
            ProcessInstanceField::Deleted,
            FieldOp::Equals(VariableValue::from(true)),
        );
        self
    }

    pub fn not_deleted(mut self) -> Self {
        self.core.field(
            ProcessInstanceField::Deleted,
            FieldOp::Equals(VariableValue::from(false)),
        );
        self
    }

    /// The user appears in an identity link of the instance
    pub fn involved_user(mut self, user_id: impl Into<String>) -> Self {
        self.core.add(Predicate::InvolvedUser(user_id.into()));
        self
    }

    // -- tenant filters ----------------------------------------------------

    pub fn process_instance_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.core.field(
            ProcessInstanceField::TenantId,
            FieldOp::Equals(VariableValue::from(tenant_id.into())),
        );
        self
    }

    pub fn process_instance_tenant_id_like(mut self, pattern: impl Into<String>) -> Self {
        self.core
            .field(ProcessInstanceField::TenantId, FieldOp::Like(pattern.into()));
        self
    }

    pub fn process_instance_without_tenant_id(mut self) -> Self {
        self.core
            .field(ProcessInstanceField::TenantId, FieldOp::IsNull);
        self
    }

    // -- variable filters (process-global scope) ---------------------------

    pub fn variable_value_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(Some(name.into()), VariableOperator::Equals, Some(value.into()))
    }

    /// Match any variable of the instance with this value, regardless of
    /// name
    pub fn any_variable_value_equals(self, value: impl Into<VariableValue>) -> Result<Self> {
        self.variable(None, VariableOperator::Equals, Some(value.into()))
    }

    pub fn variable_value_not_equals(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::NotEquals,
            Some(value.into()),
        )
    }

    /// Case-insensitive string equality. Arguments are optional so a
    /// missing name or value can be reported as such.
    pub fn variable_value_equals_ignore_case(
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
        )
    }

    pub fn variable_value_not_equals_ignore_case(
        self,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<Self> {
        if name.is_none() {
            return Err(QueryError::illegal_argument("name is null"));
        }
        self.variable(
            name.map(str::to_string),
            VariableOperator::NotEqualsIgnoreCase,
            value.map(VariableValue::from),
        )
    }

    pub fn variable_value_like(
        self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::Like,
            Some(VariableValue::from(pattern.into())),
        )
    }

    pub fn variable_value_like_ignore_case(
        self,
        name: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::LikeIgnoreCase,
            Some(VariableValue::from(pattern.into())),
        )
    }

    pub fn variable_value_greater_than(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::GreaterThan,
            Some(value.into()),
        )
    }

    pub fn variable_value_greater_than_or_equal(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::GreaterThanOrEqual,
            Some(value.into()),
        )
    }

    pub fn variable_value_less_than(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::LessThan,
            Some(value.into()),
        )
    }

    pub fn variable_value_less_than_or_equal(
        self,
        name: impl Into<String>,
        value: impl Into<VariableValue>,
    ) -> Result<Self> {
        self.variable(
            Some(name.into()),
            VariableOperator::LessThanOrEqual,
            Some(value.into()),
        )
    }

    pub fn variable_exists(mut self, name: impl Into<String>) -> Self {
        self.core.add(Predicate::VariableExists {
            name: name.into(),
            local: false,
        });
        self
    }

    pub fn variable_not_exists(mut self, name: impl Into<String>) -> Self {
        self.core.add(Predicate::VariableNotExists {
            name: name.into(),
            local: false,
        });
        self
    }

    pub(crate) fn variable(
        mut self,
        name: Option<String>,
        operator: VariableOperator,
        value: Option<VariableValue>,
    ) -> Result<Self> {
        let predicate = VariablePredicate::new(name, operator, value, false)?;
        self.core.add(Predicate::Variable(predicate));
        Ok(self)
    }

    // -- composition -------------------------------------------------------

    /// Open an or-group: subsequent filters are alternatives until
    /// `end_or()`
    pub fn or(mut self) -> Result<Self> {
        self.core.begin_or()?;
        Ok(self)
    }

    pub fn end_or(mut self) -> Result<Self> {
        self.core.end_or()?;
        Ok(self)
    }

    // -- ordering and hydration --------------------------------------------

    pub fn order_by(mut self, field: ProcessInstanceField) -> Self {
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

    /// Attach each instance's process variables to the result rows
    pub fn include_process_variables(mut self) -> Self {
        self.core.include_process_variables = true;
        self
    }

    // -- execution ---------------------------------------------------------

    pub async fn list(&self) -> Result<Vec<QueryRow<HistoricProcessInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        Ok(self.hydrate_all(matched, &ctx))
    }

    /// Page of the full ordered result; out-of-range pages are empty
    pub async fn list_page(
        &self,
        first_result: usize,
        max_results: usize,
    ) -> Result<Vec<QueryRow<HistoricProcessInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        let paged = engine::page(matched, first_result, max_results);
        Ok(self.hydrate_all(paged, &ctx))
    }

    pub async fn count(&self) -> Result<usize> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        Ok(self.matched(&ctx).await?.len())
    }

    /// Exactly zero or one matching row; more than one is an error
    pub async fn single_result(&self) -> Result<Option<QueryRow<HistoricProcessInstance>>> {
        let ctx = QueryContext::load(self.store.as_ref()).await?;
        let matched = self.matched(&ctx).await?;
        let single = engine::single_result(matched)?;
        Ok(single.map(|e| engine::hydrate(e, &ctx, self.core.include_process_variables, false)))
    }

    async fn matched(&self, ctx: &QueryContext) -> Result<Vec<HistoricProcessInstance>> {
        let nodes = self.core.nodes()?;
        let entities = self.store.process_instances().await?;
        Ok(engine::evaluate(entities, nodes, &self.core.order, ctx))
    }

    fn hydrate_all(
        &self,
        rows: Vec<HistoricProcessInstance>,
        ctx: &QueryContext,
    ) -> Vec<QueryRow<HistoricProcessInstance>> {
        rows.into_iter()
            .map(|e| engine::hydrate(e, ctx, self.core.include_process_variables, false))
            .collect()
    }
}
