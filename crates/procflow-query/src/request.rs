//! Query request and response objects
//!
//! Wire-level counterparts of the fluent builders, for callers that arrive
//! as JSON. A request is deserialized, validated, and translated onto a
//! builder; unsupported operations and sort keys are input errors, not
//! silent drops.

use crate::ast::VariableOperator;
use crate::engine::QueryRow;
use crate::error::{QueryError, Result};
use crate::process::{HistoricProcessInstanceQuery, ProcessInstanceField};
use crate::task::{HistoricTaskInstanceQuery, TaskInstanceField};
use procflow_core::{DateTime, Id, Json, VariableValue};
use procflow_history::{HistoricProcessInstance, HistoricTaskInstance, HistoryStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Rows returned per page when the request does not say
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One variable comparison in a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVariable {
    /// Absent name means any variable; only valid with `equals`
    pub name: Option<String>,
    pub operation: String,
    pub value: Json,
    /// Match the task-local scope; only meaningful on task queries
    #[serde(default)]
    pub local: bool,
}

/// Paged result envelope
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse<T> {
    pub data: Vec<T>,
    /// Total matches before pagination
    pub total: usize,
    pub start: usize,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    pub order: String,
}

/// Query request for historic process instances
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricProcessInstanceQueryRequest {
    pub process_instance_id: Option<Id>,
    pub process_instance_ids: Option<Vec<Id>>,
    pub process_business_key: Option<String>,
    pub process_business_key_like: Option<String>,
    pub process_definition_id: Option<Id>,
    pub process_definition_key: Option<String>,
    pub process_definition_key_like: Option<String>,
    pub process_definition_name: Option<String>,
    pub started_by: Option<String>,
    pub started_before: Option<DateTime>,
    pub started_after: Option<DateTime>,
    pub finished_before: Option<DateTime>,
    pub finished_after: Option<DateTime>,
    pub finished: Option<bool>,
    pub deleted: Option<bool>,
    pub involved_user: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_id_like: Option<String>,
    #[serde(default)]
    pub without_tenant_id: bool,
    pub variables: Option<Vec<QueryVariable>>,
    /// Each inner list becomes one or-group of variable comparisons
    pub or_variables: Option<Vec<Vec<QueryVariable>>>,
    #[serde(default)]
    pub include_process_variables: bool,
    pub start: Option<usize>,
    pub size: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Query request for historic task instances
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricTaskInstanceQueryRequest {
    pub task_id: Option<Id>,
    pub process_instance_id: Option<Id>,
    pub process_instance_ids: Option<Vec<Id>>,
    pub process_definition_id: Option<Id>,
    pub execution_id: Option<Id>,
    pub task_name: Option<String>,
    pub task_name_like: Option<String>,
    pub task_description_like: Option<String>,
    pub task_assignee: Option<String>,
    pub task_assignee_like: Option<String>,
    pub task_owner: Option<String>,
    pub task_priority: Option<i32>,
    pub task_min_priority: Option<i32>,
    pub task_max_priority: Option<i32>,
    pub due_date_before: Option<DateTime>,
    pub due_date_after: Option<DateTime>,
    pub task_created_before: Option<DateTime>,
    pub task_created_after: Option<DateTime>,
    pub finished: Option<bool>,
    pub task_involved_user: Option<String>,
    pub task_candidate_group: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_id_like: Option<String>,
    #[serde(default)]
    pub without_tenant_id: bool,
    pub task_variables: Option<Vec<QueryVariable>>,
    pub process_variables: Option<Vec<QueryVariable>>,
    /// Each inner list becomes one or-group; entries with `local` set hit
    /// the task-local scope
    pub or_variables: Option<Vec<Vec<QueryVariable>>>,
    #[serde(default)]
    pub include_process_variables: bool,
    #[serde(default)]
    pub include_task_local_variables: bool,
    pub start: Option<usize>,
    pub size: Option<usize>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Run a process instance request against the store
pub async fn query_historic_process_instances(
    store: Arc<dyn HistoryStore>,
    request: &HistoricProcessInstanceQueryRequest,
) -> Result<DataResponse<QueryRow<HistoricProcessInstance>>> {
    let mut query = HistoricProcessInstanceQuery::new(store);

    if let Some(id) = &request.process_instance_id {
        query = query.process_instance_id(id.clone());
    }
    if let Some(ids) = &request.process_instance_ids {
        query = query.process_instance_ids(Some(ids.clone()))?;
    }
    if let Some(key) = &request.process_business_key {
        query = query.process_instance_business_key(key.clone());
    }
    if let Some(pattern) = &request.process_business_key_like {
        query = query.process_instance_business_key_like(pattern.clone());
    }
    if let Some(id) = &request.process_definition_id {
        query = query.process_definition_id(id.clone());
    }
    if let Some(key) = &request.process_definition_key {
        query = query.process_definition_key(key.clone());
    }
    if let Some(pattern) = &request.process_definition_key_like {
        query = query.process_definition_key_like(pattern.clone());
    }
    if let Some(name) = &request.process_definition_name {
        query = query.process_definition_name(name.clone());
    }
    if let Some(user) = &request.started_by {
        query = query.started_by(user.clone());
    }
    if let Some(time) = request.started_before {
        query = query.started_before(time);
    }
    if let Some(time) = request.started_after {
        query = query.started_after(time);
    }
    if let Some(time) = request.finished_before {
        query = query.finished_before(time);
    }
    if let Some(time) = request.finished_after {
        query = query.finished_after(time);
    }
    match request.finished {
        Some(true) => query = query.finished(),
        Some(false) => query = query.unfinished(),
        None => {}
    }
    match request.deleted {
        Some(true) => query = query.deleted(),
        Some(false) => query = query.not_deleted(),
        None => {}
    }
    if let Some(user) = &request.involved_user {
        query = query.involved_user(user.clone());
    }
    if let Some(tenant) = &request.tenant_id {
        query = query.process_instance_tenant_id(tenant.clone());
    }
    if let Some(pattern) = &request.tenant_id_like {
        query = query.process_instance_tenant_id_like(pattern.clone());
    }
    if request.without_tenant_id {
        query = query.process_instance_without_tenant_id();
    }
    if let Some(variables) = &request.variables {
        for variable in variables {
            let (name, operator, value) = translate_variable(variable)?;
            query = query.variable(name, operator, value)?;
        }
    }
    if let Some(groups) = &request.or_variables {
        for group in groups {
            query = query.or()?;
            for variable in group {
                let (name, operator, value) = translate_variable(variable)?;
                query = query.variable(name, operator, value)?;
            }
            query = query.end_or()?;
        }
    }
    if request.include_process_variables {
        query = query.include_process_variables();
    }
    if let Some(sort) = &request.sort {
        query = query.order_by(parse_process_sort(sort)?);
    }
    query = match request.order.as_deref() {
        None => query,
        Some(order) => {
            if parse_order(order)? {
                query.asc()
            } else {
                query.desc()
            }
        }
    };

    let total = query.count().await?;
    let start = request.start.unwrap_or(0);
    let size = request.size.unwrap_or(DEFAULT_PAGE_SIZE);
    let data = query.list_page(start, size).await?;
    debug!(
        "Historic process instance query matched {total} row(s), returning {}",
        data.len()
    );

    Ok(DataResponse {
        data,
        total,
        start,
        size,
        sort: request.sort.clone(),
        order: request.order.clone().unwrap_or_else(|| "asc".to_string()),
    })
}

/// Run a task instance request against the store
pub async fn query_historic_task_instances(
    store: Arc<dyn HistoryStore>,
    request: &HistoricTaskInstanceQueryRequest,
) -> Result<DataResponse<QueryRow<HistoricTaskInstance>>> {
    let mut query = HistoricTaskInstanceQuery::new(store);

    if let Some(id) = &request.task_id {
        query = query.task_id(id.clone());
    }
    if let Some(id) = &request.process_instance_id {
        query = query.process_instance_id(id.clone());
    }
    if let Some(ids) = &request.process_instance_ids {
        query = query.process_instance_ids(Some(ids.clone()))?;
    }
    if let Some(id) = &request.process_definition_id {
        query = query.process_definition_id(id.clone());
    }
    if let Some(id) = &request.execution_id {
        query = query.execution_id(id.clone());
    }
    if let Some(name) = &request.task_name {
        query = query.task_name(name.clone());
    }
    if let Some(pattern) = &request.task_name_like {
        query = query.task_name_like(pattern.clone());
    }
    if let Some(pattern) = &request.task_description_like {
        query = query.task_description_like(pattern.clone());
    }
    if let Some(assignee) = &request.task_assignee {
        query = query.task_assignee(assignee.clone());
    }
    if let Some(pattern) = &request.task_assignee_like {
        query = query.task_assignee_like(pattern.clone());
    }
    if let Some(owner) = &request.task_owner {
        query = query.task_owner(owner.clone());
    }
    if let Some(priority) = request.task_priority {
        query = query.task_priority(priority);
    }
    if let Some(priority) = request.task_min_priority {
        query = query.task_min_priority(priority);
    }
    if let Some(priority) = request.task_max_priority {
        query = query.task_max_priority(priority);
    }
    if let Some(time) = request.due_date_before {
        query = query.task_due_before(time);
    }
    if let Some(time) = request.due_date_after {
        query = query.task_due_after(time);
    }
    if let Some(time) = request.task_created_before {
        query = query.task_created_before(time);
    }
    if let Some(time) = request.task_created_after {
        query = query.task_created_after(time);
    }
    match request.finished {
        Some(true) => query = query.finished(),
        Some(false) => query = query.unfinished(),
        None => {}
    }
    if let Some(user) = &request.task_involved_user {
        query = query.task_involved_user(user.clone());
    }
    if let Some(group) = &request.task_candidate_group {
        query = query.task_candidate_group(group.clone());
    }
    if let Some(tenant) = &request.tenant_id {
        query = query.task_tenant_id(tenant.clone());
    }
    if let Some(pattern) = &request.tenant_id_like {
        query = query.task_tenant_id_like(pattern.clone());
    }
    if request.without_tenant_id {
        query = query.task_without_tenant_id();
    }
    if let Some(variables) = &request.task_variables {
        for variable in variables {
            let (name, operator, value) = translate_variable(variable)?;
            query = query.variable(name, operator, value, true)?;
        }
    }
    if let Some(variables) = &request.process_variables {
        for variable in variables {
            let (name, operator, value) = translate_variable(variable)?;
            query = query.variable(name, operator, value, false)?;
        }
    }
    if let Some(groups) = &request.or_variables {
        for group in groups {
            query = query.or()?;
            for variable in group {
                let (name, operator, value) = translate_variable(variable)?;
                query = query.variable(name, operator, value, variable.local)?;
            }
            query = query.end_or()?;
        }
    }
    if request.include_process_variables {
        query = query.include_process_variables();
    }
    if request.include_task_local_variables {
        query = query.include_task_local_variables();
    }
    if let Some(sort) = &request.sort {
        query = query.order_by(parse_task_sort(sort)?);
    }
    query = match request.order.as_deref() {
        None => query,
        Some(order) => {
            if parse_order(order)? {
                query.asc()
            } else {
                query.desc()
            }
        }
    };

    let total = query.count().await?;
    let start = request.start.unwrap_or(0);
    let size = request.size.unwrap_or(DEFAULT_PAGE_SIZE);
    let data = query.list_page(start, size).await?;
    debug!(
        "Historic task instance query matched {total} row(s), returning {}",
        data.len()
    );

    Ok(DataResponse {
        data,
        total,
        start,
        size,
        sort: request.sort.clone(),
        order: request.order.clone().unwrap_or_else(|| "asc".to_string()),
    })
}

fn translate_variable(
    variable: &QueryVariable,
) -> Result<(Option<String>, VariableOperator, Option<VariableValue>)> {
    let operator = parse_operation(&variable.operation)?;
    let value = parse_value(&variable.value)?;
    Ok((variable.name.clone(), operator, value))
}

fn parse_operation(operation: &str) -> Result<VariableOperator> {
    match operation {
        "equals" => Ok(VariableOperator::Equals),
        "notEquals" => Ok(VariableOperator::NotEquals),
        "equalsIgnoreCase" => Ok(VariableOperator::EqualsIgnoreCase),
        "notEqualsIgnoreCase" => Ok(VariableOperator::NotEqualsIgnoreCase),
        "like" => Ok(VariableOperator::Like),
        "likeIgnoreCase" => Ok(VariableOperator::LikeIgnoreCase),
        "greaterThan" => Ok(VariableOperator::GreaterThan),
        "greaterThanOrEquals" => Ok(VariableOperator::GreaterThanOrEqual),
        "lessThan" => Ok(VariableOperator::LessThan),
        "lessThanOrEquals" => Ok(VariableOperator::LessThanOrEqual),
        other => Err(QueryError::illegal_argument(format!(
            "Unsupported variable comparison operation: {other}"
        ))),
    }
}

/// JSON null maps to an absent value so the builder can report "value is
/// null"; containers have no variable representation
fn parse_value(value: &Json) -> Result<Option<VariableValue>> {
    match value {
        Json::Null => Ok(None),
        Json::Bool(b) => Ok(Some(VariableValue::from(*b))),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Some(VariableValue::from(v)))
            } else if let Some(v) = n.as_f64() {
                Ok(Some(VariableValue::from(v)))
            } else {
                Err(QueryError::illegal_argument(format!(
                    "Unsupported variable value: {n}"
                )))
            }
        }
        Json::String(s) => Ok(Some(VariableValue::from(s.as_str()))),
        Json::Array(_) | Json::Object(_) => Err(QueryError::illegal_argument(
            "Unsupported variable value type",
        )),
    }
}

fn parse_process_sort(sort: &str) -> Result<ProcessInstanceField> {
    match sort {
        "processInstanceId" => Ok(ProcessInstanceField::Id),
        "processDefinitionId" => Ok(ProcessInstanceField::ProcessDefinitionId),
        "businessKey" => Ok(ProcessInstanceField::BusinessKey),
        "startTime" => Ok(ProcessInstanceField::StartTime),
        "endTime" => Ok(ProcessInstanceField::EndTime),
        "duration" => Ok(ProcessInstanceField::DurationMs),
        "tenantId" => Ok(ProcessInstanceField::TenantId),
        other => Err(QueryError::illegal_argument(format!(
            "Invalid sort value: {other}"
        ))),
    }
}

fn parse_task_sort(sort: &str) -> Result<TaskInstanceField> {
    match sort {
        "taskInstanceId" => Ok(TaskInstanceField::Id),
        "processInstanceId" => Ok(TaskInstanceField::ProcessInstanceId),
        "name" => Ok(TaskInstanceField::Name),
        "assignee" => Ok(TaskInstanceField::Assignee),
        "owner" => Ok(TaskInstanceField::Owner),
        "priority" => Ok(TaskInstanceField::Priority),
        "dueDate" => Ok(TaskInstanceField::DueDate),
        "startTime" => Ok(TaskInstanceField::CreateTime),
        "endTime" => Ok(TaskInstanceField::EndTime),
        "duration" => Ok(TaskInstanceField::DurationMs),
        "tenantId" => Ok(TaskInstanceField::TenantId),
        other => Err(QueryError::illegal_argument(format!(
            "Invalid sort value: {other}"
        ))),
    }
}

/// `true` for ascending
fn parse_order(order: &str) -> Result<bool> {
    match order {
        "asc" => Ok(true),
        "desc" => Ok(false),
        other => Err(QueryError::illegal_argument(format!(
            "Invalid order value: {other}"
        ))),
    }
}
