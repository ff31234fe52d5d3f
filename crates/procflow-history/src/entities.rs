//! Historic entity projections
//!
//! These records are the durable projection of process execution. They are
//! mutated in place while the originating scope is active and become
//! immutable once ended; an operator purge is the only removal path.

use derive_setters::Setters;
use procflow_core::{DateTime, Id, VariableValue};
use serde::{Deserialize, Serialize};

/// Historic projection of one process instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricProcessInstance {
    /// Surrogate id, equal to the runtime process instance id
    pub id: Id,
    /// Originating definition linkage, nullable once the definition is removed
    pub process_definition_id: Option<Id>,
    pub process_definition_key: Option<String>,
    pub process_definition_name: Option<String>,
    pub process_definition_version: Option<i32>,
    /// Caller-assigned business key
    pub business_key: Option<String>,
    pub start_time: DateTime,
    pub end_time: Option<DateTime>,
    pub duration_ms: Option<i64>,
    pub start_user_id: Option<String>,
    pub start_activity_id: Option<String>,
    pub end_activity_id: Option<String>,
    /// Free-text reason recorded when the instance was deleted
    pub delete_reason: Option<String>,
    /// Distinct from normal completion
    pub deleted: bool,
    pub tenant_id: Option<String>,
}

impl HistoricProcessInstance {
    /// Create the projection for a freshly started process instance
    pub fn started(id: impl Into<Id>, start_time: DateTime) -> Self {
        Self {
            id: id.into(),
            process_definition_id: None,
            process_definition_key: None,
            process_definition_name: None,
            process_definition_version: None,
            business_key: None,
            start_time,
            end_time: None,
            duration_ms: None,
            start_user_id: None,
            start_activity_id: None,
            end_activity_id: None,
            delete_reason: None,
            deleted: false,
            tenant_id: None,
        }
    }

    /// Finalize the projection: end time and duration are set exactly once
    pub fn mark_ended(&mut self, end_time: DateTime) {
        self.end_time = Some(end_time);
        self.duration_ms = Some((end_time - self.start_time).num_milliseconds());
    }

    /// Whether the scope has ended
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Historic projection of one user task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricTaskInstance {
    pub id: Id,
    pub process_instance_id: Id,
    pub execution_id: Option<Id>,
    pub process_definition_id: Option<Id>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub owner: Option<String>,
    pub priority: i32,
    pub due_date: Option<DateTime>,
    pub claim_time: Option<DateTime>,
    pub create_time: DateTime,
    pub end_time: Option<DateTime>,
    pub duration_ms: Option<i64>,
    pub delete_reason: Option<String>,
    pub deleted: bool,
    pub tenant_id: Option<String>,
}

impl HistoricTaskInstance {
    /// Create the projection for a freshly created task
    pub fn created(
        id: impl Into<Id>,
        process_instance_id: impl Into<Id>,
        create_time: DateTime,
    ) -> Self {
        Self {
            id: id.into(),
            process_instance_id: process_instance_id.into(),
            execution_id: None,
            process_definition_id: None,
            name: None,
            description: None,
            assignee: None,
            owner: None,
            priority: 50,
            due_date: None,
            claim_time: None,
            create_time,
            end_time: None,
            duration_ms: None,
            delete_reason: None,
            deleted: false,
            tenant_id: None,
        }
    }

    /// Finalize the projection
    pub fn mark_ended(&mut self, end_time: DateTime) {
        self.end_time = Some(end_time);
        self.duration_ms = Some((end_time - self.create_time).num_milliseconds());
    }

    /// Whether the task has ended
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Historic projection of one activity execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricActivityInstance {
    pub id: Id,
    /// Id of the activity in the process model
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub activity_type: String,
    pub process_instance_id: Id,
    pub execution_id: Option<Id>,
    pub process_definition_id: Option<Id>,
    pub assignee: Option<String>,
    pub start_time: DateTime,
    pub end_time: Option<DateTime>,
    pub duration_ms: Option<i64>,
    pub delete_reason: Option<String>,
    pub tenant_id: Option<String>,
}

impl HistoricActivityInstance {
    /// Create the projection for an activity that just started
    pub fn started(
        id: impl Into<Id>,
        activity_id: impl Into<String>,
        activity_type: impl Into<String>,
        process_instance_id: impl Into<Id>,
        start_time: DateTime,
    ) -> Self {
        Self {
            id: id.into(),
            activity_id: activity_id.into(),
            activity_name: None,
            activity_type: activity_type.into(),
            process_instance_id: process_instance_id.into(),
            execution_id: None,
            process_definition_id: None,
            assignee: None,
            start_time,
            end_time: None,
            duration_ms: None,
            delete_reason: None,
            tenant_id: None,
        }
    }

    /// Finalize the projection
    pub fn mark_ended(&mut self, end_time: DateTime) {
        self.end_time = Some(end_time);
        self.duration_ms = Some((end_time - self.start_time).num_milliseconds());
    }

    /// Whether the activity has ended
    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Fine-grained variable-update record, captured only at `Full` level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricDetail {
    pub id: Id,
    pub process_instance_id: Id,
    pub execution_id: Option<Id>,
    pub task_id: Option<Id>,
    pub name: String,
    pub value: VariableValue,
    pub revision: i32,
    pub time: DateTime,
}

/// Involvement record backing identity-link predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricIdentityLink {
    pub id: Id,
    pub process_instance_id: Id,
    pub task_id: Option<Id>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    /// Link kind, e.g. `participant`, `candidate`, `assignee`
    pub link_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_process_instance_lifecycle() {
        let start = chrono::Utc::now();
        let mut fixture = HistoricProcessInstance::started("proc-1", start)
            .process_definition_key("invoice")
            .process_definition_version(3)
            .start_user_id("kermit");

        assert!(!fixture.is_finished());
        assert_eq!(fixture.duration_ms, None);

        let end = start + chrono::Duration::milliseconds(1500);
        fixture.mark_ended(end);

        assert!(fixture.is_finished());
        assert_eq!(fixture.duration_ms, Some(1500));
        assert_eq!(fixture.end_time, Some(end));
        assert!(!fixture.deleted);
    }

    #[test]
    fn test_task_instance_defaults() {
        let fixture = HistoricTaskInstance::created("task-1", "proc-1", chrono::Utc::now());
        assert_eq!(fixture.priority, 50);
        assert_eq!(fixture.assignee, None);
        assert!(!fixture.is_finished());
    }

    #[test]
    fn test_activity_duration() {
        let start = chrono::Utc::now();
        let mut fixture =
            HistoricActivityInstance::started("ai-1", "reviewTask", "userTask", "proc-1", start);
        fixture.mark_ended(start + chrono::Duration::milliseconds(250));
        assert_eq!(fixture.duration_ms, Some(250));
    }

    #[test]
    fn test_setters_are_chainable() {
        let fixture = HistoricTaskInstance::created("task-1", "proc-1", chrono::Utc::now())
            .assignee("gonzo")
            .owner("kermit")
            .priority(80)
            .tenant_id("acme");

        assert_eq!(fixture.assignee.as_deref(), Some("gonzo"));
        assert_eq!(fixture.owner.as_deref(), Some("kermit"));
        assert_eq!(fixture.priority, 80);
        assert_eq!(fixture.tenant_id.as_deref(), Some("acme"));
    }
}
