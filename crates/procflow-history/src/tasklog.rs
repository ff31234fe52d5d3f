//! Task log entries
//!
//! Append-only events attached to a task. `log_number` is assigned by the
//! store from a single monotonically increasing counter, so entries are
//! strictly ordered and globally unique. Entries are never overwritten; the
//! only mutation is whole-entry deletion addressed by `log_number`.

use derive_setters::Setters;
use procflow_core::{DateTime, Id, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of task log entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskLogEntryType {
    Created,
    AssigneeChanged,
    OwnerChanged,
    PriorityChanged,
    DueDateChanged,
    Suspended,
    Activated,
    Completed,
    /// User-defined entry type
    Custom(String),
}

impl fmt::Display for TaskLogEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskLogEntryType::Created => write!(f, "USER_TASK_CREATED"),
            TaskLogEntryType::AssigneeChanged => write!(f, "USER_TASK_ASSIGNEE_CHANGED"),
            TaskLogEntryType::OwnerChanged => write!(f, "USER_TASK_OWNER_CHANGED"),
            TaskLogEntryType::PriorityChanged => write!(f, "USER_TASK_PRIORITY_CHANGED"),
            TaskLogEntryType::DueDateChanged => write!(f, "USER_TASK_DUEDATE_CHANGED"),
            TaskLogEntryType::Suspended => write!(f, "USER_TASK_SUSPENSIONSTATE_CHANGED"),
            TaskLogEntryType::Activated => write!(f, "USER_TASK_ACTIVATED"),
            TaskLogEntryType::Completed => write!(f, "USER_TASK_COMPLETED"),
            TaskLogEntryType::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A task log entry as captured, before the store assigns its log number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct NewTaskLogEntry {
    pub task_id: Id,
    pub process_instance_id: Option<Id>,
    pub execution_id: Option<Id>,
    pub entry_type: TaskLogEntryType,
    pub time: DateTime,
    pub user_id: Option<String>,
    /// Opaque payload, interpreted only by consumers
    pub data: Option<Json>,
}

impl NewTaskLogEntry {
    /// Create an entry for a task
    pub fn new(task_id: impl Into<Id>, entry_type: TaskLogEntryType, time: DateTime) -> Self {
        Self {
            task_id: task_id.into(),
            process_instance_id: None,
            execution_id: None,
            entry_type,
            time,
            user_id: None,
            data: None,
        }
    }
}

/// A durable task log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricTaskLogEntry {
    /// Strictly increasing, globally unique ordering key
    pub log_number: i64,
    pub task_id: Id,
    pub process_instance_id: Option<Id>,
    pub execution_id: Option<Id>,
    pub entry_type: TaskLogEntryType,
    pub time: DateTime,
    pub user_id: Option<String>,
    pub data: Option<Json>,
}

impl HistoricTaskLogEntry {
    /// Materialize a captured entry with its assigned log number
    pub fn from_new(log_number: i64, entry: NewTaskLogEntry) -> Self {
        Self {
            log_number,
            task_id: entry.task_id,
            process_instance_id: entry.process_instance_id,
            execution_id: entry.execution_id,
            entry_type: entry.entry_type,
            time: entry.time,
            user_id: entry.user_id,
            data: entry.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_type_display() {
        let fixture = TaskLogEntryType::AssigneeChanged;
        let actual = fixture.to_string();
        let expected = "USER_TASK_ASSIGNEE_CHANGED";
        assert_eq!(actual, expected);

        let fixture = TaskLogEntryType::Custom("ESCALATED".to_string());
        assert_eq!(fixture.to_string(), "ESCALATED");
    }

    #[test]
    fn test_from_new_carries_fields() {
        let now = chrono::Utc::now();
        let fixture = NewTaskLogEntry::new("task-1", TaskLogEntryType::Created, now)
            .process_instance_id("proc-1")
            .user_id("kermit")
            .data(serde_json::json!({"assignee": "gonzo"}));

        let actual = HistoricTaskLogEntry::from_new(7, fixture);

        assert_eq!(actual.log_number, 7);
        assert_eq!(actual.task_id, Id::from("task-1"));
        assert_eq!(actual.user_id.as_deref(), Some("kermit"));
        assert_eq!(actual.entry_type, TaskLogEntryType::Created);
    }
}
