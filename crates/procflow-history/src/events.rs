//! Capture event vocabulary
//!
//! A capture event is a structured record of something that happened during
//! one unit of work, destined for the historic store. Events are stamped by
//! the capture session with a strictly increasing sequence number and a
//! shared correlation id (the id of the first event in the buffer), so one
//! unit of work can be reassembled and ordered even when its chunks are
//! processed by different workers.

use crate::entities::{
    HistoricActivityInstance, HistoricDetail, HistoricIdentityLink, HistoricProcessInstance,
    HistoricTaskInstance,
};
use crate::tasklog::NewTaskLogEntry;
use procflow_core::{CaptureCategory, DateTime, Id, VariableScopeKey, VariableValue};
use serde::{Deserialize, Serialize};

/// One stamped capture event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Strictly increasing within the originating capture session
    pub sequence: u64,
    /// Id of the first event of the unit of work
    pub correlation_id: Id,
    pub time: DateTime,
    pub body: CaptureEventBody,
}

/// Field updates for a live task projection. `None` means unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub owner: Option<String>,
    pub priority: Option<i32>,
    pub due_date: Option<DateTime>,
    pub claim_time: Option<DateTime>,
}

/// What happened, as a closed tagged variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureEventBody {
    ProcessInstanceStarted {
        instance: HistoricProcessInstance,
    },
    ProcessInstanceEnded {
        process_instance_id: Id,
        end_time: DateTime,
        end_activity_id: Option<String>,
        delete_reason: Option<String>,
        deleted: bool,
    },
    ActivityStarted {
        activity: HistoricActivityInstance,
    },
    ActivityEnded {
        activity_instance_id: Id,
        end_time: DateTime,
        delete_reason: Option<String>,
    },
    TaskCreated {
        task: HistoricTaskInstance,
    },
    TaskUpdated {
        task_id: Id,
        changes: TaskChanges,
    },
    TaskEnded {
        task_id: Id,
        end_time: DateTime,
        delete_reason: Option<String>,
        deleted: bool,
    },
    /// Current-value snapshot write; overwrites any live row at the same key
    VariableSet {
        key: VariableScopeKey,
        value: VariableValue,
        revision: i32,
    },
    VariableRemoved {
        key: VariableScopeKey,
    },
    /// Fine-grained update record, `Full` level only
    VariableDetail {
        detail: HistoricDetail,
    },
    IdentityLinkAdded {
        link: HistoricIdentityLink,
    },
    IdentityLinkRemoved {
        link_id: Id,
    },
    TaskLogEntryAdded {
        entry: NewTaskLogEntry,
    },
    TaskLogEntryDeleted {
        log_number: i64,
    },
    /// Terminal diagnostic emitted when the owning unit of work fails to
    /// commit; never persisted
    CommitFailed {
        message: String,
    },
}

impl CaptureEventBody {
    /// The capture category this body belongs to, or `None` for purely
    /// diagnostic bodies that are never persisted.
    pub fn category(&self) -> Option<CaptureCategory> {
        match self {
            CaptureEventBody::ProcessInstanceStarted { .. }
            | CaptureEventBody::ProcessInstanceEnded { .. } => {
                Some(CaptureCategory::ProcessInstance)
            }
            CaptureEventBody::ActivityStarted { .. } | CaptureEventBody::ActivityEnded { .. } => {
                Some(CaptureCategory::ActivityInstance)
            }
            CaptureEventBody::TaskCreated { .. }
            | CaptureEventBody::TaskUpdated { .. }
            | CaptureEventBody::TaskEnded { .. } => Some(CaptureCategory::TaskInstance),
            CaptureEventBody::VariableSet { .. } | CaptureEventBody::VariableRemoved { .. } => {
                Some(CaptureCategory::VariableInstance)
            }
            CaptureEventBody::VariableDetail { .. } => Some(CaptureCategory::VariableDetail),
            CaptureEventBody::IdentityLinkAdded { .. }
            | CaptureEventBody::IdentityLinkRemoved { .. } => Some(CaptureCategory::IdentityLink),
            CaptureEventBody::TaskLogEntryAdded { .. }
            | CaptureEventBody::TaskLogEntryDeleted { .. } => Some(CaptureCategory::TaskLog),
            CaptureEventBody::CommitFailed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_body_categories() {
        let fixture = CaptureEventBody::VariableSet {
            key: VariableScopeKey::process("proc-1", "amount"),
            value: VariableValue::from(1i64),
            revision: 0,
        };
        assert_eq!(fixture.category(), Some(CaptureCategory::VariableInstance));

        let fixture = CaptureEventBody::CommitFailed {
            message: "constraint violation".to_string(),
        };
        assert_eq!(fixture.category(), None);
    }

    #[test]
    fn test_event_serde_round_trip() {
        let fixture = CaptureEvent {
            sequence: 3,
            correlation_id: Id::from("evt-1"),
            time: chrono::Utc::now(),
            body: CaptureEventBody::TaskUpdated {
                task_id: Id::from("task-1"),
                changes: TaskChanges {
                    assignee: Some("gonzo".to_string()),
                    ..TaskChanges::default()
                },
            },
        };

        let json = serde_json::to_string(&fixture).unwrap();
        let back: CaptureEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fixture);
    }
}
