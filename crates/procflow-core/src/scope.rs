//! Variable scope addressing
//!
//! Variables live in an entity-attribute-value layout keyed by scope and
//! name. The invariant is at most one live record per key; a later capture
//! at the same key overwrites the value in place.

use crate::Id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of scope a variable is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeType {
    /// Process-global variable
    ProcessInstance,
    /// Task-local variable
    Task,
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeType::ProcessInstance => write!(f, "processInstance"),
            ScopeType::Task => write!(f, "task"),
        }
    }
}

/// Unique key of one variable row: `(scope_id, scope_type, task_id?, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableScopeKey {
    pub scope_id: Id,
    pub scope_type: ScopeType,
    pub task_id: Option<Id>,
    pub name: String,
}

impl VariableScopeKey {
    /// Key for a process-global variable
    pub fn process(scope_id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            scope_type: ScopeType::ProcessInstance,
            task_id: None,
            name: name.into(),
        }
    }

    /// Key for a task-local variable
    pub fn task_local(
        scope_id: impl Into<Id>,
        task_id: impl Into<Id>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            scope_id: scope_id.into(),
            scope_type: ScopeType::Task,
            task_id: Some(task_id.into()),
            name: name.into(),
        }
    }

    /// Whether this key addresses a task-local variable
    pub fn is_task_local(&self) -> bool {
        self.scope_type == ScopeType::Task
    }
}
