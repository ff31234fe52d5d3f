//! Historic variable instances
//!
//! One live row per `(scope_id, scope_type, task_id?, name)` key. A later
//! capture at the same key overwrites the value in place: this is a
//! current-value snapshot, not a log (the log lives in `HistoricDetail`).

use derive_setters::Setters;
use procflow_core::{DateTime, Id, ScopeType, VariableScopeKey, VariableValue};
use serde::{Deserialize, Serialize};

/// Current-value snapshot of one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoricVariableInstance {
    pub id: Id,
    pub key: VariableScopeKey,
    pub value: VariableValue,
    /// Revision of the originating runtime variable
    pub revision: i32,
    pub create_time: DateTime,
    pub last_updated_time: DateTime,
}

impl HistoricVariableInstance {
    /// Create a snapshot for a key that has no live row yet
    pub fn new(key: VariableScopeKey, value: VariableValue, time: DateTime) -> Self {
        Self {
            id: procflow_core::new_id_with_prefix("hvar"),
            key,
            value,
            revision: 0,
            create_time: time,
            last_updated_time: time,
        }
    }

    /// Overwrite the value in place, bumping revision and update time
    pub fn overwrite(&mut self, value: VariableValue, revision: i32, time: DateTime) {
        self.value = value;
        self.revision = revision;
        self.last_updated_time = time;
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Owning scope id (the process instance for global variables)
    pub fn scope_id(&self) -> &Id {
        &self.key.scope_id
    }

    /// Whether this row is task-local
    pub fn is_task_local(&self) -> bool {
        self.key.scope_type == ScopeType::Task
    }
}
