//! Task log queries
//!
//! The log is append-only and addressed by `log_number`, so this query is a
//! plain ordered scan with range filters rather than an AST evaluation.

use crate::engine;
use crate::error::Result;
use procflow_core::Id;
use procflow_history::{HistoricTaskLogEntry, HistoryStore, TaskLogEntryType};
use std::sync::Arc;

/// Query over one task's log entries, always ordered by `log_number`
pub struct TaskLogEntryQuery {
    store: Arc<dyn HistoryStore>,
    task_id: Id,
    entry_type: Option<TaskLogEntryType>,
    user_id: Option<String>,
    from_log_number: Option<i64>,
    to_log_number: Option<i64>,
}

impl TaskLogEntryQuery {
    pub fn new(store: Arc<dyn HistoryStore>, task_id: impl Into<Id>) -> Self {
        Self {
            store,
            task_id: task_id.into(),
            entry_type: None,
            user_id: None,
            from_log_number: None,
            to_log_number: None,
        }
    }

    pub fn entry_type(mut self, entry_type: TaskLogEntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Lower bound, inclusive
    pub fn from_log_number(mut self, log_number: i64) -> Self {
        self.from_log_number = Some(log_number);
        self
    }

    /// Upper bound, inclusive
    pub fn to_log_number(mut self, log_number: i64) -> Self {
        self.to_log_number = Some(log_number);
        self
    }

    pub async fn list(&self) -> Result<Vec<HistoricTaskLogEntry>> {
        let entries = self.store.task_log_entries(&self.task_id).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .collect())
    }

    pub async fn list_page(
        &self,
        first_result: usize,
        max_results: usize,
    ) -> Result<Vec<HistoricTaskLogEntry>> {
        Ok(engine::page(self.list().await?, first_result, max_results))
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    fn matches(&self, entry: &HistoricTaskLogEntry) -> bool {
        if let Some(entry_type) = &self.entry_type {
            if &entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(user_id) = &self.user_id {
            if entry.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(from) = self.from_log_number {
            if entry.log_number < from {
                return false;
            }
        }
        if let Some(to) = self.to_log_number {
            if entry.log_number > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use procflow_history::{CaptureEvent, CaptureEventBody, InMemoryHistoryStore, NewTaskLogEntry};

    async fn seed(store: &InMemoryHistoryStore) {
        let now = chrono::Utc::now();
        let bodies = vec![
            CaptureEventBody::TaskLogEntryAdded {
                entry: NewTaskLogEntry::new("task-1", TaskLogEntryType::Created, now),
            },
            CaptureEventBody::TaskLogEntryAdded {
                entry: NewTaskLogEntry::new("task-1", TaskLogEntryType::AssigneeChanged, now)
                    .user_id("kermit"),
            },
            CaptureEventBody::TaskLogEntryAdded {
                entry: NewTaskLogEntry::new("task-1", TaskLogEntryType::Completed, now)
                    .user_id("gonzo"),
            },
            CaptureEventBody::TaskLogEntryAdded {
                entry: NewTaskLogEntry::new("task-2", TaskLogEntryType::Created, now),
            },
        ];
        let events: Vec<CaptureEvent> = bodies
            .into_iter()
            .enumerate()
            .map(|(i, body)| CaptureEvent {
                sequence: (i + 1) as u64,
                correlation_id: Id::from("corr-1"),
                time: now,
                body,
            })
            .collect();
        store.apply_events(&Id::from("job-log"), &events).await.unwrap();
    }

    #[tokio::test]
    async fn test_entries_come_back_ordered() {
        let store = Arc::new(InMemoryHistoryStore::new());
        seed(&store).await;

        let actual = TaskLogEntryQuery::new(store, "task-1").list().await.unwrap();
        let numbers: Vec<i64> = actual.iter().map(|e| e.log_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_filters_and_range() {
        let store = Arc::new(InMemoryHistoryStore::new());
        seed(&store).await;

        let actual = TaskLogEntryQuery::new(store.clone(), "task-1")
            .user_id("kermit")
            .list()
            .await
            .unwrap();
        assert_eq!(actual.len(), 1);
        assert_eq!(actual[0].entry_type, TaskLogEntryType::AssigneeChanged);

        let actual = TaskLogEntryQuery::new(store, "task-1")
            .from_log_number(2)
            .to_log_number(3)
            .count()
            .await
            .unwrap();
        assert_eq!(actual, 2);
    }

    #[tokio::test]
    async fn test_paging_is_bounds_safe() {
        let store = Arc::new(InMemoryHistoryStore::new());
        seed(&store).await;

        let actual = TaskLogEntryQuery::new(store.clone(), "task-1")
            .list_page(1, 5)
            .await
            .unwrap();
        assert_eq!(actual.len(), 2);

        let actual = TaskLogEntryQuery::new(store, "task-1")
            .list_page(10, 5)
            .await
            .unwrap();
        assert!(actual.is_empty());
    }
}
