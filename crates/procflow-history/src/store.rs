//! The `HistoryStore` trait
//!
//! The store is the only thing the capture half and the query half share.
//! The pipeline writes through `apply_events`; the query engine and the
//! operator surface read and prune. Read paths never block on pending jobs:
//! they observe whatever has already been applied.

use crate::entities::{
    HistoricActivityInstance, HistoricDetail, HistoricIdentityLink, HistoricProcessInstance,
    HistoricTaskInstance,
};
use crate::events::CaptureEvent;
use crate::tasklog::HistoricTaskLogEntry;
use crate::variables::HistoricVariableInstance;
use async_trait::async_trait;
use procflow_core::{Id, Result};
use serde::{Deserialize, Serialize};

/// Row counts per table, mostly useful for level-policy assertions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub process_instances: usize,
    pub task_instances: usize,
    pub activity_instances: usize,
    pub variables: usize,
    pub details: usize,
    pub identity_links: usize,
    pub task_log_entries: usize,
}

/// Durable projection of process execution
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Apply one job's batch of capture events.
    ///
    /// Idempotent with respect to re-execution: a `job_id` that was already
    /// applied is skipped entirely, so a worker crash between apply and job
    /// deletion cannot double-apply.
    async fn apply_events(&self, job_id: &Id, events: &[CaptureEvent]) -> Result<()>;

    // -- read surface ------------------------------------------------------

    async fn process_instances(&self) -> Result<Vec<HistoricProcessInstance>>;
    async fn process_instance(&self, id: &Id) -> Result<Option<HistoricProcessInstance>>;
    async fn task_instances(&self) -> Result<Vec<HistoricTaskInstance>>;
    async fn task_instance(&self, id: &Id) -> Result<Option<HistoricTaskInstance>>;
    async fn activity_instances(&self) -> Result<Vec<HistoricActivityInstance>>;
    async fn variables(&self) -> Result<Vec<HistoricVariableInstance>>;

    /// All variables whose `scope_id` equals the given id, both
    /// process-global and task-local rows
    async fn variables_for_scope(&self, scope_id: &Id) -> Result<Vec<HistoricVariableInstance>>;

    async fn details(&self) -> Result<Vec<HistoricDetail>>;
    async fn identity_links(&self) -> Result<Vec<HistoricIdentityLink>>;

    /// Entries for one task, strictly ordered by `log_number`
    async fn task_log_entries(&self, task_id: &Id) -> Result<Vec<HistoricTaskLogEntry>>;

    async fn counts(&self) -> Result<StoreCounts>;

    // -- operator surface --------------------------------------------------

    /// Purge one historic process instance and everything attached to it
    async fn delete_process_instance(&self, id: &Id) -> Result<()>;

    /// Null the definition key/name/version on historic process instances of
    /// the given definition, leaving the rows themselves queryable. Used
    /// when a deployment is deleted without cascade.
    async fn clear_definition_references(&self, process_definition_id: &Id) -> Result<()>;

    /// Delete one task log entry; a missing `log_number` is a no-op
    async fn delete_task_log_entry(&self, log_number: i64) -> Result<()>;
}
