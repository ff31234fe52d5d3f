//! In-memory history store
//!
//! Reference implementation of [`HistoryStore`] over `tokio::sync::RwLock`.
//! All mutations of one job happen under a single write-lock section
//! together with the applied-job bookkeeping, which is what makes
//! `apply_events` idempotent.

use crate::entities::{
    HistoricActivityInstance, HistoricDetail, HistoricIdentityLink, HistoricProcessInstance,
    HistoricTaskInstance,
};
use crate::events::{CaptureEvent, CaptureEventBody};
use crate::store::{HistoryStore, StoreCounts};
use crate::tasklog::HistoricTaskLogEntry;
use crate::variables::HistoricVariableInstance;
use async_trait::async_trait;
use procflow_core::{Id, Result, VariableScopeKey};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

#[derive(Default)]
struct StoreInner {
    process_instances: HashMap<Id, HistoricProcessInstance>,
    task_instances: HashMap<Id, HistoricTaskInstance>,
    activity_instances: HashMap<Id, HistoricActivityInstance>,
    variables: HashMap<VariableScopeKey, HistoricVariableInstance>,
    details: Vec<HistoricDetail>,
    identity_links: HashMap<Id, HistoricIdentityLink>,
    task_log: BTreeMap<i64, HistoricTaskLogEntry>,
    next_log_number: i64,
    applied_jobs: HashSet<Id>,
}

/// In-memory [`HistoryStore`] implementation
#[derive(Default)]
pub struct InMemoryHistoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_one(inner: &mut StoreInner, event: &CaptureEvent) {
        match &event.body {
            CaptureEventBody::ProcessInstanceStarted { instance } => {
                inner
                    .process_instances
                    .insert(instance.id.clone(), instance.clone());
            }
            CaptureEventBody::ProcessInstanceEnded {
                process_instance_id,
                end_time,
                end_activity_id,
                delete_reason,
                deleted,
            } => {
                if let Some(instance) = inner.process_instances.get_mut(process_instance_id) {
                    instance.mark_ended(*end_time);
                    instance.end_activity_id = end_activity_id.clone();
                    instance.delete_reason = delete_reason.clone();
                    instance.deleted = *deleted;
                } else {
                    warn!("Process instance {} not found for end event", process_instance_id);
                }
            }
            CaptureEventBody::ActivityStarted { activity } => {
                inner
                    .activity_instances
                    .insert(activity.id.clone(), activity.clone());
            }
            CaptureEventBody::ActivityEnded {
                activity_instance_id,
                end_time,
                delete_reason,
            } => {
                if let Some(activity) = inner.activity_instances.get_mut(activity_instance_id) {
                    activity.mark_ended(*end_time);
                    activity.delete_reason = delete_reason.clone();
                } else {
                    warn!("Activity instance {} not found for end event", activity_instance_id);
                }
            }
            CaptureEventBody::TaskCreated { task } => {
                inner.task_instances.insert(task.id.clone(), task.clone());
            }
            CaptureEventBody::TaskUpdated { task_id, changes } => {
                if let Some(task) = inner.task_instances.get_mut(task_id) {
                    if let Some(name) = &changes.name {
                        task.name = Some(name.clone());
                    }
                    if let Some(description) = &changes.description {
                        task.description = Some(description.clone());
                    }
                    if let Some(assignee) = &changes.assignee {
                        task.assignee = Some(assignee.clone());
                    }
                    if let Some(owner) = &changes.owner {
                        task.owner = Some(owner.clone());
                    }
                    if let Some(priority) = changes.priority {
                        task.priority = priority;
                    }
                    if let Some(due_date) = changes.due_date {
                        task.due_date = Some(due_date);
                    }
                    if let Some(claim_time) = changes.claim_time {
                        task.claim_time = Some(claim_time);
                    }
                } else {
                    warn!("Task instance {} not found for update event", task_id);
                }
            }
            CaptureEventBody::TaskEnded {
                task_id,
                end_time,
                delete_reason,
                deleted,
            } => {
                if let Some(task) = inner.task_instances.get_mut(task_id) {
                    task.mark_ended(*end_time);
                    task.delete_reason = delete_reason.clone();
                    task.deleted = *deleted;
                } else {
                    warn!("Task instance {} not found for end event", task_id);
                }
            }
            CaptureEventBody::VariableSet {
                key,
                value,
                revision,
            } => {
                if let Some(existing) = inner.variables.get_mut(key) {
                    existing.overwrite(value.clone(), *revision, event.time);
                } else {
                    inner.variables.insert(
                        key.clone(),
                        HistoricVariableInstance::new(key.clone(), value.clone(), event.time),
                    );
                }
            }
            CaptureEventBody::VariableRemoved { key } => {
                inner.variables.remove(key);
            }
            CaptureEventBody::VariableDetail { detail } => {
                inner.details.push(detail.clone());
            }
            CaptureEventBody::IdentityLinkAdded { link } => {
                inner.identity_links.insert(link.id.clone(), link.clone());
            }
            CaptureEventBody::IdentityLinkRemoved { link_id } => {
                inner.identity_links.remove(link_id);
            }
            CaptureEventBody::TaskLogEntryAdded { entry } => {
                inner.next_log_number += 1;
                let log_number = inner.next_log_number;
                inner.task_log.insert(
                    log_number,
                    HistoricTaskLogEntry::from_new(log_number, entry.clone()),
                );
            }
            CaptureEventBody::TaskLogEntryDeleted { log_number } => {
                // Deleting a missing entry is a no-op
                inner.task_log.remove(log_number);
            }
            CaptureEventBody::CommitFailed { message } => {
                // Diagnostic only; must never reach the store, but a stray
                // one is harmless
                warn!("Ignoring commit-failed diagnostic in apply: {message}");
            }
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn apply_events(&self, job_id: &Id, events: &[CaptureEvent]) -> Result<()> {
        let mut inner = self.inner.write().await;

        if !inner.applied_jobs.insert(job_id.clone()) {
            debug!("Job {} already applied, skipping", job_id);
            return Ok(());
        }

        for event in events {
            Self::apply_one(&mut inner, event);
        }

        debug!("Applied {} events for job {}", events.len(), job_id);
        Ok(())
    }

    async fn process_instances(&self) -> Result<Vec<HistoricProcessInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.process_instances.values().cloned().collect())
    }

    async fn process_instance(&self, id: &Id) -> Result<Option<HistoricProcessInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.process_instances.get(id).cloned())
    }

    async fn task_instances(&self) -> Result<Vec<HistoricTaskInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.task_instances.values().cloned().collect())
    }

    async fn task_instance(&self, id: &Id) -> Result<Option<HistoricTaskInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.task_instances.get(id).cloned())
    }

    async fn activity_instances(&self) -> Result<Vec<HistoricActivityInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.activity_instances.values().cloned().collect())
    }

    async fn variables(&self) -> Result<Vec<HistoricVariableInstance>> {
        let inner = self.inner.read().await;
        Ok(inner.variables.values().cloned().collect())
    }

    async fn variables_for_scope(&self, scope_id: &Id) -> Result<Vec<HistoricVariableInstance>> {
        let inner = self.inner.read().await;
        Ok(inner
            .variables
            .values()
            .filter(|v| v.scope_id() == scope_id)
            .cloned()
            .collect())
    }

    async fn details(&self) -> Result<Vec<HistoricDetail>> {
        let inner = self.inner.read().await;
        Ok(inner.details.clone())
    }

    async fn identity_links(&self) -> Result<Vec<HistoricIdentityLink>> {
        let inner = self.inner.read().await;
        Ok(inner.identity_links.values().cloned().collect())
    }

    async fn task_log_entries(&self, task_id: &Id) -> Result<Vec<HistoricTaskLogEntry>> {
        let inner = self.inner.read().await;
        // BTreeMap iteration yields ascending log numbers
        Ok(inner
            .task_log
            .values()
            .filter(|e| &e.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let inner = self.inner.read().await;
        Ok(StoreCounts {
            process_instances: inner.process_instances.len(),
            task_instances: inner.task_instances.len(),
            activity_instances: inner.activity_instances.len(),
            variables: inner.variables.len(),
            details: inner.details.len(),
            identity_links: inner.identity_links.len(),
            task_log_entries: inner.task_log.len(),
        })
    }

    #[instrument(skip(self))]
    async fn delete_process_instance(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;

        inner.process_instances.remove(id);
        inner.task_instances.retain(|_, t| &t.process_instance_id != id);
        inner
            .activity_instances
            .retain(|_, a| &a.process_instance_id != id);
        inner.variables.retain(|_, v| v.scope_id() != id);
        inner.details.retain(|d| &d.process_instance_id != id);
        inner
            .identity_links
            .retain(|_, l| &l.process_instance_id != id);
        inner
            .task_log
            .retain(|_, e| e.process_instance_id.as_ref() != Some(id));

        debug!("Purged historic process instance {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_definition_references(&self, process_definition_id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        let mut cleared = 0usize;

        for instance in inner.process_instances.values_mut() {
            if instance.process_definition_id.as_ref() == Some(process_definition_id) {
                instance.process_definition_key = None;
                instance.process_definition_name = None;
                instance.process_definition_version = None;
                cleared += 1;
            }
        }

        debug!(
            "Cleared definition references on {} instances of {}",
            cleared, process_definition_id
        );
        Ok(())
    }

    async fn delete_task_log_entry(&self, log_number: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.task_log.remove(&log_number);
        Ok(())
    }
}
