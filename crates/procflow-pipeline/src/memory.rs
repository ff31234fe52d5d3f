//! In-memory job storage
//!
//! Reference implementation of [`JobStorage`] over `tokio::sync::RwLock`.
//! Lock acquisition stamps the owner and expiry in the same write-lock
//! section that selects the batch, which is the optimistic-locking part:
//! two workers can never acquire the same job while a lock is live.

use crate::job::{DeadHistoryJob, HistoryJob};
use crate::storage::JobStorage;
use async_trait::async_trait;
use procflow_core::{Error, Id, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Default)]
struct QueueInner {
    jobs: HashMap<Id, HistoryJob>,
    dead_jobs: HashMap<Id, DeadHistoryJob>,
}

/// In-memory [`JobStorage`] implementation
#[derive(Default)]
pub struct InMemoryJobStorage {
    inner: RwLock<QueueInner>,
}

impl InMemoryJobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for InMemoryJobStorage {
    async fn store_job(&self, job: HistoryJob) -> Result<()> {
        let mut inner = self.inner.write().await;
        debug!("Storing history job {}", job.id);
        inner.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn store_jobs(&self, jobs: Vec<HistoryJob>) -> Result<()> {
        let mut inner = self.inner.write().await;
        for job in jobs {
            inner.jobs.insert(job.id.clone(), job);
        }
        Ok(())
    }

    async fn find_job(&self, id: &Id) -> Result<Option<HistoryJob>> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.get(id).cloned())
    }

    #[instrument(skip(self))]
    async fn acquire_jobs(
        &self,
        owner: &str,
        batch: usize,
        lock_timeout: Duration,
    ) -> Result<Vec<HistoryJob>> {
        let mut inner = self.inner.write().await;
        let now = chrono::Utc::now();

        let mut candidates: Vec<Id> = inner
            .jobs
            .values()
            .filter(|job| !job.is_locked_at(now))
            .map(|job| job.id.clone())
            .collect();
        candidates.sort_by_key(|id| {
            let job = &inner.jobs[id];
            (job.created_at, job.id.clone())
        });
        candidates.truncate(batch);

        let expiry =
            now + chrono::Duration::from_std(lock_timeout).unwrap_or_else(|_| chrono::Duration::zero());
        let mut acquired = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(job) = inner.jobs.get_mut(&id) {
                job.lock_owner = Some(owner.to_string());
                job.lock_expiry = Some(expiry);
                acquired.push(job.clone());
            }
        }

        debug!("Worker {} acquired {} jobs", owner, acquired.len());
        Ok(acquired)
    }

    async fn release_lock(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(job) = inner.jobs.get_mut(id) {
            job.clear_lock();
        }
        Ok(())
    }

    async fn complete_job(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.jobs.remove(id);
        debug!("Completed history job {}", id);
        Ok(())
    }

    async fn record_failure(&self, id: &Id, message: &str) -> Result<u32> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| Error::job(format!("Job {id} not found")))?;

        job.retry_count += 1;
        job.last_failure = Some(message.to_string());
        job.clear_lock();
        Ok(job.retry_count)
    }

    async fn move_to_dead_letter(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .remove(id)
            .ok_or_else(|| Error::job(format!("Job {id} not found")))?;

        let dead = DeadHistoryJob::from_job(job, chrono::Utc::now());
        debug!("Dead-lettered history job {}", dead.id);
        inner.dead_jobs.insert(dead.id.clone(), dead);
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize> {
        let inner = self.inner.read().await;
        Ok(inner.jobs.len())
    }

    async fn dead_jobs(&self) -> Result<Vec<DeadHistoryJob>> {
        let inner = self.inner.read().await;
        Ok(inner.dead_jobs.values().cloned().collect())
    }

    async fn find_dead_job(&self, id: &Id) -> Result<Option<DeadHistoryJob>> {
        let inner = self.inner.read().await;
        Ok(inner.dead_jobs.get(id).cloned())
    }

    async fn delete_dead_job(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.dead_jobs.remove(id);
        Ok(())
    }

    async fn requeue_dead_job(&self, id: &Id) -> Result<()> {
        let mut inner = self.inner.write().await;
        let dead = inner
            .dead_jobs
            .remove(id)
            .ok_or_else(|| Error::job(format!("Dead job {id} not found")))?;

        let job = dead.into_job();
        inner.jobs.insert(job.id.clone(), job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::HISTORY_EVENTS_HANDLER;
    use pretty_assertions::assert_eq;

    fn job() -> HistoryJob {
        HistoryJob::new(HISTORY_EVENTS_HANDLER, serde_json::json!([]))
    }

    #[tokio::test]
    async fn test_acquire_locks_and_skips_locked() {
        let storage = InMemoryJobStorage::new();
        storage.store_job(job()).await.unwrap();
        storage.store_job(job()).await.unwrap();

        let first = storage
            .acquire_jobs("worker-1", 10, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        // Still locked by worker-1, so a second worker gets nothing
        let second = storage
            .acquire_jobs("worker-2", 10, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(second.len(), 0);
    }

    #[tokio::test]
    async fn test_expired_lock_is_reacquirable() {
        let storage = InMemoryJobStorage::new();
        storage.store_job(job()).await.unwrap();

        let first = storage
            .acquire_jobs("worker-1", 1, Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Zero-duration lock expires immediately
        let second = storage
            .acquire_jobs("worker-2", 1, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].lock_owner.as_deref(), Some("worker-2"));
    }

    #[tokio::test]
    async fn test_acquire_is_oldest_first_and_batched() {
        let storage = InMemoryJobStorage::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            let mut j = job();
            j.created_at = chrono::Utc::now() + chrono::Duration::seconds(i);
            ids.push(j.id.clone());
            storage.store_job(j).await.unwrap();
        }

        let acquired = storage
            .acquire_jobs("worker-1", 2, Duration::from_secs(60))
            .await
            .unwrap();
        let actual: Vec<Id> = acquired.into_iter().map(|j| j.id).collect();
        assert_eq!(actual, ids[..2].to_vec());
    }

    #[tokio::test]
    async fn test_record_failure_releases_lock() {
        let storage = InMemoryJobStorage::new();
        storage.store_job(job()).await.unwrap();
        let acquired = storage
            .acquire_jobs("worker-1", 1, Duration::from_secs(60))
            .await
            .unwrap();
        let id = acquired[0].id.clone();

        let retries = storage.record_failure(&id, "handler blew up").await.unwrap();
        assert_eq!(retries, 1);

        let stored = storage.find_job(&id).await.unwrap().unwrap();
        assert_eq!(stored.lock_owner, None);
        assert_eq!(stored.last_failure.as_deref(), Some("handler blew up"));
    }

    #[tokio::test]
    async fn test_dead_letter_and_requeue() {
        let storage = InMemoryJobStorage::new();
        let j = job();
        let id = j.id.clone();
        storage.store_job(j).await.unwrap();
        storage.record_failure(&id, "poison").await.unwrap();
        storage.move_to_dead_letter(&id).await.unwrap();

        assert_eq!(storage.pending_count().await.unwrap(), 0);
        let dead = storage.find_dead_job(&id).await.unwrap().unwrap();
        assert_eq!(dead.last_failure.as_deref(), Some("poison"));

        storage.requeue_dead_job(&id).await.unwrap();
        assert_eq!(storage.pending_count().await.unwrap(), 1);
        assert!(storage.find_dead_job(&id).await.unwrap().is_none());
        let requeued = storage.find_job(&id).await.unwrap().unwrap();
        assert_eq!(requeued.retry_count, 0);
    }
}
