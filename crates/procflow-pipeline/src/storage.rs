//! Job storage trait
//!
//! The job queue is the only mutable resource the foreground and background
//! halves share. It is protected by the lock-field-on-row discipline: many
//! workers process disjoint jobs in parallel, and a lock left behind by a
//! dead worker self-expires so another worker can retry.

use crate::job::{DeadHistoryJob, HistoryJob};
use async_trait::async_trait;
use procflow_core::{Id, Result};
use std::time::Duration;

/// Persistence seam for history jobs and the dead-job table
#[async_trait]
pub trait JobStorage: Send + Sync {
    /// Store one unlocked job
    async fn store_job(&self, job: HistoryJob) -> Result<()>;

    /// Store a batch of jobs atomically; all from one unit-of-work commit
    async fn store_jobs(&self, jobs: Vec<HistoryJob>) -> Result<()>;

    async fn find_job(&self, id: &Id) -> Result<Option<HistoryJob>>;

    /// Select up to `batch` unlocked (or expired-lock) jobs, oldest first,
    /// and stamp `owner` + a lock expiring after `lock_timeout` on each.
    /// Jobs locked by a live owner are skipped, never stolen.
    async fn acquire_jobs(
        &self,
        owner: &str,
        batch: usize,
        lock_timeout: Duration,
    ) -> Result<Vec<HistoryJob>>;

    /// Release the lock without touching retry metadata
    async fn release_lock(&self, id: &Id) -> Result<()>;

    /// Delete a successfully applied job
    async fn complete_job(&self, id: &Id) -> Result<()>;

    /// Record a failure: increment the retry count, store the message, and
    /// release the lock. Returns the new retry count.
    async fn record_failure(&self, id: &Id, message: &str) -> Result<u32>;

    /// Move a job out of the active queue into the dead-job table
    async fn move_to_dead_letter(&self, id: &Id) -> Result<()>;

    /// Number of jobs still in the active queue
    async fn pending_count(&self) -> Result<usize>;

    // -- operator inspection path -----------------------------------------

    async fn dead_jobs(&self) -> Result<Vec<DeadHistoryJob>>;
    async fn find_dead_job(&self, id: &Id) -> Result<Option<DeadHistoryJob>>;
    async fn delete_dead_job(&self, id: &Id) -> Result<()>;

    /// Put a dead job back on the active queue with a fresh retry budget
    async fn requeue_dead_job(&self, id: &Id) -> Result<()>;
}
