//! History jobs
//!
//! A history job is the durable, retryable unit of deferred work that
//! applies one batch of capture events to the historic store. Jobs are
//! created at foreground-commit time and mutated only by the worker that
//! currently holds their lock.

use derive_setters::Setters;
use procflow_core::{DateTime, Id, Json};
use serde::{Deserialize, Serialize};

/// Handler tag for jobs whose payload is a batch of capture events
pub const HISTORY_EVENTS_HANDLER: &str = "history-events";

/// Durable unit of deferred history work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct HistoryJob {
    pub id: Id,
    /// Routes the job to its handler
    pub handler_type: String,
    /// Serialized payload, opaque to the queue
    pub payload: Json,
    /// Scope linkage for operator inspection
    pub scope_id: Option<Id>,
    /// Correlation id shared by all chunks of one unit of work
    pub correlation_id: Option<Id>,
    pub lock_owner: Option<String>,
    pub lock_expiry: Option<DateTime>,
    pub retry_count: u32,
    /// Message + trace of the most recent failure
    pub last_failure: Option<String>,
    pub created_at: DateTime,
}

impl HistoryJob {
    /// Create an unlocked job
    pub fn new(handler_type: impl Into<String>, payload: Json) -> Self {
        Self {
            id: procflow_core::new_id_with_prefix("job"),
            handler_type: handler_type.into(),
            payload,
            scope_id: None,
            correlation_id: None,
            lock_owner: None,
            lock_expiry: None,
            retry_count: 0,
            last_failure: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether the job is locked by a live owner at `now`
    pub fn is_locked_at(&self, now: DateTime) -> bool {
        match (&self.lock_owner, self.lock_expiry) {
            (Some(_), Some(expiry)) => expiry > now,
            _ => false,
        }
    }

    /// Clear the lock fields
    pub fn clear_lock(&mut self) {
        self.lock_owner = None;
        self.lock_expiry = None;
    }
}

/// A job that exhausted its retry budget, kept for manual inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadHistoryJob {
    pub id: Id,
    pub handler_type: String,
    pub payload: Json,
    pub scope_id: Option<Id>,
    pub correlation_id: Option<Id>,
    pub retry_count: u32,
    pub last_failure: Option<String>,
    pub created_at: DateTime,
    pub dead_lettered_at: DateTime,
}

impl DeadHistoryJob {
    /// Move a job out of the active queue, dropping its lock fields
    pub fn from_job(job: HistoryJob, dead_lettered_at: DateTime) -> Self {
        Self {
            id: job.id,
            handler_type: job.handler_type,
            payload: job.payload,
            scope_id: job.scope_id,
            correlation_id: job.correlation_id,
            retry_count: job.retry_count,
            last_failure: job.last_failure,
            created_at: job.created_at,
            dead_lettered_at,
        }
    }

    /// Turn a dead job back into a runnable one with a fresh retry budget
    pub fn into_job(self) -> HistoryJob {
        HistoryJob {
            id: self.id,
            handler_type: self.handler_type,
            payload: self.payload,
            scope_id: self.scope_id,
            correlation_id: self.correlation_id,
            lock_owner: None,
            lock_expiry: None,
            retry_count: 0,
            last_failure: self.last_failure,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_job_is_unlocked() {
        let fixture = HistoryJob::new(HISTORY_EVENTS_HANDLER, serde_json::json!([]));
        assert!(!fixture.is_locked_at(chrono::Utc::now()));
        assert_eq!(fixture.retry_count, 0);
        assert_eq!(fixture.last_failure, None);
    }

    #[test]
    fn test_lock_expiry() {
        let now = chrono::Utc::now();
        let mut fixture = HistoryJob::new(HISTORY_EVENTS_HANDLER, serde_json::json!([]))
            .lock_owner("worker-1")
            .lock_expiry(now + chrono::Duration::seconds(60));

        assert!(fixture.is_locked_at(now));
        assert!(!fixture.is_locked_at(now + chrono::Duration::seconds(61)));

        fixture.clear_lock();
        assert!(!fixture.is_locked_at(now));
    }

    #[test]
    fn test_dead_letter_round_trip() {
        let now = chrono::Utc::now();
        let job = HistoryJob::new(HISTORY_EVENTS_HANDLER, serde_json::json!([1, 2]))
            .lock_owner("worker-1")
            .lock_expiry(now)
            .last_failure("boom")
            .retry_count(4u32);

        let dead = DeadHistoryJob::from_job(job.clone(), now);
        assert_eq!(dead.last_failure.as_deref(), Some("boom"));
        assert_eq!(dead.retry_count, 4);

        let requeued = dead.into_job();
        assert_eq!(requeued.id, job.id);
        assert_eq!(requeued.retry_count, 0);
        assert_eq!(requeued.lock_owner, None);
    }
}
