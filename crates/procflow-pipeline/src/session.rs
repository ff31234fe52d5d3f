//! Capture session
//!
//! A capture session is scoped to exactly one unit of work. It buffers
//! events in order, stamping each with a strictly increasing sequence
//! number and the shared correlation id minted with the first event. On
//! commit the buffer is converted into history jobs; on rollback a
//! terminal commit-failed diagnostic is emitted and the buffer discarded.

use crate::config::CaptureConfig;
use crate::job::{HISTORY_EVENTS_HANDLER, HistoryJob};
use procflow_core::{Id, Result};
use procflow_history::{CaptureEvent, CaptureEventBody};
use tracing::{debug, warn};

/// Ordered event buffer for one unit of work
pub struct CaptureSession {
    correlation_id: Id,
    next_sequence: u64,
    buffer: Vec<CaptureEvent>,
}

impl CaptureSession {
    /// Create a session; the correlation id is minted here and shared by
    /// every event the session will buffer
    pub fn new() -> Self {
        Self {
            correlation_id: procflow_core::new_id_with_prefix("capture"),
            next_sequence: 0,
            buffer: Vec::new(),
        }
    }

    /// The correlation id shared by all events of this unit of work
    pub fn correlation_id(&self) -> &Id {
        &self.correlation_id
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been buffered yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append an event, stamping sequence number and correlation id
    pub fn record(&mut self, body: CaptureEventBody) {
        self.next_sequence += 1;
        self.buffer.push(CaptureEvent {
            sequence: self.next_sequence,
            correlation_id: self.correlation_id.clone(),
            time: chrono::Utc::now(),
            body,
        });
    }

    /// Convert the buffer into history jobs, chunked by configuration.
    /// Consumes the session: it has no life beyond its unit of work.
    pub fn into_jobs(self, config: &CaptureConfig) -> Result<Vec<HistoryJob>> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = config.max_events_per_job.max(1);
        let mut jobs = Vec::new();
        for chunk in self.buffer.chunks(chunk_size) {
            let payload = serde_json::to_value(chunk)?;
            jobs.push(
                HistoryJob::new(HISTORY_EVENTS_HANDLER, payload)
                    .correlation_id(self.correlation_id.clone()),
            );
        }

        debug!(
            "Capture session {} produced {} job(s) from {} event(s)",
            self.correlation_id,
            jobs.len(),
            self.buffer.len()
        );
        Ok(jobs)
    }

    /// Failure path: emit the terminal commit-failed diagnostic, then drop
    /// the buffer. Nothing reaches the store.
    pub fn commit_failed(mut self, message: &str) {
        self.record(CaptureEventBody::CommitFailed {
            message: message.to_string(),
        });
        warn!(
            "Unit of work failed to commit; discarding {} buffered event(s) for {}: {}",
            self.buffer.len(),
            self.correlation_id,
            message
        );
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}
