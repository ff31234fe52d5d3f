//! Job handlers
//!
//! A handler owns the semantics of one `handler_type` tag. The history
//! events handler is the one the capture session produces jobs for: it
//! deserializes the payload, restores event order, and applies the batch to
//! the historic store.

use crate::job::{HISTORY_EVENTS_HANDLER, HistoryJob};
use async_trait::async_trait;
use procflow_core::Result;
use procflow_history::{CaptureEvent, HistoryStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Applies one kind of history job
#[async_trait]
pub trait HistoryJobHandler: Send + Sync {
    /// The `handler_type` tag this handler is responsible for
    fn handler_type(&self) -> &'static str;

    /// Apply the job. Must be idempotent with respect to re-execution.
    async fn execute(&self, job: &HistoryJob) -> Result<()>;
}

/// Handler for capture-event batches
pub struct HistoryEventsHandler {
    store: Arc<dyn HistoryStore>,
}

impl HistoryEventsHandler {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HistoryJobHandler for HistoryEventsHandler {
    fn handler_type(&self) -> &'static str {
        HISTORY_EVENTS_HANDLER
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn execute(&self, job: &HistoryJob) -> Result<()> {
        let mut events: Vec<CaptureEvent> = serde_json::from_value(job.payload.clone())?;
        // Workers may deliver chunks of one unit of work in any order;
        // sequence numbers restore the capture order within this batch
        events.sort_by_key(|e| e.sequence);

        debug!("Applying {} capture event(s)", events.len());
        self.store.apply_events(&job.id, &events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use procflow_core::Id;
    use procflow_history::{
        CaptureEventBody, HistoricProcessInstance, InMemoryHistoryStore, StoreCounts,
    };

    fn event(sequence: u64, body: CaptureEventBody) -> CaptureEvent {
        CaptureEvent {
            sequence,
            correlation_id: Id::from("corr-1"),
            time: chrono::Utc::now(),
            body,
        }
    }

    #[tokio::test]
    async fn test_execute_applies_events_in_sequence_order() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let handler = HistoryEventsHandler::new(store.clone());

        let start = chrono::Utc::now();
        let end = start + chrono::Duration::seconds(1);
        // Deliberately shuffled: end event first in the payload
        let events = vec![
            event(
                2,
                CaptureEventBody::ProcessInstanceEnded {
                    process_instance_id: Id::from("proc-1"),
                    end_time: end,
                    end_activity_id: None,
                    delete_reason: None,
                    deleted: false,
                },
            ),
            event(
                1,
                CaptureEventBody::ProcessInstanceStarted {
                    instance: HistoricProcessInstance::started("proc-1", start),
                },
            ),
        ];

        let job = HistoryJob::new(
            HISTORY_EVENTS_HANDLER,
            serde_json::to_value(&events).unwrap(),
        );
        handler.execute(&job).await.unwrap();

        let instance = store
            .process_instance(&Id::from("proc-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(instance.is_finished());
        assert_eq!(instance.duration_ms, Some(1000));
    }

    #[tokio::test]
    async fn test_execute_rejects_malformed_payload() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let handler = HistoryEventsHandler::new(store.clone());

        let job = HistoryJob::new(HISTORY_EVENTS_HANDLER, serde_json::json!({"not": "events"}));
        let actual = handler.execute(&job).await;

        assert!(actual.is_err());
        assert_eq!(store.counts().await.unwrap(), StoreCounts::default());
    }
}
