//! # procflow Pipeline
//!
//! The asynchronous, level-gated capture pipeline: it turns foreground
//! execution events into durable historic records without slowing down or
//! coupling to the main transaction.
//!
//! ## Key Components
//!
//! - **Unit of work**: explicit per-transaction context with an ordered
//!   close-listener registry
//! - **Capture session**: ordered, sequence-stamped event buffer flushed to
//!   history jobs at commit
//! - **Job storage**: lock-field-on-row queue with a dead-job table
//! - **Job pipeline**: interval-driven workers with per-job isolation,
//!   retries, and dead-lettering

pub mod config;
pub mod handler;
pub mod job;
pub mod memory;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod unit_of_work;

// Re-export public API
pub use config::{CaptureConfig, PipelineConfig};
pub use handler::{HistoryEventsHandler, HistoryJobHandler};
pub use job::{DeadHistoryJob, HISTORY_EVENTS_HANDLER, HistoryJob};
pub use memory::InMemoryJobStorage;
pub use pipeline::{CycleStats, JobPipeline};
pub use session::CaptureSession;
pub use storage::JobStorage;
pub use unit_of_work::{CloseListenerKind, UnitOfWork};
