//! # procflow History
//!
//! Historic entity projections and the history store for the procflow
//! historic-data subsystem.
//!
//! ## Key Components
//!
//! - **Entities**: process/task/activity projections, variable snapshots,
//!   fine-grained details, identity links, task log entries
//! - **Capture events**: the vocabulary the capture pipeline ships to the
//!   store
//! - **Store**: the `HistoryStore` trait plus an in-memory implementation
//!   with idempotent batch apply

pub mod entities;
pub mod events;
pub mod memory;
pub mod store;
pub mod tasklog;
pub mod variables;

// Re-export public API
pub use entities::{
    HistoricActivityInstance, HistoricDetail, HistoricIdentityLink, HistoricProcessInstance,
    HistoricTaskInstance,
};
pub use events::{CaptureEvent, CaptureEventBody, TaskChanges};
pub use memory::InMemoryHistoryStore;
pub use store::{HistoryStore, StoreCounts};
pub use tasklog::{HistoricTaskLogEntry, NewTaskLogEntry, TaskLogEntryType};
pub use variables::HistoricVariableInstance;
