use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the foreground capture side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct CaptureConfig {
    /// Maximum capture events packed into one history job; a unit of work
    /// producing more is chunked into several jobs sharing a correlation id
    pub max_events_per_job: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_events_per_job: 500,
        }
    }
}

/// Configuration for the background job pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Setters)]
#[setters(strip_option, into)]
pub struct PipelineConfig {
    /// Identifies this worker in job lock-owner fields
    pub owner: String,
    /// Fixed polling interval between cycles
    pub poll_interval: Duration,
    /// Jobs acquired per cycle
    pub batch_size: usize,
    /// Retry ceiling; a job failing more often is dead-lettered
    pub max_retries: u32,
    /// A lock older than this is considered abandoned
    pub lock_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            owner: procflow_core::new_id_with_prefix("worker").into_string(),
            poll_interval: Duration::from_secs(10),
            batch_size: 100,
            max_retries: 3,
            lock_timeout: Duration::from_secs(300),
        }
    }
}
