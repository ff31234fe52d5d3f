//! Background job pipeline
//!
//! Workers run cycles on a fixed interval or on explicit trigger. A cycle
//! acquires a locked batch oldest-first, applies each job through its
//! handler, deletes jobs that succeed, records failures on the job, and
//! dead-letters a job once its retry count exceeds the ceiling. One
//! poisoned job never blocks the others.

use crate::config::PipelineConfig;
use crate::handler::HistoryJobHandler;
use crate::job::HistoryJob;
use crate::storage::JobStorage;
use procflow_core::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one pipeline cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub acquired: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dead_lettered: usize,
}

impl CycleStats {
    fn merge(&mut self, other: CycleStats) {
        self.acquired += other.acquired;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.dead_lettered += other.dead_lettered;
    }
}

/// Interval-driven worker over the job queue
pub struct JobPipeline {
    storage: Arc<dyn JobStorage>,
    handlers: HashMap<String, Arc<dyn HistoryJobHandler>>,
    config: PipelineConfig,
    shutdown: Notify,
}

impl JobPipeline {
    pub fn new(storage: Arc<dyn JobStorage>, config: PipelineConfig) -> Self {
        Self {
            storage,
            handlers: HashMap::new(),
            config,
            shutdown: Notify::new(),
        }
    }

    /// Register a handler for its `handler_type` tag
    pub fn register_handler(&mut self, handler: Arc<dyn HistoryJobHandler>) {
        self.handlers
            .insert(handler.handler_type().to_string(), handler);
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one cycle: acquire a batch and process every job in it.
    /// Job failures are isolated; only storage failures surface here.
    #[instrument(skip(self), fields(owner = %self.config.owner))]
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let jobs = self
            .storage
            .acquire_jobs(
                &self.config.owner,
                self.config.batch_size,
                self.config.lock_timeout,
            )
            .await?;

        let mut stats = CycleStats {
            acquired: jobs.len(),
            ..CycleStats::default()
        };

        for job in jobs {
            match self.process_job(&job).await {
                Ok(()) => {
                    self.storage.complete_job(&job.id).await?;
                    stats.succeeded += 1;
                }
                Err(e) => {
                    let message = format!("{e:?}");
                    let retries = self.storage.record_failure(&job.id, &message).await?;
                    stats.failed += 1;
                    warn!(
                        "History job {} failed (attempt {}): {}",
                        job.id, retries, e
                    );

                    if retries > self.config.max_retries {
                        self.storage.move_to_dead_letter(&job.id).await?;
                        stats.dead_lettered += 1;
                        error!(
                            "History job {} exhausted its retry budget, dead-lettered",
                            job.id
                        );
                    }
                }
            }
        }

        if stats.acquired > 0 {
            debug!(
                "Cycle done: {} acquired, {} succeeded, {} failed, {} dead-lettered",
                stats.acquired, stats.succeeded, stats.failed, stats.dead_lettered
            );
        }
        Ok(stats)
    }

    async fn process_job(&self, job: &HistoryJob) -> Result<()> {
        let handler = self.handlers.get(&job.handler_type).ok_or_else(|| {
            procflow_core::Error::job(format!("No handler for type '{}'", job.handler_type))
        })?;
        handler.execute(job).await
    }

    /// Run cycles until the active queue is empty. Retrying jobs keep the
    /// loop going until they either succeed or are dead-lettered, so this
    /// terminates. This is the "wait until the pipeline has drained"
    /// operation tests rely on instead of assuming read-after-write.
    pub async fn drain(&self) -> Result<CycleStats> {
        let mut total = CycleStats::default();
        loop {
            let stats = self.run_cycle().await?;
            total.merge(stats);
            if self.storage.pending_count().await? == 0 {
                return Ok(total);
            }
        }
    }

    /// Spawn the fixed-interval polling loop; stop it with [`Self::stop`]
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        info!(
            "Starting history job pipeline (interval {:?}, batch {})",
            pipeline.config.poll_interval, pipeline.config.batch_size
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(pipeline.config.poll_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = pipeline.run_cycle().await {
                            error!("Pipeline cycle failed: {}", e);
                        }
                    }
                    _ = pipeline.shutdown.notified() => {
                        info!("History job pipeline stopping");
                        return;
                    }
                }
            }
        })
    }

    /// Signal the polling loop to stop after the current cycle
    pub fn stop(&self) {
        self.shutdown.notify_waiters();
    }
}
