//! Unit of work and close-listener registry
//!
//! The unit of work is an explicit per-transaction context handle obtained
//! when engine logic begins and threaded through every capture call site;
//! there is no process-wide ambient session. Capture is level-gated before
//! anything is buffered: at `HistoryLevel::None` a `record` call returns
//! before a session or any allocation exists.
//!
//! Completion is a two-phase pass over an ordered listener registry:
//! listeners fire ascending by order on success, and a separate failure
//! callback fires instead on rollback. A listener never sees both.

use crate::config::CaptureConfig;
use crate::session::CaptureSession;
use crate::storage::JobStorage;
use procflow_core::{HistoryLevel, Id, Result, should_capture};
use procflow_history::CaptureEventBody;
use std::sync::Arc;
use tracing::{debug, warn};

/// The finite set of close-listener kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseListenerKind {
    /// Logs the unit-of-work outcome
    Diagnostics,
    /// Flushes the capture session into history jobs; singleton per unit of
    /// work
    CaptureFlush,
}

impl CloseListenerKind {
    /// Listeners fire ascending by this order
    pub fn order(&self) -> i32 {
        match self {
            CloseListenerKind::Diagnostics => 10,
            CloseListenerKind::CaptureFlush => 100,
        }
    }

    /// Whether several instances of this kind may register simultaneously
    pub fn allows_multiple(&self) -> bool {
        match self {
            CloseListenerKind::Diagnostics => true,
            CloseListenerKind::CaptureFlush => false,
        }
    }
}

/// One atomic execution of engine logic, owning the capture session and the
/// close-listener registry. Destroyed by `commit` or `rollback`.
pub struct UnitOfWork {
    id: Id,
    level: HistoryLevel,
    job_storage: Arc<dyn JobStorage>,
    capture_config: CaptureConfig,
    listeners: Vec<CloseListenerKind>,
    session: Option<CaptureSession>,
}

impl UnitOfWork {
    /// Begin a unit of work at the configured history level
    pub fn new(level: HistoryLevel, job_storage: Arc<dyn JobStorage>) -> Self {
        Self::with_capture_config(level, job_storage, CaptureConfig::default())
    }

    pub fn with_capture_config(
        level: HistoryLevel,
        job_storage: Arc<dyn JobStorage>,
        capture_config: CaptureConfig,
    ) -> Self {
        let mut unit = Self {
            id: procflow_core::new_id_with_prefix("uow"),
            level,
            job_storage,
            capture_config,
            listeners: Vec::new(),
            session: None,
        };
        unit.register_close_listener(CloseListenerKind::Diagnostics);
        unit
    }

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn level(&self) -> HistoryLevel {
        self.level
    }

    /// Register a close listener. Returns `false` when the kind is a
    /// singleton and one is already registered.
    pub fn register_close_listener(&mut self, kind: CloseListenerKind) -> bool {
        if !kind.allows_multiple() && self.listeners.contains(&kind) {
            debug!("Listener {:?} already registered on {}", kind, self.id);
            return false;
        }
        self.listeners.push(kind);
        true
    }

    /// Capture one event. Safe to call zero or many times; never fails in a
    /// way that would abort the caller's primary work. A configured level of
    /// `None` short-circuits before any buffering.
    pub fn record(&mut self, body: CaptureEventBody) {
        let Some(category) = body.category() else {
            // Diagnostic-only bodies are not routed through capture
            debug!("Ignoring diagnostic capture body on {}", self.id);
            return;
        };
        if !should_capture(category, self.level) {
            return;
        }

        // Lazy: the session and its flush listener exist only once the
        // first capturable event arrives
        if self.session.is_none() {
            self.session = Some(CaptureSession::new());
            self.register_close_listener(CloseListenerKind::CaptureFlush);
        }
        if let Some(session) = self.session.as_mut() {
            session.record(body);
        }
    }

    /// Number of buffered capture events
    pub fn buffered_events(&self) -> usize {
        self.session.as_ref().map(CaptureSession::len).unwrap_or(0)
    }

    /// Successful completion: fire listeners ascending by order. The
    /// capture flush converts the buffer into jobs written to job storage
    /// as part of this commit.
    pub async fn commit(mut self) -> Result<()> {
        self.listeners.sort_by_key(CloseListenerKind::order);
        let listeners = std::mem::take(&mut self.listeners);

        for kind in listeners {
            match kind {
                CloseListenerKind::Diagnostics => {
                    debug!(
                        "Unit of work {} committed ({} captured events)",
                        self.id,
                        self.buffered_events()
                    );
                }
                CloseListenerKind::CaptureFlush => {
                    if let Some(session) = self.session.take() {
                        let jobs = session.into_jobs(&self.capture_config)?;
                        self.job_storage.store_jobs(jobs).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Failed completion: fire the failure callbacks instead. Buffered
    /// events are discarded after the terminal commit-failed diagnostic;
    /// nothing reaches job storage.
    pub fn rollback(mut self, reason: &str) {
        self.listeners.sort_by_key(CloseListenerKind::order);
        let listeners = std::mem::take(&mut self.listeners);

        for kind in listeners {
            match kind {
                CloseListenerKind::Diagnostics => {
                    warn!("Unit of work {} rolled back: {}", self.id, reason);
                }
                CloseListenerKind::CaptureFlush => {
                    if let Some(session) = self.session.take() {
                        session.commit_failed(reason);
                    }
                }
            }
        }
    }
}
