//! Run lifecycle notices and the sinks that receive them.
//!
//! Sinks observe what a controller did (run started, event folded, approval
//! accepted...). They never influence the run; a failing or slow sink must
//! not affect reconciliation.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, Level};
use uuid::Uuid;

/// Notice names emitted by the controller.
pub mod names {
    /// A run was accepted by the gate and the stream is opening.
    pub const RUN_STARTED: &str = "stage_run.started";
    /// A stream event was folded into the draft.
    pub const RUN_EVENT: &str = "stage_run.event";
    /// The terminal event arrived and the authoritative state was refetched.
    pub const RUN_COMPLETED: &str = "stage_run.completed";
    /// The run aborted on a transport failure.
    pub const RUN_FAILED: &str = "stage_run.failed";
    /// The run was cancelled by the operator.
    pub const RUN_CANCELLED: &str = "stage_run.cancelled";
    /// The stage was approved.
    pub const STAGE_APPROVED: &str = "stage.approved";
    /// A human override was saved.
    pub const OVERRIDE_SAVED: &str = "stage.override_saved";
    /// A final report was generated.
    pub const REPORT_GENERATED: &str = "report.generated";
}

/// One lifecycle notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunNotice {
    /// Notice name, one of [`names`].
    pub name: &'static str,
    /// The run this notice belongs to, when it concerns a run.
    pub run_id: Option<Uuid>,
    /// Project id.
    pub project_id: String,
    /// Stage number.
    pub stage_number: u32,
    /// Extra structured detail.
    pub data: serde_json::Value,
}

impl RunNotice {
    /// Creates a notice with no extra data.
    #[must_use]
    pub fn new(name: &'static str, project_id: impl Into<String>, stage_number: u32) -> Self {
        Self {
            name,
            run_id: None,
            project_id: project_id.into(),
            stage_number,
            data: serde_json::Value::Null,
        }
    }

    /// Attaches the run id.
    #[must_use]
    pub fn with_run(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Receiver of run lifecycle notices.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits a notice asynchronously.
    async fn emit(&self, notice: RunNotice);

    /// Emits a notice without blocking. Must never panic.
    fn try_emit(&self, notice: &RunNotice);
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _notice: RunNotice) {}

    fn try_emit(&self, _notice: &RunNotice) {}
}

/// Writes notices to the tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at `level`. Anything but DEBUG logs at INFO.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log(&self, notice: &RunNotice) {
        let run_id = notice.run_id.map(|id| id.to_string());
        if self.level == Level::DEBUG {
            debug!(
                notice = notice.name,
                run_id = ?run_id,
                project_id = %notice.project_id,
                stage = notice.stage_number,
                data = %notice.data,
                "{}", notice.name
            );
        } else {
            info!(
                notice = notice.name,
                run_id = ?run_id,
                project_id = %notice.project_id,
                stage = notice.stage_number,
                data = %notice.data,
                "{}", notice.name
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, notice: RunNotice) {
        self.log(&notice);
    }

    fn try_emit(&self, notice: &RunNotice) {
        self.log(notice);
    }
}

/// Keeps every notice in memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    notices: parking_lot::RwLock<Vec<RunNotice>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<RunNotice> {
        self.notices.read().clone()
    }

    /// Names of all notices, in arrival order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.notices.read().iter().map(|n| n.name).collect()
    }

    /// Notices whose name starts with `prefix`.
    #[must_use]
    pub fn notices_of_type(&self, prefix: &str) -> Vec<RunNotice> {
        self.notices
            .read()
            .iter()
            .filter(|n| n.name.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of notices received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.read().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.read().is_empty()
    }

    /// Forgets every notice.
    pub fn clear(&self) {
        self.notices.write().clear();
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, notice: RunNotice) {
        self.notices.write().push(notice);
    }

    fn try_emit(&self, notice: &RunNotice) {
        self.notices.write().push(notice.clone());
    }
}
