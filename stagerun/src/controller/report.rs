//! Final report generation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::StageBackend;
use crate::errors::StagerunError;
use crate::events::{names, EventSink, NoOpEventSink, RunNotice};
use crate::markdown::{parse_blocks, Block};
use crate::observability::SpanTimer;

/// A generated report and its parsed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The report as markdown.
    pub markdown: String,
    /// The parsed blocks.
    pub blocks: Vec<Block>,
}

impl Report {
    /// Parses a markdown report.
    #[must_use]
    pub fn parse(markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let blocks = parse_blocks(&markdown);
        Self { markdown, blocks }
    }
}

/// Generates a project's report and keeps the last good one.
///
/// A failed generation leaves the previous report in place; only a
/// successful one replaces it.
pub struct ReportGenerator {
    backend: Arc<dyn StageBackend>,
    sink: Arc<dyn EventSink>,
    project_id: String,
    report: RwLock<Option<Arc<Report>>>,
    last_error: RwLock<Option<String>>,
    generating: AtomicBool,
}

impl ReportGenerator {
    /// Creates a generator for a project.
    pub fn new(backend: Arc<dyn StageBackend>, project_id: impl Into<String>) -> Self {
        Self {
            backend,
            sink: Arc::new(NoOpEventSink),
            project_id: project_id.into(),
            report: RwLock::new(None),
            last_error: RwLock::new(None),
            generating: AtomicBool::new(false),
        }
    }

    /// Sets the sink receiving lifecycle notices.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The last successfully generated report.
    pub fn report(&self) -> Option<Arc<Report>> {
        self.report.read().clone()
    }

    /// The message of the last failed generation, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Whether a generation request is in flight.
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    /// Requests a new report.
    ///
    /// # Errors
    ///
    /// Returns the transport or API error; the previous report is kept.
    pub async fn generate(&self) -> Result<Arc<Report>, StagerunError> {
        self.generating.store(true, Ordering::SeqCst);
        let timer = SpanTimer::start("report");
        let outcome = self.backend.generate_report(&self.project_id).await;
        self.generating.store(false, Ordering::SeqCst);

        match outcome {
            Ok(markdown) => {
                let report = Arc::new(Report::parse(markdown));
                let duration_ms = timer.finish();
                info!(
                    project_id = %self.project_id,
                    blocks = report.blocks.len(),
                    duration_ms,
                    "Report generated"
                );
                *self.report.write() = Some(Arc::clone(&report));
                *self.last_error.write() = None;
                self.sink
                    .emit(RunNotice::new(names::REPORT_GENERATED, &self.project_id, 0).with_data(
                        serde_json::json!({
                            "blocks": report.blocks.len(),
                            "duration_ms": duration_ms
                        }),
                    ))
                    .await;
                Ok(report)
            }
            Err(err) => {
                warn!(project_id = %self.project_id, error = %err, "Report generation failed");
                *self.last_error.write() = Some(err.user_message());
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("project_id", &self.project_id)
            .field("has_report", &self.report.read().is_some())
            .field("generating", &self.is_generating())
            .finish_non_exhaustive()
    }
}
