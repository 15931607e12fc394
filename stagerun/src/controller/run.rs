//! The stage run controller.

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::snapshot::{StageSnapshot, StageTab};
use crate::cancellation::CancellationToken;
use crate::client::StageBackend;
use crate::core::{StageResult, StageStatus};
use crate::errors::{GateError, StagerunError};
use crate::events::{decode_event_stream, names, EventSink, NoOpEventSink, RunNotice};
use crate::gate::{check_override, ApproveOutcome, OverrideForm, StageGate};
use crate::observability::{RunSpanAttributes, SpanTimer};
use crate::reducer::{reduce, start_draft, Reduction, RunEffect, RunPhase};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Id of the run.
    pub run_id: Uuid,
    /// Number of events folded, including the terminal one.
    pub events: u64,
    /// The refetched authoritative result.
    pub result: Option<StageResult>,
    /// Message carried by the terminal event.
    pub message: Option<String>,
    /// Run duration in milliseconds.
    pub duration_ms: f64,
}

/// How the event loop of a run ended.
enum StreamEnd {
    Finished { message: Option<String> },
    Cancelled(String),
    Failed(StagerunError),
}

/// Resets the running flag and drops the cancel token however a run ends.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    cancel: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancel.lock().take();
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Drives one stage of a project: runs, cancellation, approval and
/// overrides.
///
/// The controller is the single writer of the draft during a run. Front
/// ends read the state through [`StageRunController::subscribe`] and never
/// mutate it. Only one run may be active at a time; a second request is
/// rejected, not queued.
pub struct StageRunController {
    backend: Arc<dyn StageBackend>,
    sink: Arc<dyn EventSink>,
    state: watch::Sender<StageSnapshot>,
    authoritative: Mutex<Option<StageResult>>,
    running: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

impl StageRunController {
    /// Creates a controller for `(project_id, stage_number)`.
    ///
    /// Nothing is fetched until [`StageRunController::load`] is called.
    pub fn new(
        backend: Arc<dyn StageBackend>,
        project_id: impl Into<String>,
        stage_number: u32,
    ) -> Self {
        let (state, _) = watch::channel(StageSnapshot::new(project_id, stage_number));
        Self {
            backend,
            sink: Arc::new(NoOpEventSink),
            state,
            authoritative: Mutex::new(None),
            running: AtomicBool::new(false),
            cancel: Mutex::new(None),
        }
    }

    /// Sets the sink receiving lifecycle notices.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<StageSnapshot> {
        self.state.subscribe()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> StageSnapshot {
        self.state.borrow().clone()
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The last authoritative result, ignoring any draft.
    pub fn authoritative(&self) -> Option<StageResult> {
        self.authoritative.lock().clone()
    }

    fn ids(&self) -> (String, u32) {
        let snapshot = self.state.borrow();
        (snapshot.project_id.clone(), snapshot.stage_number)
    }

    fn gate(&self) -> StageGate {
        let (_, stage_number) = self.ids();
        StageGate::new(stage_number, self.authoritative.lock().as_ref(), self.is_running())
    }

    fn publish(&self, update: impl FnOnce(&mut StageSnapshot)) {
        self.state.send_modify(update);
    }

    fn publish_error(&self, err: &StagerunError) {
        let message = err.user_message();
        self.publish(|s| s.error = Some(message));
    }

    fn notice(&self, name: &'static str) -> RunNotice {
        let (project_id, stage_number) = self.ids();
        RunNotice::new(name, project_id, stage_number)
    }

    /// Fetches the authoritative result and publishes it.
    ///
    /// Also prefills the override form. While a run is active the draft
    /// stays published and only the stored result and form are updated. A
    /// failure is published as the snapshot error and returned.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors from the fetch.
    pub async fn load(&self) -> Result<Option<StageResult>, StagerunError> {
        let (project_id, stage_number) = self.ids();
        match self.backend.get_stage_result(&project_id, stage_number).await {
            Ok(result) => {
                if self.is_running() {
                    self.store_authoritative(result.clone());
                } else {
                    self.accept_authoritative(result.clone());
                }
                Ok(result)
            }
            Err(err) => {
                warn!(
                    project_id = %project_id,
                    stage = stage_number,
                    error = %err,
                    "Failed to load stage result"
                );
                self.publish_error(&err);
                Err(err)
            }
        }
    }

    /// Records a fetched result without touching the published draft.
    fn store_authoritative(&self, result: Option<StageResult>) {
        let form = OverrideForm::from_result(result.as_ref());
        *self.authoritative.lock() = result;
        self.publish(|s| s.override_form = form);
    }

    fn accept_authoritative(&self, result: Option<StageResult>) {
        *self.authoritative.lock() = result.clone();
        let form = OverrideForm::from_result(result.as_ref());
        self.publish(|s| {
            s.result = result;
            s.override_form = form;
        });
    }

    /// Returns a handle that cancels the current or next run.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.lock().get_or_insert_with(CancellationToken::new).clone()
    }

    /// Cancels the active run, if any.
    pub fn cancel(&self, reason: &str) {
        if let Some(token) = self.cancel.lock().as_ref() {
            token.cancel(reason);
        }
    }

    /// Runs the stage to completion.
    ///
    /// Opens the event stream, folds each event into a draft published on
    /// every step, and on the terminal event discards the draft and
    /// refetches the authoritative result. A transport failure or a stream
    /// that ends early aborts the run and keeps the previous authoritative
    /// result; so does cancellation.
    ///
    /// # Errors
    ///
    /// - `Gate` if the status does not allow a run or one is active
    /// - `Transport`/`Api`/`Serialization` if the run failed
    /// - `Cancelled` if the run was cancelled
    pub async fn run(&self) -> Result<RunSummary, StagerunError> {
        self.gate().check_run()?;
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            let (_, stage) = self.ids();
            return Err(GateError::RunInProgress { stage }.into());
        }
        let _guard = RunGuard {
            running: &self.running,
            cancel: &self.cancel,
        };

        let token = self.cancel_handle();
        let run_id = Uuid::new_v4();
        let (project_id, stage_number) = self.ids();
        let timer = SpanTimer::start("stage_run");

        let draft = start_draft(self.authoritative.lock().as_ref(), &project_id, stage_number);
        self.publish(|s| {
            s.result = Some(draft.clone());
            s.running = true;
            s.phase = RunPhase::Starting;
            s.run_id = Some(run_id);
            s.error = None;
        });
        info!(
            run_id = %run_id,
            project_id = %project_id,
            stage = stage_number,
            "Stage run started"
        );
        self.sink.emit(self.notice(names::RUN_STARTED).with_run(run_id)).await;

        let (end, events) = self.consume(&token, run_id, draft, &project_id, stage_number).await;
        let attributes =
            RunSpanAttributes::new(run_id, &project_id, stage_number).with_events(events);

        match end {
            StreamEnd::Finished { message } => {
                self.publish(|s| s.phase = RunPhase::Refreshing);
                let refreshed = self.backend.get_stage_result(&project_id, stage_number).await;
                let duration_ms = timer.finish();
                match refreshed {
                    Ok(result) => {
                        self.accept_authoritative(result.clone());
                        self.publish(|s| {
                            s.running = false;
                            s.phase = RunPhase::Idle;
                        });
                        let attrs = attributes
                            .with_outcome("complete")
                            .with_duration_ms(duration_ms);
                        info!(run_id = %run_id, events, duration_ms, "Stage run completed");
                        self.sink
                            .emit(
                                self.notice(names::RUN_COMPLETED)
                                    .with_run(run_id)
                                    .with_data(json!(attrs.to_attributes())),
                            )
                            .await;
                        Ok(RunSummary {
                            run_id,
                            events,
                            result,
                            message,
                            duration_ms,
                        })
                    }
                    Err(err) => {
                        let attrs = attributes.with_duration_ms(duration_ms);
                        Err(self.fail_run(run_id, attrs, err).await)
                    }
                }
            }
            StreamEnd::Failed(err) => {
                let attrs = attributes.with_duration_ms(timer.finish());
                Err(self.fail_run(run_id, attrs, err).await)
            }
            StreamEnd::Cancelled(reason) => {
                self.restore_authoritative();
                info!(run_id = %run_id, reason = %reason, "Stage run cancelled");
                self.sink
                    .emit(
                        self.notice(names::RUN_CANCELLED)
                            .with_run(run_id)
                            .with_data(json!({ "reason": reason, "events": events })),
                    )
                    .await;
                Err(StagerunError::cancelled(reason))
            }
        }
    }

    /// Reads the stream until the terminal event, cancellation or failure.
    async fn consume(
        &self,
        token: &CancellationToken,
        run_id: Uuid,
        mut draft: StageResult,
        project_id: &str,
        stage_number: u32,
    ) -> (StreamEnd, u64) {
        let cancelled = |token: &CancellationToken| {
            StreamEnd::Cancelled(token.reason().unwrap_or_else(|| "cancelled".to_string()))
        };

        let opened = tokio::select! {
            biased;
            () = token.cancelled() => return (cancelled(token), 0),
            opened = self.backend.open_stage_stream(project_id, stage_number) => opened,
        };
        let mut events = match opened {
            Ok(bytes) => decode_event_stream(bytes),
            Err(err) => return (StreamEnd::Failed(err), 0),
        };

        let mut folded = 0;
        loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => return (cancelled(token), folded),
                next = events.next() => next,
            };

            let event = match next {
                Some(Ok(event)) => event,
                Some(Err(err)) => return (StreamEnd::Failed(err), folded),
                None => {
                    return (
                        StreamEnd::Failed(StagerunError::transport(
                            "event stream ended before stage_complete",
                        )),
                        folded,
                    )
                }
            };

            folded += 1;
            debug!(
                run_id = %run_id,
                event = %event.kind(),
                agent_id = ?event.agent_id(),
                "Folding event"
            );
            let Reduction { draft: next_draft, effect } = reduce(draft, &event);
            draft = next_draft;

            let published = draft.clone();
            match effect {
                Some(RunEffect::Finish { message, .. }) => {
                    return (StreamEnd::Finished { message }, folded);
                }
                Some(RunEffect::Phase(phase)) => self.publish(|s| {
                    s.result = Some(published);
                    s.phase = phase;
                }),
                Some(RunEffect::FocusDebate) => self.publish(|s| {
                    s.result = Some(published);
                    s.tab = StageTab::Debate;
                }),
                None => self.publish(|s| s.result = Some(published)),
            }
            self.sink.try_emit(
                &self
                    .notice(names::RUN_EVENT)
                    .with_run(run_id)
                    .with_data(json!({ "event": event.kind().as_str() })),
            );
        }
    }

    fn restore_authoritative(&self) {
        let result = self.authoritative.lock().clone();
        self.publish(|s| {
            s.result = result;
            s.running = false;
            s.phase = RunPhase::Idle;
        });
    }

    async fn fail_run(
        &self,
        run_id: Uuid,
        attrs: RunSpanAttributes,
        err: StagerunError,
    ) -> StagerunError {
        self.restore_authoritative();
        self.publish_error(&err);
        let attrs = attrs.with_outcome("failed").with_error(err.to_string());
        warn!(run_id = %run_id, error = %err, "Stage run failed");
        self.sink
            .emit(
                self.notice(names::RUN_FAILED)
                    .with_run(run_id)
                    .with_data(json!(attrs.to_attributes())),
            )
            .await;
        err
    }

    /// Approves the stage.
    ///
    /// On [`ApproveOutcome::Advance`] the controller moves to the next stage
    /// with fresh state; call [`StageRunController::load`] to fetch it. On
    /// the other outcomes the authoritative result is refetched; if that
    /// refetch fails the error is published and the stage is marked
    /// approved locally, since the server already accepted it.
    ///
    /// # Errors
    ///
    /// - `Gate` if the stage is not `complete` or a run is active; nothing
    ///   is sent
    /// - `Api` with the server's message if it rejected the approval
    /// - transport errors
    pub async fn approve(&self) -> Result<ApproveOutcome, StagerunError> {
        self.gate().check_approve()?;
        let (project_id, stage_number) = self.ids();

        let response = match self.backend.approve_stage(&project_id, stage_number).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    project_id = %project_id,
                    stage = stage_number,
                    error = %err,
                    "Approval rejected"
                );
                self.publish_error(&err);
                return Err(err);
            }
        };

        let outcome = ApproveOutcome::from(&response);
        info!(project_id = %project_id, stage = stage_number, outcome = ?outcome, "Stage approved");
        self.sink
            .emit(self.notice(names::STAGE_APPROVED).with_data(json!({
                "complete": response.complete,
                "next_stage": response.next_stage,
            })))
            .await;

        match outcome {
            ApproveOutcome::Advance(next) => self.reset_to(next),
            ApproveOutcome::ProjectComplete | ApproveOutcome::Approved => {
                if let Err(err) = self.load().await {
                    warn!(
                        project_id = %project_id,
                        stage = stage_number,
                        error = %err,
                        "Refetch after approval failed; marking approved locally"
                    );
                    self.mark_approved();
                }
            }
        }
        Ok(outcome)
    }

    /// Applies an approval the server accepted when the refetch failed.
    fn mark_approved(&self) {
        let result = {
            let mut authoritative = self.authoritative.lock();
            if let Some(result) = authoritative.as_mut() {
                result.status = StageStatus::Approved;
            }
            authoritative.clone()
        };
        self.publish(|s| s.result = result);
    }

    /// Saves a human override and refetches the result.
    ///
    /// Does not change the stage status and does not require a finished
    /// run.
    ///
    /// # Errors
    ///
    /// - `Gate(EmptyOverride)` for empty or whitespace content; nothing is
    ///   sent
    /// - `Api` with the server's message if it rejected the override
    /// - transport errors
    pub async fn save_override(
        &self,
        content: &str,
        notes: &str,
    ) -> Result<Option<StageResult>, StagerunError> {
        check_override(content)?;
        let (project_id, stage_number) = self.ids();

        if let Err(err) = self
            .backend
            .save_override(&project_id, stage_number, content, notes)
            .await
        {
            warn!(
                project_id = %project_id,
                stage = stage_number,
                error = %err,
                "Override rejected"
            );
            self.publish_error(&err);
            return Err(err);
        }

        info!(project_id = %project_id, stage = stage_number, "Override saved");
        self.sink
            .emit(self.notice(names::OVERRIDE_SAVED).with_data(json!({ "length": content.len() })))
            .await;
        self.publish(|s| s.error = None);
        self.load().await
    }

    /// Replaces the override editor contents without saving.
    pub fn edit_override(&self, content: impl Into<String>, notes: impl Into<String>) {
        let form = OverrideForm::new(content, notes);
        self.publish(|s| s.override_form = form);
    }

    /// Switches the active tab.
    pub fn select_tab(&self, tab: StageTab) {
        self.publish(|s| s.tab = tab);
    }

    /// Clears the published error.
    pub fn dismiss_error(&self) {
        self.publish(|s| s.error = None);
    }

    /// Shows another stage of the same project and loads it.
    ///
    /// # Errors
    ///
    /// `Gate(RunInProgress)` while a run is active; otherwise fetch errors.
    pub async fn open_stage(
        &self,
        stage_number: u32,
    ) -> Result<Option<StageResult>, StagerunError> {
        if self.is_running() {
            let (_, stage) = self.ids();
            return Err(GateError::RunInProgress { stage }.into());
        }
        self.reset_to(stage_number);
        self.load().await
    }

    /// Moves to `stage_number` with no carried-over state.
    fn reset_to(&self, stage_number: u32) {
        *self.authoritative.lock() = None;
        self.publish(|s| {
            let project_id = std::mem::take(&mut s.project_id);
            *s = StageSnapshot::new(project_id, stage_number);
        });
    }
}

impl std::fmt::Debug for StageRunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (project_id, stage_number) = self.ids();
        f.debug_struct("StageRunController")
            .field("project_id", &project_id)
            .field("stage_number", &stage_number)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
