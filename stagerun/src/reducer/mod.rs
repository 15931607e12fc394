//! Pure fold of stage run events into a draft stage result.
//!
//! [`reduce`] takes the current draft and one event and returns the next
//! draft plus at most one effect for the controller to act on. It performs
//! no I/O and reads no clock, so replaying the same event sequence from the
//! same starting draft always yields an equal draft.

mod reducer_tests;

use serde::Serialize;
use std::fmt;

use crate::core::{AgentOutput, AgentStatus, StageResult, StageStatus, UNKNOWN_AGENT_ERROR};
use crate::events::StageRunEvent;

/// Coarse progress indicator of an active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// No run is active.
    #[default]
    Idle,
    /// The stream is opening; no event has arrived yet.
    Starting,
    /// Agents are producing output.
    AgentsRunning,
    /// Cross-agent analysis is in progress.
    AnalyzingConflicts,
    /// The run finished and the authoritative result is being fetched.
    Refreshing,
}

impl RunPhase {
    /// The wire/display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::AgentsRunning => "agents_running",
            Self::AnalyzingConflicts => "analyzing_conflicts",
            Self::Refreshing => "refreshing",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the controller must do after a fold step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEffect {
    /// Publish a new phase indicator.
    Phase(RunPhase),
    /// A conflict report arrived; the UI should switch to the debate view.
    FocusDebate,
    /// Terminal: stop reading the stream and refetch authoritative state.
    Finish {
        /// Status reported by the producer.
        status: Option<String>,
        /// Id of the persisted stage result.
        stage_result_id: Option<String>,
        /// Informational message.
        message: Option<String>,
    },
}

impl RunEffect {
    /// Returns true for [`RunEffect::Finish`].
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }
}

/// Result of one fold step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// The draft after the event.
    pub draft: StageResult,
    /// What the controller should do next, if anything.
    pub effect: Option<RunEffect>,
}

impl Reduction {
    fn new(draft: StageResult, effect: RunEffect) -> Self {
        Self {
            draft,
            effect: Some(effect),
        }
    }

    fn unchanged(draft: StageResult) -> Self {
        Self {
            draft,
            effect: None,
        }
    }
}

/// Builds the draft a run starts from.
///
/// With a prior result its outputs, report and override are kept and only
/// the status is forced to `running`; without one a fresh empty draft for
/// `(project_id, stage_number)` is created.
#[must_use]
pub fn start_draft(
    prior: Option<&StageResult>,
    project_id: &str,
    stage_number: u32,
) -> StageResult {
    let mut draft = prior.map_or_else(
        || StageResult::pending(project_id, stage_number),
        Clone::clone,
    );
    draft.status = StageStatus::Running;
    draft
}

/// Folds one event into the draft.
#[must_use]
pub fn reduce(mut draft: StageResult, event: &StageRunEvent) -> Reduction {
    match event {
        StageRunEvent::StageStart { .. } => {
            Reduction::new(draft, RunEffect::Phase(RunPhase::AgentsRunning))
        }

        StageRunEvent::AgentStart { agent_id, agent_name } => {
            if draft.output(agent_id).is_none() {
                let output = new_output(&draft, agent_id, agent_name);
                draft.agent_outputs.push(output);
            }
            Reduction::new(draft, RunEffect::Phase(RunPhase::AgentsRunning))
        }

        StageRunEvent::AgentComplete {
            agent_id,
            agent_name,
            content,
            claims,
        } => {
            let output = locate_or_synthesize(&mut draft, agent_id, agent_name.as_deref());
            if let Some(content) = content.as_deref().filter(|c| !c.is_empty()) {
                output.content = content.to_string();
            }
            if let Some(claims) = claims {
                output.claims.clone_from(claims);
            }
            output.status = AgentStatus::Complete;
            output.error = None;
            Reduction::unchanged(draft)
        }

        StageRunEvent::AgentError {
            agent_id,
            agent_name,
            error,
        } => {
            let output = locate_or_synthesize(&mut draft, agent_id, agent_name.as_deref());
            let message = error
                .as_deref()
                .filter(|e| !e.is_empty())
                .unwrap_or(UNKNOWN_AGENT_ERROR);
            output.status = AgentStatus::Error;
            output.error = Some(message.to_string());
            Reduction::unchanged(draft)
        }

        StageRunEvent::ConflictStart => {
            Reduction::new(draft, RunEffect::Phase(RunPhase::AnalyzingConflicts))
        }

        StageRunEvent::ConflictComplete { report } => {
            if let Some(report) = report {
                draft.conflict_report = Some(report.clone());
            }
            Reduction::new(draft, RunEffect::FocusDebate)
        }

        StageRunEvent::StageComplete {
            status,
            stage_result_id,
            message,
        } => Reduction::new(
            draft,
            RunEffect::Finish {
                status: status.clone(),
                stage_result_id: stage_result_id.clone(),
                message: message.clone(),
            },
        ),
    }
}

/// Folds a whole sequence, stopping after the terminal event.
///
/// Returns the final draft and whether the terminal event was seen.
#[must_use]
pub fn replay<'a, I>(initial: StageResult, events: I) -> (StageResult, bool)
where
    I: IntoIterator<Item = &'a StageRunEvent>,
{
    let mut draft = initial;
    for event in events {
        let Reduction { draft: next, effect } = reduce(draft, event);
        draft = next;
        if effect.as_ref().is_some_and(RunEffect::is_terminal) {
            return (draft, true);
        }
    }
    (draft, false)
}

fn new_output(draft: &StageResult, agent_id: &str, agent_name: &str) -> AgentOutput {
    let mut output = AgentOutput::running(agent_id, agent_name);
    output.stage = draft.stage_number;
    output.project_id.clone_from(&draft.project_id);
    output
}

/// Finds the output for `agent_id`, creating it when the start was missed.
fn locate_or_synthesize<'d>(
    draft: &'d mut StageResult,
    agent_id: &str,
    agent_name: Option<&str>,
) -> &'d mut AgentOutput {
    let index = match draft.agent_outputs.iter().position(|o| o.agent_id == agent_id) {
        Some(index) => index,
        None => {
            let output = new_output(draft, agent_id, agent_name.unwrap_or(agent_id));
            draft.agent_outputs.push(output);
            draft.agent_outputs.len() - 1
        }
    };
    &mut draft.agent_outputs[index]
}
