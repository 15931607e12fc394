//! Read-only view of a stage published to front ends.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::core::{AgentOutput, AgentStatus, StageInfo, StageResult};
use crate::gate::{OverrideForm, StageGate};
use crate::reducer::RunPhase;

/// The views a stage screen can show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageTab {
    /// Per-agent outputs.
    #[default]
    Outputs,
    /// The conflict report.
    Debate,
    /// The human override editor.
    Override,
}

impl StageTab {
    /// Every tab, in display order.
    pub const ALL: [Self; 3] = [Self::Outputs, Self::Debate, Self::Override];

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Outputs => "Agent Outputs",
            Self::Debate => "Debate",
            Self::Override => "Override",
        }
    }
}

impl fmt::Display for StageTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything a front end needs to render one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    /// Project id.
    pub project_id: String,
    /// Stage number currently shown.
    pub stage_number: u32,
    /// The draft while a run is active, the authoritative result otherwise.
    pub result: Option<StageResult>,
    /// Run progress.
    pub phase: RunPhase,
    /// Active tab.
    pub tab: StageTab,
    /// Whether a run is active.
    pub running: bool,
    /// Id of the active or last run.
    pub run_id: Option<Uuid>,
    /// Last user-visible error.
    pub error: Option<String>,
    /// Override editor contents.
    pub override_form: OverrideForm,
}

impl StageSnapshot {
    /// The initial view of a stage nothing is known about yet.
    #[must_use]
    pub fn new(project_id: impl Into<String>, stage_number: u32) -> Self {
        Self {
            project_id: project_id.into(),
            stage_number,
            result: None,
            phase: RunPhase::Idle,
            tab: StageTab::Outputs,
            running: false,
            run_id: None,
            error: None,
            override_form: OverrideForm::default(),
        }
    }

    /// The gate for the shown result.
    #[must_use]
    pub fn gate(&self) -> StageGate {
        StageGate::new(self.stage_number, self.result.as_ref(), self.running)
    }

    /// See [`StageGate::can_run`].
    #[must_use]
    pub fn can_run(&self) -> bool {
        self.gate().can_run()
    }

    /// See [`StageGate::can_approve`].
    #[must_use]
    pub fn can_approve(&self) -> bool {
        self.gate().can_approve()
    }

    /// See [`StageGate::is_approved`].
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.gate().is_approved()
    }

    /// See [`StageGate::is_final_stage`].
    #[must_use]
    pub fn is_final_stage(&self) -> bool {
        self.gate().is_final_stage()
    }

    /// Static information about the shown stage.
    #[must_use]
    pub fn stage_info(&self) -> Option<&'static StageInfo> {
        StageInfo::get(self.stage_number)
    }

    /// Agent outputs of the shown result.
    #[must_use]
    pub fn agent_outputs(&self) -> &[AgentOutput] {
        self.result.as_ref().map_or(&[][..], |r| r.agent_outputs.as_slice())
    }

    /// Ids of agents still working.
    #[must_use]
    pub fn active_agents(&self) -> Vec<&str> {
        self.agent_outputs()
            .iter()
            .filter(|o| o.status == AgentStatus::Running)
            .map(|o| o.agent_id.as_str())
            .collect()
    }
}
