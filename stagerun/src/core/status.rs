//! Stage, agent and project status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of one stage's execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// No run has finished yet.
    #[default]
    Pending,
    /// Agents are executing.
    Running,
    /// Agents and conflict analysis finished; awaiting approval.
    Complete,
    /// An operator accepted the stage output.
    Approved,
    /// The stage was skipped.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Approved => write!(f, "approved"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Position in the forward lifecycle, used to check monotonicity.
    ///
    /// `Skipped` sits beside `Approved` as a final state.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Complete => 2,
            Self::Approved | Self::Skipped => 3,
        }
    }

    /// Returns true once no further run may start on this stage.
    #[must_use]
    pub fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Skipped)
    }
}

/// The status of a single agent's contribution to a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Not started.
    #[default]
    Pending,
    /// Producing output.
    Running,
    /// Produced output.
    Complete,
    /// Failed; see `AgentOutput::error`.
    Error,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl AgentStatus {
    /// Returns true if the agent has reached a terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Overall progress of a research project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// Created, no stage run yet.
    #[default]
    Draft,
    /// At least one stage has been run.
    InProgress,
    /// The final stage was approved.
    Complete,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
        }
    }
}
