//! Approval and override gating.
//!
//! Every user action is checked here against the authoritative stage status
//! before any request leaves the process. A rejected action changes nothing.

use serde::Serialize;

use crate::client::ApproveResponse;
use crate::core::{StageResult, StageStatus, FINAL_STAGE};
use crate::errors::GateError;

/// Legal-action view of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageGate {
    stage_number: u32,
    status: StageStatus,
    running: bool,
}

impl StageGate {
    /// Builds the gate for a stage. A missing result counts as `pending`.
    #[must_use]
    pub fn new(stage_number: u32, result: Option<&StageResult>, running: bool) -> Self {
        Self {
            stage_number,
            status: result.map_or(StageStatus::Pending, |r| r.status),
            running,
        }
    }

    /// The status the gate decides on.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        self.status
    }

    /// A run may start: status is `pending` or `complete` and none is active.
    #[must_use]
    pub fn can_run(&self) -> bool {
        !self.running && matches!(self.status, StageStatus::Pending | StageStatus::Complete)
    }

    /// The stage may be approved: status is `complete` and no run is active.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        !self.running && self.status == StageStatus::Complete
    }

    /// The stage has been approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == StageStatus::Approved
    }

    /// This is the last stage of the process.
    #[must_use]
    pub fn is_final_stage(&self) -> bool {
        self.stage_number >= FINAL_STAGE
    }

    /// Checks that a run may start.
    ///
    /// # Errors
    ///
    /// `RunInProgress` while a run is active, `RunNotAllowed` for any status
    /// other than `pending` or `complete`.
    pub fn check_run(&self) -> Result<(), GateError> {
        if self.running {
            return Err(GateError::RunInProgress {
                stage: self.stage_number,
            });
        }
        if !self.can_run() {
            return Err(GateError::RunNotAllowed {
                stage: self.stage_number,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Checks that the stage may be approved.
    ///
    /// # Errors
    ///
    /// `RunInProgress` while a run is active, `ApproveNotAllowed` unless the
    /// status is `complete`.
    pub fn check_approve(&self) -> Result<(), GateError> {
        if self.running {
            return Err(GateError::RunInProgress {
                stage: self.stage_number,
            });
        }
        if !self.can_approve() {
            return Err(GateError::ApproveNotAllowed {
                stage: self.stage_number,
                status: self.status,
            });
        }
        Ok(())
    }
}

/// Checks override content. Status is irrelevant: an override may be saved
/// before, during review of, or after a run.
///
/// # Errors
///
/// `EmptyOverride` when the content is empty or whitespace only.
pub fn check_override(content: &str) -> Result<(), GateError> {
    if content.trim().is_empty() {
        return Err(GateError::EmptyOverride);
    }
    Ok(())
}

/// The editable override fields of a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideForm {
    /// Override text.
    pub content: String,
    /// Notes.
    pub notes: String,
}

impl OverrideForm {
    /// Creates a form.
    #[must_use]
    pub fn new(content: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            notes: notes.into(),
        }
    }

    /// Prefills the form from an authoritative result.
    #[must_use]
    pub fn from_result(result: Option<&StageResult>) -> Self {
        result.map_or_else(Self::default, |r| Self {
            content: r.human_override.clone().unwrap_or_default(),
            notes: r.human_notes.clone(),
        })
    }

    /// Returns true if the content is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// What an accepted approval means for navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveOutcome {
    /// The final stage was approved; the project is done.
    ProjectComplete,
    /// Move to the given stage with fresh state.
    Advance(u32),
    /// Approved without navigation guidance; stay and refetch.
    Approved,
}

impl From<&ApproveResponse> for ApproveOutcome {
    fn from(response: &ApproveResponse) -> Self {
        if response.complete == Some(true) {
            Self::ProjectComplete
        } else if let Some(next) = response.next_stage {
            Self::Advance(next)
        } else {
            Self::Approved
        }
    }
}
