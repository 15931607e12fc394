//! Stage execution records and the fixed stage catalogue.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::agent::AgentOutput;
use super::conflict::ConflictReport;
use super::status::StageStatus;
use crate::utils::timestamps::{parse_timestamp, Timestamp, TimestampError};

/// Number of the last stage in the research process.
pub const FINAL_STAGE: u32 = 6;

/// Static description of one numbered stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInfo {
    /// Stage number, 1-based.
    pub number: u32,
    /// Display name.
    pub name: &'static str,
    /// What the stage is for.
    pub description: &'static str,
}

/// The six stages of the research process, in order.
pub const STAGES: [StageInfo; 6] = [
    StageInfo {
        number: 1,
        name: "Problem Framing",
        description: "Define the research question, scope, and stakeholder landscape.",
    },
    StageInfo {
        number: 2,
        name: "Evidence Gathering",
        description: "Identify and gather evidence from multiple sources.",
    },
    StageInfo {
        number: 3,
        name: "Analysis & Interpretation",
        description: "Analyze evidence through multiple lenses, surface patterns and conflicts.",
    },
    StageInfo {
        number: 4,
        name: "Insight Synthesis",
        description: "Synthesize findings into actionable insights with confidence levels.",
    },
    StageInfo {
        number: 5,
        name: "Communication",
        description: "Generate tailored deliverables for different audiences.",
    },
    StageInfo {
        number: 6,
        name: "Prototype & Intervention Design",
        description: "Design interventions and prototypes grounded in research findings.",
    },
];

impl StageInfo {
    /// Looks up a stage by number.
    #[must_use]
    pub fn get(number: u32) -> Option<&'static Self> {
        STAGES.iter().find(|s| s.number == number)
    }

    /// Display name for any stage number, `Stage N` when unknown.
    #[must_use]
    pub fn name_for(number: u32) -> Cow<'static, str> {
        Self::get(number).map_or_else(
            || Cow::Owned(format!("Stage {number}")),
            |s| Cow::Borrowed(s.name),
        )
    }
}

/// The execution record for one (project, stage number) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Record id; empty for a local draft.
    #[serde(default)]
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Stage number.
    pub stage_number: u32,
    /// Lifecycle status.
    #[serde(default)]
    pub status: StageStatus,
    /// Per-agent outputs, unique by `agent_id`.
    #[serde(default)]
    pub agent_outputs: Vec<AgentOutput>,
    /// Present once every agent reached a terminal state and analysis ran.
    #[serde(default)]
    pub conflict_report: Option<ConflictReport>,
    /// Human-authored substitute for the agents' output.
    #[serde(default)]
    pub human_override: Option<String>,
    /// Notes accompanying the override.
    #[serde(default)]
    pub human_notes: String,
    /// Set when the stage is approved.
    #[serde(default)]
    pub approved_at: Option<String>,
    /// Creation time as sent by the service.
    #[serde(default)]
    pub created_at: String,
}

impl StageResult {
    /// A fresh record for a stage nobody has run yet.
    #[must_use]
    pub fn pending(project_id: impl Into<String>, stage_number: u32) -> Self {
        Self {
            id: String::new(),
            project_id: project_id.into(),
            stage_number,
            status: StageStatus::Pending,
            agent_outputs: Vec::new(),
            conflict_report: None,
            human_override: None,
            human_notes: String::new(),
            approved_at: None,
            created_at: String::new(),
        }
    }

    /// Finds the output for an agent.
    #[must_use]
    pub fn output(&self, agent_id: &str) -> Option<&AgentOutput> {
        self.agent_outputs.iter().find(|o| o.agent_id == agent_id)
    }

    /// Finds the output for an agent, mutably.
    pub fn output_mut(&mut self, agent_id: &str) -> Option<&mut AgentOutput> {
        self.agent_outputs.iter_mut().find(|o| o.agent_id == agent_id)
    }

    /// Returns true if every agent output reached a terminal state.
    #[must_use]
    pub fn all_agents_terminal(&self) -> bool {
        self.agent_outputs.iter().all(|o| o.status.is_terminal())
    }

    /// Returns true if a non-empty human override is attached.
    #[must_use]
    pub fn has_override(&self) -> bool {
        self.human_override.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Display name of this stage.
    #[must_use]
    pub fn stage_name(&self) -> Cow<'static, str> {
        StageInfo::name_for(self.stage_number)
    }

    /// Parsed approval time.
    ///
    /// # Errors
    ///
    /// Returns `TimestampError` if the service sent an unparseable timestamp.
    pub fn approved_at_time(&self) -> Result<Option<Timestamp>, TimestampError> {
        self.approved_at.as_deref().map(parse_timestamp).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AgentStatus;

    #[test]
    fn test_stage_catalogue() {
        assert_eq!(StageInfo::name_for(1), "Problem Framing");
        assert_eq!(StageInfo::name_for(6), "Prototype & Intervention Design");
        assert_eq!(StageInfo::name_for(9), "Stage 9");
        assert_eq!(STAGES.last().map(|s| s.number), Some(FINAL_STAGE));
    }

    #[test]
    fn test_pending_result() {
        let result = StageResult::pending("p1", 2);
        assert_eq!(result.status, StageStatus::Pending);
        assert!(result.agent_outputs.is_empty());
        assert!(result.conflict_report.is_none());
        assert!(!result.has_override());
        assert!(result.all_agents_terminal());
    }

    #[test]
    fn test_output_lookup() {
        let mut result = StageResult::pending("p1", 1);
        result.agent_outputs.push(AgentOutput::running("a1", "Skeptic"));

        assert!(result.output("a1").is_some());
        assert!(result.output("a2").is_none());
        assert!(!result.all_agents_terminal());

        result.output_mut("a1").unwrap().status = AgentStatus::Complete;
        assert!(result.all_agents_terminal());
    }

    #[test]
    fn test_whitespace_override_is_not_an_override() {
        let mut result = StageResult::pending("p1", 1);
        result.human_override = Some("   ".to_string());
        assert!(!result.has_override());
        result.human_override = Some("My synthesis".to_string());
        assert!(result.has_override());
    }

    #[test]
    fn test_approved_at_time() {
        let mut result = StageResult::pending("p1", 1);
        assert_eq!(result.approved_at_time(), Ok(None));

        result.approved_at = Some("2025-03-14T09:26:53.589793+00:00".to_string());
        assert!(result.approved_at_time().unwrap().is_some());

        result.approved_at = Some("not a time".to_string());
        assert!(result.approved_at_time().is_err());
    }

    #[test]
    fn test_stage_result_from_wire() {
        let result: StageResult = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "project_id": "p1",
            "stage_number": 1,
            "status": "complete",
            "agent_outputs": [],
            "conflict_report": null,
            "human_override": null,
            "human_notes": "",
            "approved_at": null,
            "created_at": "2025-03-14T09:26:53+00:00"
        }))
        .unwrap();
        assert_eq!(result.status, StageStatus::Complete);
    }
}
