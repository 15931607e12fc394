//! Conflict report produced by the cross-agent analysis step.
//!
//! The client treats a report as immutable once attached to a stage result.

use serde::{Deserialize, Serialize};

/// One agent's stance within a disagreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPosition {
    /// Name of the agent holding the position.
    pub agent_name: String,
    /// The position itself.
    pub position: String,
    /// Supporting evidence.
    #[serde(default)]
    pub evidence: String,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// A topic the agents agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementPoint {
    /// Topic label.
    pub topic: String,
    /// Summary of the shared view.
    pub summary: String,
    /// Names of agreeing agents.
    #[serde(default)]
    pub supporting_agents: Vec<String>,
    /// Evidence cited.
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// A topic the agents disagree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisagreementPoint {
    /// Topic label.
    pub topic: String,
    /// Summary of the disagreement.
    pub summary: String,
    /// The competing positions.
    #[serde(default)]
    pub positions: Vec<AgentPosition>,
}

/// Agreement, disagreement and tension among the agent outputs of a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Stage number the report belongs to.
    #[serde(default)]
    pub stage: u32,
    /// Points of agreement.
    #[serde(default)]
    pub agreements: Vec<AgreementPoint>,
    /// Points of disagreement.
    #[serde(default)]
    pub disagreements: Vec<DisagreementPoint>,
    /// Open questions no agent resolved.
    #[serde(default)]
    pub unresolved_tensions: Vec<String>,
    /// Overall synthesis.
    #[serde(default)]
    pub synthesis: String,
}

impl ConflictReport {
    /// Returns true if the report carries no findings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
            && self.disagreements.is_empty()
            && self.unresolved_tensions.is_empty()
            && self.synthesis.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_wire() {
        let report: ConflictReport = serde_json::from_value(serde_json::json!({
            "stage": 3,
            "agreements": [{
                "topic": "Sample size",
                "summary": "Too small",
                "supporting_agents": ["Statistician", "Skeptic"]
            }],
            "disagreements": [{
                "topic": "Causality",
                "summary": "Direction unclear",
                "positions": [
                    {"agent_name": "Statistician", "position": "Correlational", "confidence": 0.8},
                    {
                        "agent_name": "Clinician",
                        "position": "Causal",
                        "evidence": "RCT",
                        "confidence": 0.6
                    }
                ]
            }],
            "unresolved_tensions": ["Generalisability"],
            "synthesis": "Mixed"
        }))
        .unwrap();

        assert_eq!(report.stage, 3);
        assert_eq!(report.agreements[0].supporting_agents.len(), 2);
        assert!(report.agreements[0].evidence.is_empty());
        assert_eq!(report.disagreements[0].positions[0].evidence, "");
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_report() {
        assert!(ConflictReport::default().is_empty());
    }
}
