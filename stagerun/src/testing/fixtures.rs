//! Canned stream bodies, results and reports.

use serde_json::{json, Value};

use crate::core::{
    AgentOutput, AgentPosition, AgentStatus, AgreementPoint, Claim, ConflictReport,
    DisagreementPoint,
    StageResult, StageStatus,
};

/// Encodes one stream frame.
#[must_use]
pub fn sse_frame(event: &str, data: &Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

/// A conflict report with one agreement, one disagreement and a tension.
#[must_use]
pub fn sample_conflict_report(stage: u32) -> ConflictReport {
    ConflictReport {
        stage,
        agreements: vec![AgreementPoint {
            topic: "Scope".into(),
            summary: "The question is well bounded.".into(),
            supporting_agents: vec!["Analyst".into(), "Skeptic".into()],
            evidence: vec!["Interview 3".into()],
        }],
        disagreements: vec![DisagreementPoint {
            topic: "Sample size".into(),
            summary: "Agents differ on whether 12 interviews suffice.".into(),
            positions: vec![
                AgentPosition {
                    agent_name: "Analyst".into(),
                    position: "Sufficient for saturation.".into(),
                    evidence: "Themes stopped emerging after 9.".into(),
                    confidence: 0.7,
                },
                AgentPosition {
                    agent_name: "Skeptic".into(),
                    position: "Too few for the stated population.".into(),
                    evidence: String::new(),
                    confidence: 0.6,
                },
            ],
        }],
        unresolved_tensions: vec!["Budget versus depth".into()],
        synthesis: "Proceed, but flag the sample as a limitation.".into(),
    }
}

/// The stream body of a run where `a1` completes and `a2` times out.
#[must_use]
pub fn two_agent_stream(project_id: &str, stage: u32) -> String {
    let report = sample_conflict_report(stage);
    [
        sse_frame(
            "stage_start",
            &json!({"project_id": project_id, "stage_number": stage, "agent_count": 2}),
        ),
        sse_frame("agent_start", &json!({"agent_id": "a1", "agent_name": "Analyst"})),
        sse_frame("agent_start", &json!({"agent_id": "a2", "agent_name": "Skeptic"})),
        sse_frame(
            "agent_complete",
            &json!({
                "agent_id": "a1",
                "agent_name": "Analyst",
                "content": "The evidence points to onboarding friction.",
                "claims": [{
                    "text": "Onboarding is the bottleneck",
                    "evidence": "Interview 3",
                    "confidence": 0.8,
                    "source": "interviews"
                }],
                "content_length": 43
            }),
        ),
        sse_frame(
            "agent_error",
            &json!({"agent_id": "a2", "agent_name": "Skeptic", "error": "timeout"}),
        ),
        sse_frame("conflict_start", &json!({})),
        sse_frame("conflict_complete", &json!({ "conflict_report": report })),
        sse_frame(
            "stage_complete",
            &json!({"status": "complete", "stage_result_id": "sr-1", "message": "Stage complete"}),
        ),
    ]
    .concat()
}

/// The authoritative result persisted after [`two_agent_stream`].
#[must_use]
pub fn completed_result(project_id: &str, stage: u32) -> StageResult {
    let mut result = StageResult::pending(project_id, stage);
    result.id = "sr-1".into();
    result.status = StageStatus::Complete;
    result.created_at = "2025-03-14T09:26:53+00:00".into();

    let mut a1 = AgentOutput::running("a1", "Analyst");
    a1.id = "out-1".into();
    a1.stage = stage;
    a1.project_id = project_id.into();
    a1.status = AgentStatus::Complete;
    a1.content = "The evidence points to onboarding friction.".into();
    a1.claims = vec![Claim {
        text: "Onboarding is the bottleneck".into(),
        evidence: "Interview 3".into(),
        confidence: 0.8,
        source: "interviews".into(),
    }];

    let mut a2 = AgentOutput::running("a2", "Skeptic");
    a2.id = "out-2".into();
    a2.stage = stage;
    a2.project_id = project_id.into();
    a2.status = AgentStatus::Error;
    a2.error = Some("timeout".into());

    result.agent_outputs = vec![a1, a2];
    result.conflict_report = Some(sample_conflict_report(stage));
    result
}

/// A report exercising every block kind.
pub const SAMPLE_REPORT: &str = "\
# Research Report

## Key Findings

- Onboarding is the main source of churn
- Support load peaks in week one
- Power users want keyboard shortcuts

1. Redesign the first-run flow
2. Add in-product guidance

> Users abandon setup when asked for billing details first.

---

The team should treat **onboarding** as the *primary* lever; see `funnel.csv` and the [dashboard](https://example.com/funnel).
";
