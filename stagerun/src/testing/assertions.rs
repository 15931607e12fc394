//! Assertions over stage results.

use std::collections::HashSet;

use crate::core::{AgentStatus, StageResult, StageStatus};

/// Asserts the stage status.
pub fn assert_stage_status(result: &StageResult, expected: StageStatus) {
    assert_eq!(
        result.status, expected,
        "Expected stage status {expected}, got {}",
        result.status
    );
}

/// Asserts an agent's output exists and has the expected status.
pub fn assert_agent_status(result: &StageResult, agent_id: &str, expected: AgentStatus) {
    let output = result.output(agent_id).unwrap_or_else(|| {
        panic!(
            "Expected an output for agent '{agent_id}', found: {:?}",
            result.agent_outputs.iter().map(|o| &o.agent_id).collect::<Vec<_>>()
        )
    });
    assert_eq!(
        output.status, expected,
        "Expected agent '{agent_id}' to be {expected:?}, got {:?}",
        output.status
    );
}

/// Asserts no agent id appears twice.
pub fn assert_unique_agents(result: &StageResult) {
    let mut seen = HashSet::new();
    for output in &result.agent_outputs {
        assert!(
            seen.insert(output.agent_id.as_str()),
            "Agent '{}' appears more than once",
            output.agent_id
        );
    }
}

/// Asserts the stored override text.
pub fn assert_override(result: &StageResult, expected: &str) {
    assert_eq!(
        result.human_override.as_deref(),
        Some(expected),
        "Unexpected human override"
    );
}
