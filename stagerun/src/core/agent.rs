//! Agent configuration and per-agent stage output.

use serde::{Deserialize, Serialize};

use super::status::AgentStatus;

/// Message stored on an errored agent when the producer sent none.
pub const UNKNOWN_AGENT_ERROR: &str = "Unknown error";

/// A single claim extracted from an agent's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// The claim itself.
    pub text: String,
    /// Supporting evidence.
    #[serde(default)]
    pub evidence: String,
    /// Confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
    /// Where the evidence came from.
    #[serde(default)]
    pub source: String,
}

/// One agent's contribution to a stage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Record id. Empty for outputs synthesised from the stream.
    #[serde(default)]
    pub id: String,
    /// The agent that produced this output. Unique within a stage result.
    pub agent_id: String,
    /// Display name.
    pub agent_name: String,
    /// Stage number.
    #[serde(default)]
    pub stage: u32,
    /// Owning project.
    #[serde(default)]
    pub project_id: String,
    /// Free text, empty until complete.
    #[serde(default)]
    pub content: String,
    /// Claims in the order the agent made them.
    #[serde(default)]
    pub claims: Vec<Claim>,
    /// Progress of this agent.
    #[serde(default)]
    pub status: AgentStatus,
    /// Failure message; only present when `status` is `Error`.
    #[serde(default)]
    pub error: Option<String>,
    /// Creation time as sent by the service.
    #[serde(default)]
    pub created_at: String,
}

impl AgentOutput {
    /// Creates a running output for an agent that just started.
    #[must_use]
    pub fn running(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            stage: 0,
            project_id: String::new(),
            content: String::new(),
            claims: Vec::new(),
            status: AgentStatus::Running,
            error: None,
            created_at: String::new(),
        }
    }

    /// Returns true if the agent failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == AgentStatus::Error
    }
}

/// A configured participant in future stage runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short role description.
    pub role: String,
    /// The lens the agent argues from.
    #[serde(default)]
    pub perspective: String,
    /// Prompt used for every run.
    pub system_prompt: String,
    /// The stage this agent participates in.
    pub stage: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Model identifier.
    #[serde(default)]
    pub model: String,
    /// Agents this one is expected to disagree with.
    #[serde(default)]
    pub conflict_partners: Vec<String>,
    /// Whether the agent takes part in runs.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Project scope; `None` for global agents.
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_enabled() -> bool {
    true
}

/// Body for creating an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAgentRequest {
    /// Display name.
    pub name: String,
    /// Short role description.
    pub role: String,
    /// The lens the agent argues from.
    #[serde(default)]
    pub perspective: String,
    /// Prompt used for every run.
    pub system_prompt: String,
    /// The stage this agent participates in.
    pub stage: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Model identifier; the service default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Agents this one is expected to disagree with.
    #[serde(default)]
    pub conflict_partners: Vec<String>,
    /// Project scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl CreateAgentRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        system_prompt: impl Into<String>,
        stage: u32,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            perspective: String::new(),
            system_prompt: system_prompt.into(),
            stage,
            temperature: default_temperature(),
            model: None,
            conflict_partners: Vec::new(),
            project_id: None,
        }
    }

    /// Scopes the agent to a project.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Sets the perspective.
    #[must_use]
    pub fn with_perspective(mut self, perspective: impl Into<String>) -> Self {
        self.perspective = perspective.into();
        self
    }
}

/// Partial update of an agent. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateAgentRequest {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// New perspective.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    /// New prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// New temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// New model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// New conflict partners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_partners: Option<Vec<String>>,
    /// Enable or disable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
