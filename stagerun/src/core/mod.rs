//! Core domain model types.
//!
//! This module contains the records exchanged with the research service:
//! - Stage, agent and project status enums
//! - Stage results and the stage catalogue
//! - Agent outputs, agent configuration and conflict reports

mod agent;
mod conflict;
mod project;
mod stage;
mod status;

pub use agent::{
    AgentConfig, AgentOutput, Claim, CreateAgentRequest, UpdateAgentRequest, UNKNOWN_AGENT_ERROR,
};
pub use conflict::{AgentPosition, AgreementPoint, ConflictReport, DisagreementPoint};
pub use project::{CreateProjectRequest, Project};
pub use stage::{StageInfo, StageResult, FINAL_STAGE, STAGES};
pub use status::{AgentStatus, ProjectState, StageStatus};
