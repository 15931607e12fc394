//! Research projects.

use serde::{Deserialize, Serialize};

use super::stage::StageResult;
use super::status::ProjectState;

/// A research project and all its stage results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The question the project investigates.
    pub research_question: String,
    /// Free-form background.
    #[serde(default)]
    pub context: String,
    /// Overall progress.
    #[serde(default)]
    pub state: ProjectState,
    /// Stage the project is on.
    #[serde(default = "default_current_stage")]
    pub current_stage: u32,
    /// One record per stage that has been run.
    #[serde(default)]
    pub stage_results: Vec<StageResult>,
    /// Creation time.
    #[serde(default)]
    pub created_at: String,
    /// Last update time.
    #[serde(default)]
    pub updated_at: String,
}

fn default_current_stage() -> u32 {
    1
}

impl Project {
    /// The stored result for a stage, if it has been run.
    #[must_use]
    pub fn stage_result(&self, stage_number: u32) -> Option<&StageResult> {
        self.stage_results
            .iter()
            .find(|r| r.stage_number == stage_number)
    }
}

/// Body for creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    /// Display name.
    pub name: String,
    /// The question to investigate.
    pub research_question: String,
    /// Optional background.
    #[serde(default)]
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageStatus;

    #[test]
    fn test_project_defaults() {
        let project: Project = serde_json::from_str(
            r#"{"id":"p1","name":"Sleep","research_question":"Why do teens sleep late?"}"#,
        )
        .unwrap();

        assert_eq!(project.current_stage, 1);
        assert_eq!(project.state, ProjectState::Draft);
        assert!(project.stage_result(1).is_none());
    }

    #[test]
    fn test_stage_result_lookup() {
        let mut project: Project = serde_json::from_str(
            r#"{"id":"p1","name":"Sleep","research_question":"q"}"#,
        )
        .unwrap();
        let mut result = StageResult::pending("p1", 2);
        result.status = StageStatus::Complete;
        project.stage_results.push(result);

        assert_eq!(project.stage_result(2).map(|r| r.status), Some(StageStatus::Complete));
    }
}
