//! Response bodies of the request/response endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST .../approve`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveResponse {
    /// Whether the server accepted the approval.
    #[serde(default)]
    pub ok: bool,
    /// Set when the final stage was approved.
    #[serde(default)]
    pub complete: Option<bool>,
    /// The stage to move to next.
    #[serde(default)]
    pub next_stage: Option<u32>,
}

impl ApproveResponse {
    /// An approval that finished the project.
    #[must_use]
    pub fn project_complete() -> Self {
        Self {
            ok: true,
            complete: Some(true),
            next_stage: None,
        }
    }

    /// An approval that advances to `next_stage`.
    #[must_use]
    pub fn advance(next_stage: u32) -> Self {
        Self {
            ok: true,
            complete: None,
            next_stage: Some(next_stage),
        }
    }
}

/// Body of `PUT .../override` and `DELETE` endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    /// Success flag.
    #[serde(default)]
    pub ok: bool,
}

/// Body of `POST /api/agents/{id}/toggle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    /// Success flag.
    #[serde(default)]
    pub ok: bool,
    /// The agent's new enabled state.
    pub enabled: bool,
}

/// Body of `POST /api/projects/{id}/report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    /// Success flag.
    #[serde(default)]
    pub ok: bool,
    /// The report as markdown.
    pub report: String,
}

/// Request body of `PUT .../override`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Override text.
    pub content: String,
    /// Notes.
    #[serde(default)]
    pub notes: String,
}
