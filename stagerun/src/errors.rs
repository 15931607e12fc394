//! Error types for stage runs.
//!
//! The taxonomy follows how failures are surfaced to an operator:
//! per-agent failures never appear here (they live on the `AgentOutput`),
//! transport failures abort a run, validation failures are rejected locally,
//! and server rejections are carried verbatim.

use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::StageStatus;
use crate::utils::timestamps::TimestampError;

/// The main error type for stagerun operations.
#[derive(Debug, Error)]
pub enum StagerunError {
    /// A local gate rejected the requested action. No network call was made.
    #[error("{0}")]
    Gate(#[from] GateError),

    /// The server answered with a non-success status.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The connection failed or the stream ended unexpectedly.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The run was cancelled before a terminal event arrived.
    #[error("Stage run cancelled: {0}")]
    Cancelled(String),

    /// A configuration value was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A timestamp could not be parsed.
    #[error("{0}")]
    Timestamp(#[from] TimestampError),
}

impl StagerunError {
    /// Creates a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true if the error was produced locally, before any network call.
    #[must_use]
    pub fn is_local_rejection(&self) -> bool {
        matches!(self, Self::Gate(_))
    }

    /// The message shown to an operator.
    ///
    /// Server rejections are surfaced verbatim: the server's `detail` when it
    /// sent one, otherwise the status line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::Gate(err) => err.to_dict(),
            Self::Api(err) => err.to_dict(),
            Self::Transport(_) => HashMap::from([("type".to_string(), json!("Transport"))]),
            Self::Cancelled(_) => HashMap::from([("type".to_string(), json!("Cancelled"))]),
            Self::Config(_) => HashMap::from([("type".to_string(), json!("Config"))]),
            Self::Serialization(_) => {
                HashMap::from([("type".to_string(), json!("Serialization"))])
            }
            Self::Timestamp(_) => HashMap::from([("type".to_string(), json!("Timestamp"))]),
        };
        map.entry("message".to_string())
            .or_insert_with(|| json!(self.to_string()));
        map
    }
}

impl From<serde_json::Error> for StagerunError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for StagerunError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Actions rejected by the approval/override gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// A run is already streaming for this stage.
    #[error("A run is already in progress for stage {stage}")]
    RunInProgress {
        /// The stage number.
        stage: u32,
    },

    /// The stage status does not allow starting a run.
    #[error("Stage {stage} cannot be run while {status}")]
    RunNotAllowed {
        /// The stage number.
        stage: u32,
        /// The current status.
        status: StageStatus,
    },

    /// The stage status does not allow approval.
    #[error("Stage {stage} must be complete before approving (currently {status})")]
    ApproveNotAllowed {
        /// The stage number.
        stage: u32,
        /// The current status.
        status: StageStatus,
    },

    /// The override content was empty.
    #[error("Override content must not be empty")]
    EmptyOverride,
}

impl GateError {
    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::RunInProgress { stage } => {
                map.insert("type".to_string(), json!("RunInProgress"));
                map.insert("stage".to_string(), json!(stage));
            }
            Self::RunNotAllowed { stage, status } => {
                map.insert("type".to_string(), json!("RunNotAllowed"));
                map.insert("stage".to_string(), json!(stage));
                map.insert("status".to_string(), json!(status.to_string()));
            }
            Self::ApproveNotAllowed { stage, status } => {
                map.insert("type".to_string(), json!("ApproveNotAllowed"));
                map.insert("stage".to_string(), json!(stage));
                map.insert("status".to_string(), json!(status.to_string()));
            }
            Self::EmptyOverride => {
                map.insert("type".to_string(), json!("EmptyOverride"));
            }
        }

        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}

/// A non-success HTTP response from the research service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API error {status}: {body}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// The server's `detail` message, if the body carried one.
    pub detail: Option<String>,
    /// The raw response body.
    pub body: String,
}

impl ApiError {
    /// Creates an API error from a status code and raw body.
    ///
    /// A JSON body of the form `{"detail": "..."}` has its detail extracted.
    #[must_use]
    pub fn from_body(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));
        Self {
            status,
            detail,
            body,
        }
    }

    /// The message shown to an operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.detail
            .clone()
            .unwrap_or_else(|| format!("HTTP error {}", self.status))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), json!("Api"));
        map.insert("status".to_string(), json!(self.status));
        if let Some(ref detail) = self.detail {
            map.insert("detail".to_string(), json!(detail));
        }
        map.insert("message".to_string(), json!(self.to_string()));
        map
    }
}
