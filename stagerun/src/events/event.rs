//! Typed stage run events decoded from stream frames.
//!
//! An event lives only between being parsed and being folded into the
//! draft; it is never stored.

use serde::Deserialize;
use std::fmt;

use crate::core::{Claim, ConflictReport};

/// The event names the stream may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `stage_start`
    StageStart,
    /// `agent_start`
    AgentStart,
    /// `agent_complete`
    AgentComplete,
    /// `agent_error`
    AgentError,
    /// `conflict_start`
    ConflictStart,
    /// `conflict_complete`
    ConflictComplete,
    /// `stage_complete`
    StageComplete,
}

impl EventKind {
    /// Parses an event-type token. Unknown tokens yield `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "stage_start" => Some(Self::StageStart),
            "agent_start" => Some(Self::AgentStart),
            "agent_complete" => Some(Self::AgentComplete),
            "agent_error" => Some(Self::AgentError),
            "conflict_start" => Some(Self::ConflictStart),
            "conflict_complete" => Some(Self::ConflictComplete),
            "stage_complete" => Some(Self::StageComplete),
            _ => None,
        }
    }

    /// The wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StageStart => "stage_start",
            Self::AgentStart => "agent_start",
            Self::AgentComplete => "agent_complete",
            Self::AgentError => "agent_error",
            Self::ConflictStart => "conflict_start",
            Self::ConflictComplete => "conflict_complete",
            Self::StageComplete => "stage_complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete event of a stage run.
#[derive(Debug, Clone, PartialEq)]
pub enum StageRunEvent {
    /// The run began.
    StageStart {
        /// Number of enabled agents, when reported.
        agent_count: Option<u32>,
    },
    /// An agent began work.
    AgentStart {
        /// Agent id.
        agent_id: String,
        /// Display name.
        agent_name: String,
    },
    /// An agent produced output.
    AgentComplete {
        /// Agent id.
        agent_id: String,
        /// Display name, if sent.
        agent_name: Option<String>,
        /// Output text, if sent.
        content: Option<String>,
        /// Claims, if sent.
        claims: Option<Vec<Claim>>,
    },
    /// An agent failed.
    AgentError {
        /// Agent id.
        agent_id: String,
        /// Display name, if sent.
        agent_name: Option<String>,
        /// Failure message, if sent.
        error: Option<String>,
    },
    /// Cross-agent analysis began.
    ConflictStart,
    /// Cross-agent analysis finished.
    ConflictComplete {
        /// The report, when the payload carried a decodable one.
        report: Option<ConflictReport>,
    },
    /// Terminal event; nothing follows.
    StageComplete {
        /// Final status reported by the producer.
        status: Option<String>,
        /// Id of the persisted stage result.
        stage_result_id: Option<String>,
        /// Informational message.
        message: Option<String>,
    },
}

#[derive(Deserialize)]
struct StageStartPayload {
    #[serde(default)]
    agent_count: Option<u32>,
}

#[derive(Deserialize)]
struct AgentStartPayload {
    agent_id: String,
    #[serde(default)]
    agent_name: Option<String>,
}

#[derive(Deserialize)]
struct AgentCompletePayload {
    agent_id: String,
    #[serde(default)]
    agent_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    claims: Option<Vec<Claim>>,
}

#[derive(Deserialize)]
struct AgentErrorPayload {
    agent_id: String,
    #[serde(default)]
    agent_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct StageCompletePayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    stage_result_id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StageRunEvent {
    /// Decodes the `data` payload of a frame whose event type is `kind`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload is not valid JSON or lacks a
    /// required field such as `agent_id`.
    pub fn decode(kind: EventKind, data: &str) -> Result<Self, serde_json::Error> {
        let event = match kind {
            EventKind::StageStart => {
                let p: StageStartPayload = serde_json::from_str(data)?;
                Self::StageStart {
                    agent_count: p.agent_count,
                }
            }
            EventKind::AgentStart => {
                let p: AgentStartPayload = serde_json::from_str(data)?;
                let agent_name = p.agent_name.unwrap_or_else(|| p.agent_id.clone());
                Self::AgentStart {
                    agent_id: p.agent_id,
                    agent_name,
                }
            }
            EventKind::AgentComplete => {
                let p: AgentCompletePayload = serde_json::from_str(data)?;
                Self::AgentComplete {
                    agent_id: p.agent_id,
                    agent_name: p.agent_name,
                    content: p.content,
                    claims: p.claims,
                }
            }
            EventKind::AgentError => {
                let p: AgentErrorPayload = serde_json::from_str(data)?;
                Self::AgentError {
                    agent_id: p.agent_id,
                    agent_name: p.agent_name,
                    error: p.error,
                }
            }
            EventKind::ConflictStart => {
                serde_json::from_str::<serde_json::Value>(data)?;
                Self::ConflictStart
            }
            EventKind::ConflictComplete => {
                let value: serde_json::Value = serde_json::from_str(data)?;
                Self::ConflictComplete {
                    report: extract_report(value),
                }
            }
            EventKind::StageComplete => {
                let p: StageCompletePayload = serde_json::from_str(data)?;
                Self::StageComplete {
                    status: p.status,
                    stage_result_id: p.stage_result_id,
                    message: p.message,
                }
            }
        };
        Ok(event)
    }

    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::StageStart { .. } => EventKind::StageStart,
            Self::AgentStart { .. } => EventKind::AgentStart,
            Self::AgentComplete { .. } => EventKind::AgentComplete,
            Self::AgentError { .. } => EventKind::AgentError,
            Self::ConflictStart => EventKind::ConflictStart,
            Self::ConflictComplete { .. } => EventKind::ConflictComplete,
            Self::StageComplete { .. } => EventKind::StageComplete,
        }
    }

    /// The agent this event concerns, if any.
    #[must_use]
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::AgentStart { agent_id, .. }
            | Self::AgentComplete { agent_id, .. }
            | Self::AgentError { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }

    /// Returns true for the terminal `stage_complete` event.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StageComplete { .. })
    }
}

/// Keys whose presence as arrays marks a payload as a report itself.
const REPORT_LIST_KEYS: [&str; 3] = ["agreements", "disagreements", "unresolved_tensions"];

fn extract_report(value: serde_json::Value) -> Option<ConflictReport> {
    if let Some(nested) = value.get("conflict_report") {
        if nested.is_null() {
            return None;
        }
        return serde_json::from_value(nested.clone()).ok();
    }

    let shaped_like_report = REPORT_LIST_KEYS
        .iter()
        .any(|key| value.get(key).is_some_and(serde_json::Value::is_array));
    if shaped_like_report {
        serde_json::from_value(value).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for name in [
            "stage_start",
            "agent_start",
            "agent_complete",
            "agent_error",
            "conflict_start",
            "conflict_complete",
            "stage_complete",
        ] {
            assert_eq!(EventKind::parse(name).map(EventKind::as_str), Some(name));
        }
        assert_eq!(EventKind::parse("agent_thinking"), None);
    }

    #[test]
    fn test_agent_start_name_falls_back_to_id() {
        let event = StageRunEvent::decode(EventKind::AgentStart, r#"{"agent_id":"a1"}"#).unwrap();
        assert_eq!(
            event,
            StageRunEvent::AgentStart {
                agent_id: "a1".to_string(),
                agent_name: "a1".to_string()
            }
        );
    }

    #[test]
    fn test_agent_complete_with_backend_fields() {
        let data = concat!(
            r#"{"agent_id":"a1","agent_name":"Skeptic","#,
            r#""timestamp":"t","stage":1,"content_length":120}"#,
        );
        let event = StageRunEvent::decode(EventKind::AgentComplete, data).unwrap();

        match event {
            StageRunEvent::AgentComplete {
                content, claims, ..
            } => {
                assert!(content.is_none());
                assert!(claims.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_missing_agent_id_is_an_error() {
        assert!(StageRunEvent::decode(EventKind::AgentError, r#"{"error":"x"}"#).is_err());
    }

    #[test]
    fn test_conflict_complete_nested_report() {
        let data = r#"{"conflict_report":{"stage":1,"synthesis":"All agree"}}"#;
        let event = StageRunEvent::decode(EventKind::ConflictComplete, data).unwrap();
        match event {
            StageRunEvent::ConflictComplete { report: Some(report) } => {
                assert_eq!(report.synthesis, "All agree");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_conflict_complete_payload_is_report() {
        let data = concat!(
            r#"{"stage":2,"agreements":[],"disagreements":[],"#,
            r#""unresolved_tensions":["x"],"synthesis":"s"}"#,
        );
        let event = StageRunEvent::decode(EventKind::ConflictComplete, data).unwrap();
        match event {
            StageRunEvent::ConflictComplete { report: Some(report) } => {
                assert_eq!(report.unresolved_tensions, vec!["x".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_conflict_complete_counts_only() {
        let data = concat!(
            r#"{"project_id":"p","stage_number":1,"#,
            r#""agreements":2,"disagreements":1,"synthesis":"s"}"#,
        );
        let event = StageRunEvent::decode(EventKind::ConflictComplete, data).unwrap();
        assert_eq!(event, StageRunEvent::ConflictComplete { report: None });
    }

    #[test]
    fn test_stage_complete_is_terminal() {
        let event =
            StageRunEvent::decode(EventKind::StageComplete, r#"{"status":"complete"}"#).unwrap();
        assert!(event.is_terminal());
        assert_eq!(event.kind(), EventKind::StageComplete);
        assert!(event.agent_id().is_none());
    }
}
