//! Testing utilities for stage runs.
//!
//! This module provides:
//! - An in-memory backend with scripted streams
//! - Stream bodies and results for common scenarios
//! - Assertions over stage results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_agent_status, assert_override, assert_stage_status, assert_unique_agents,
};
pub use fixtures::{
    completed_result, sample_conflict_report, sse_frame, two_agent_stream, SAMPLE_REPORT,
};
pub use mocks::{BackendCall, ScriptedBackend, StreamEnd, StreamScript};
