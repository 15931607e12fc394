//! # Stagerun
//!
//! Client-side engine for staged multi-agent research runs.
//!
//! A research project moves through six stages. Running a stage starts a
//! set of agents on the research service, which reports progress as a
//! server-sent event stream. Stagerun:
//!
//! - **Decodes the stream** into typed events, independent of chunking
//! - **Folds events into a draft** stage result with a pure reducer
//! - **Reconciles** the draft with the authoritative result once the run ends
//! - **Gates approval and overrides** so invalid actions never reach the network
//! - **Parses the final report** markdown into renderable blocks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagerun::prelude::*;
//! use std::sync::Arc;
//!
//! let client = Arc::new(ApiClient::from_env()?);
//! let controller = StageRunController::new(client, "project-id", 1);
//! controller.load().await?;
//!
//! let summary = controller.run().await?;
//! if controller.snapshot().can_approve() {
//!     controller.approve().await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod client;
pub mod controller;
pub mod core;
pub mod errors;
pub mod events;
pub mod gate;
pub mod markdown;
pub mod observability;
pub mod reducer;
pub mod testing;
pub mod utils;

mod integration_tests;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    #[cfg(feature = "http")]
    pub use crate::client::ApiClient;
    pub use crate::client::{ApproveResponse, ClientConfig, StageBackend};
    pub use crate::controller::{
        Report, ReportGenerator, RunSummary, StageRunController, StageSnapshot, StageTab,
    };
    pub use crate::core::{
        AgentConfig, AgentOutput, AgentStatus, ConflictReport, Project, StageInfo, StageResult,
        StageStatus, FINAL_STAGE, STAGES,
    };
    pub use crate::errors::{ApiError, GateError, StagerunError};
    pub use crate::events::{
        decode_event_stream, EventKind, EventSink, LoggingEventSink, NoOpEventSink,
        StageRunEvent,
    };
    pub use crate::gate::{check_override, ApproveOutcome, OverrideForm, StageGate};
    pub use crate::markdown::{parse_blocks, to_plain_text, Block, Inline};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::reducer::{reduce, replay, start_draft, RunEffect, RunPhase};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
