//! Orchestration of stage runs for front ends.
//!
//! [`StageRunController`] ties the event stream, the reducer and the gate
//! together and publishes a [`StageSnapshot`] after every change.
//! [`ReportGenerator`] handles the long-running report request.

mod report;
mod run;
mod snapshot;

pub use report::{Report, ReportGenerator};
pub use run::{RunSummary, StageRunController};
pub use snapshot::{StageSnapshot, StageTab};
