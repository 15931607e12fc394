//! Access to the research service.
//!
//! [`StageBackend`] is the seam the controller runs against. The `http`
//! feature provides [`ApiClient`], which also exposes the project and agent
//! management endpoints used by front ends.

mod backend;
mod config;
#[cfg(feature = "http")]
mod http;
mod models;

#[cfg(test)]
pub use backend::MockStageBackend;
pub use backend::{ByteStream, StageBackend};
pub use config::{ClientConfig, ENV_API_URL, ENV_REPORT_TIMEOUT, ENV_REQUEST_TIMEOUT};
#[cfg(feature = "http")]
pub use http::ApiClient;
pub use models::{ApproveResponse, OkResponse, OverrideRequest, ReportResponse, ToggleResponse};
