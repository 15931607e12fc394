//! The seam between the controller and the research service.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::models::ApproveResponse;
use crate::core::StageResult;
use crate::errors::StagerunError;

/// Raw body chunks of a stage run stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, StagerunError>>;

/// The operations the stage run controller needs from the service.
///
/// Implemented over HTTP by `ApiClient` and in memory by
/// `testing::ScriptedBackend`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageBackend: Send + Sync {
    /// Fetches the authoritative result of one stage; `None` if never run.
    async fn get_stage_result(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<Option<StageResult>, StagerunError>;

    /// Opens the event stream of a new run of the stage.
    async fn open_stage_stream(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ByteStream, StagerunError>;

    /// Approves a completed stage.
    async fn approve_stage(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ApproveResponse, StagerunError>;

    /// Stores a human override on the stage. Does not change its status.
    async fn save_override(
        &self,
        project_id: &str,
        stage_number: u32,
        content: &str,
        notes: &str,
    ) -> Result<(), StagerunError>;

    /// Generates the final report as markdown. Long running.
    async fn generate_report(&self, project_id: &str) -> Result<String, StagerunError>;
}
