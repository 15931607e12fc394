//! In-memory service backend for tests and demos.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::client::{ApproveResponse, ByteStream, StageBackend};
use crate::core::{StageResult, StageStatus, FINAL_STAGE};
use crate::errors::{ApiError, StagerunError};
use crate::utils::iso_timestamp;

/// How a scripted stream ends after its chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The connection closes normally.
    Close,
    /// The connection fails with a transport error.
    Error(String),
    /// The connection stays open without sending anything more.
    Hang,
}

/// One scripted response of the stream endpoint.
#[derive(Debug, Clone)]
pub struct StreamScript {
    chunks: Vec<Bytes>,
    end: StreamEnd,
    persist: Option<StageResult>,
    reject: Option<ApiError>,
}

impl StreamScript {
    /// A stream delivering `body` in one chunk, then closing.
    #[must_use]
    pub fn body(body: impl Into<String>) -> Self {
        Self::chunks(vec![body.into()])
    }

    /// A stream delivering each string as its own chunk, then closing.
    #[must_use]
    pub fn chunks(chunks: Vec<String>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Bytes::from).collect(),
            end: StreamEnd::Close,
            persist: None,
            reject: None,
        }
    }

    /// `body` split into chunks of `size` bytes, ignoring char boundaries.
    #[must_use]
    pub fn split_every(body: &str, size: usize) -> Self {
        let size = size.max(1);
        Self {
            chunks: body
                .as_bytes()
                .chunks(size)
                .map(Bytes::copy_from_slice)
                .collect(),
            end: StreamEnd::Close,
            persist: None,
            reject: None,
        }
    }

    /// The endpoint refuses to open the stream.
    #[must_use]
    pub fn rejected(status: u16, detail: &str) -> Self {
        Self {
            chunks: Vec::new(),
            end: StreamEnd::Close,
            persist: None,
            reject: Some(ApiError::from_body(
                status,
                serde_json::json!({ "detail": detail }).to_string(),
            )),
        }
    }

    /// Sets how the stream ends.
    #[must_use]
    pub fn ending(mut self, end: StreamEnd) -> Self {
        self.end = end;
        self
    }

    /// The result the service stores once the stream is opened.
    #[must_use]
    pub fn persisting(mut self, result: StageResult) -> Self {
        self.persist = Some(result);
        self
    }

    fn into_stream(self) -> ByteStream {
        let chunks = stream::iter(self.chunks.into_iter().map(Ok));
        match self.end {
            StreamEnd::Close => chunks.boxed(),
            StreamEnd::Error(message) => chunks
                .chain(stream::once(async move { Err(StagerunError::transport(message)) }))
                .boxed(),
            StreamEnd::Hang => chunks.chain(stream::pending()).boxed(),
        }
    }
}

/// A call received by [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    /// `get_stage_result`
    GetStageResult {
        /// Project id.
        project_id: String,
        /// Stage number.
        stage_number: u32,
    },
    /// `open_stage_stream`
    OpenStageStream {
        /// Project id.
        project_id: String,
        /// Stage number.
        stage_number: u32,
    },
    /// `approve_stage`
    ApproveStage {
        /// Project id.
        project_id: String,
        /// Stage number.
        stage_number: u32,
    },
    /// `save_override`
    SaveOverride {
        /// Project id.
        project_id: String,
        /// Stage number.
        stage_number: u32,
        /// Override text.
        content: String,
    },
    /// `generate_report`
    GenerateReport {
        /// Project id.
        project_id: String,
    },
}

/// A backend that behaves like the research service over in-memory state.
///
/// Approval and override follow the service's rules: approval needs a
/// `complete` result and answers with the next stage (or completion after
/// the final stage); an override needs an existing result and leaves its
/// status alone.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    results: Mutex<HashMap<(String, u32), StageResult>>,
    streams: Mutex<VecDeque<StreamScript>>,
    reports: Mutex<VecDeque<Result<String, ApiError>>>,
    fail_fetch: Mutex<Option<ApiError>>,
    calls: Mutex<Vec<BackendCall>>,
}

impl ScriptedBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a result.
    pub fn set_result(&self, result: StageResult) {
        self.results
            .lock()
            .insert((result.project_id.clone(), result.stage_number), result);
    }

    /// The stored result of a stage.
    #[must_use]
    pub fn result(&self, project_id: &str, stage_number: u32) -> Option<StageResult> {
        self.results
            .lock()
            .get(&(project_id.to_string(), stage_number))
            .cloned()
    }

    /// Queues the response of the next stream request.
    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().push_back(script);
    }

    /// Queues the markdown of the next report request.
    pub fn push_report(&self, markdown: impl Into<String>) {
        self.reports.lock().push_back(Ok(markdown.into()));
    }

    /// Queues a failure of the next report request.
    pub fn push_report_failure(&self, status: u16, detail: &str) {
        self.reports.lock().push_back(Err(ApiError::from_body(
            status,
            serde_json::json!({ "detail": detail }).to_string(),
        )));
    }

    /// Makes the next result fetch fail.
    pub fn fail_next_fetch(&self, status: u16) {
        *self.fail_fetch.lock() = Some(ApiError::from_body(status, "unavailable"));
    }

    /// Every call received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Number of calls that would have reached the network.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

fn api_error(status: u16, detail: &str) -> StagerunError {
    ApiError::from_body(status, serde_json::json!({ "detail": detail }).to_string()).into()
}

#[async_trait]
impl StageBackend for ScriptedBackend {
    async fn get_stage_result(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<Option<StageResult>, StagerunError> {
        self.record(BackendCall::GetStageResult {
            project_id: project_id.to_string(),
            stage_number,
        });
        if let Some(err) = self.fail_fetch.lock().take() {
            return Err(err.into());
        }
        Ok(self.result(project_id, stage_number))
    }

    async fn open_stage_stream(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ByteStream, StagerunError> {
        self.record(BackendCall::OpenStageStream {
            project_id: project_id.to_string(),
            stage_number,
        });
        let script = self
            .streams
            .lock()
            .pop_front()
            .ok_or_else(|| StagerunError::transport("no stream scripted"))?;
        if let Some(err) = script.reject.clone() {
            return Err(err.into());
        }
        if let Some(result) = script.persist.clone() {
            self.set_result(result);
        }
        Ok(script.into_stream())
    }

    async fn approve_stage(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ApproveResponse, StagerunError> {
        self.record(BackendCall::ApproveStage {
            project_id: project_id.to_string(),
            stage_number,
        });
        let mut results = self.results.lock();
        let result = results
            .get_mut(&(project_id.to_string(), stage_number))
            .ok_or_else(|| api_error(404, "Stage result not found"))?;
        if result.status != StageStatus::Complete {
            return Err(api_error(400, "Stage must be complete before approving"));
        }
        result.status = StageStatus::Approved;
        result.approved_at = Some(iso_timestamp());

        if stage_number >= FINAL_STAGE {
            Ok(ApproveResponse::project_complete())
        } else {
            Ok(ApproveResponse::advance(stage_number + 1))
        }
    }

    async fn save_override(
        &self,
        project_id: &str,
        stage_number: u32,
        content: &str,
        notes: &str,
    ) -> Result<(), StagerunError> {
        self.record(BackendCall::SaveOverride {
            project_id: project_id.to_string(),
            stage_number,
            content: content.to_string(),
        });
        let mut results = self.results.lock();
        let result = results
            .get_mut(&(project_id.to_string(), stage_number))
            .ok_or_else(|| api_error(404, "Stage result not found"))?;
        result.human_override = Some(content.to_string());
        result.human_notes = notes.to_string();
        Ok(())
    }

    async fn generate_report(&self, project_id: &str) -> Result<String, StagerunError> {
        self.record(BackendCall::GenerateReport {
            project_id: project_id.to_string(),
        });
        match self.reports.lock().pop_front() {
            Some(Ok(markdown)) => Ok(markdown),
            Some(Err(err)) => Err(err.into()),
            None => Err(api_error(500, "Report generation failed: no report scripted")),
        }
    }
}
