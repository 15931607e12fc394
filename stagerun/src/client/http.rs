//! HTTP implementation of the service API on top of `reqwest`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::backend::{ByteStream, StageBackend};
use super::config::ClientConfig;
use super::models::{ApproveResponse, OkResponse, OverrideRequest, ReportResponse, ToggleResponse};
use crate::core::{
    AgentConfig, CreateAgentRequest, CreateProjectRequest, Project, StageResult, UpdateAgentRequest,
};
use crate::errors::{ApiError, StagerunError};

/// Client for the research service.
///
/// Holds three connection pools with different limits: ordinary calls use
/// the request timeout, stage streams only a connect timeout so a long run
/// is never cut off, and report generation the long report timeout.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    streaming: Client,
    report: Client,
}

impl ApiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error for invalid settings or headers, or a
    /// transport error if the TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self, StagerunError> {
        config.validate()?;
        let headers = default_headers(&config)?;

        let builder = || {
            Client::builder()
                .user_agent(config.user_agent.clone())
                .default_headers(headers.clone())
                .connect_timeout(config.connect_timeout())
        };

        let http = builder().timeout(config.request_timeout()).build()?;
        let streaming = builder().build()?;
        let report = builder().timeout(config.report_timeout()).build()?;

        Ok(Self {
            config,
            http,
            streaming,
            report,
        })
    }

    /// Creates a client from the environment.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`] and [`ApiClient::new`].
    pub fn from_env() -> Result<Self, StagerunError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, client: &Client, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.url(path);
        debug!(method = %method, url = %url, "request");
        client.request(method, url)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StagerunError> {
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StagerunError> {
        self.call(self.request(&self.http, Method::GET, path)).await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, StagerunError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        self.call(self.request(&self.http, method, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), StagerunError> {
        let _: OkResponse = self.call(self.request(&self.http, Method::DELETE, path)).await?;
        Ok(())
    }

    // Projects

    /// Lists every project.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StagerunError> {
        self.get("/api/projects").await
    }

    /// Fetches one project with all of its stage results.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn get_project(&self, project_id: &str) -> Result<Project, StagerunError> {
        self.get(&format!("/api/projects/{project_id}")).await
    }

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<Project, StagerunError> {
        self.send(Method::POST, "/api/projects", request).await
    }

    /// Deletes a project.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn delete_project(&self, project_id: &str) -> Result<(), StagerunError> {
        self.delete(&format!("/api/projects/{project_id}")).await
    }

    // Agents

    /// Lists agents, optionally filtered by stage and project.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn list_agents(
        &self,
        stage: Option<u32>,
        project_id: Option<&str>,
    ) -> Result<Vec<AgentConfig>, StagerunError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(stage) = stage {
            query.push(("stage", stage.to_string()));
        }
        if let Some(project_id) = project_id {
            query.push(("project_id", project_id.to_string()));
        }
        self.call(self.request(&self.http, Method::GET, "/api/agents").query(&query))
            .await
    }

    /// Fetches one agent.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentConfig, StagerunError> {
        self.get(&format!("/api/agents/{agent_id}")).await
    }

    /// Creates an agent.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn create_agent(
        &self,
        request: &CreateAgentRequest,
    ) -> Result<AgentConfig, StagerunError> {
        self.send(Method::POST, "/api/agents", request).await
    }

    /// Updates the given fields of an agent.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn update_agent(
        &self,
        agent_id: &str,
        request: &UpdateAgentRequest,
    ) -> Result<AgentConfig, StagerunError> {
        self.send(Method::PUT, &format!("/api/agents/{agent_id}"), request)
            .await
    }

    /// Deletes an agent.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<(), StagerunError> {
        self.delete(&format!("/api/agents/{agent_id}")).await
    }

    /// Flips an agent's enabled flag and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns transport or API errors.
    pub async fn toggle_agent(&self, agent_id: &str) -> Result<bool, StagerunError> {
        let response: ToggleResponse = self
            .call(self.request(&self.http, Method::POST, &format!("/api/agents/{agent_id}/toggle")))
            .await?;
        Ok(response.enabled)
    }
}

#[async_trait]
impl StageBackend for ApiClient {
    #[instrument(skip(self))]
    async fn get_stage_result(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<Option<StageResult>, StagerunError> {
        self.get(&format!("/api/projects/{project_id}/stages/{stage_number}"))
            .await
    }

    #[instrument(skip(self))]
    async fn open_stage_stream(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ByteStream, StagerunError> {
        let path = format!("/api/projects/{project_id}/stages/{stage_number}/run");
        let request = self
            .request(&self.streaming, Method::GET, &path)
            .header(ACCEPT, "text/event-stream");
        let response = check_status(request.send().await?).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(StagerunError::from))
            .boxed())
    }

    #[instrument(skip(self))]
    async fn approve_stage(
        &self,
        project_id: &str,
        stage_number: u32,
    ) -> Result<ApproveResponse, StagerunError> {
        self.call(self.request(
            &self.http,
            Method::POST,
            &format!("/api/projects/{project_id}/stages/{stage_number}/approve"),
        ))
        .await
    }

    #[instrument(skip(self, content, notes))]
    async fn save_override(
        &self,
        project_id: &str,
        stage_number: u32,
        content: &str,
        notes: &str,
    ) -> Result<(), StagerunError> {
        let body = OverrideRequest {
            content: content.to_string(),
            notes: notes.to_string(),
        };
        let _: OkResponse = self
            .send(
                Method::PUT,
                &format!("/api/projects/{project_id}/stages/{stage_number}/override"),
                &body,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn generate_report(&self, project_id: &str) -> Result<String, StagerunError> {
        let response: ReportResponse = self
            .call(self.request(
                &self.report,
                Method::POST,
                &format!("/api/projects/{project_id}/report"),
            ))
            .await?;
        Ok(response.report)
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, StagerunError> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| StagerunError::config(format!("invalid header name {key:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| StagerunError::config(format!("invalid value for header {key:?}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Turns a non-success response into an [`ApiError`] carrying the body.
async fn check_status(response: Response) -> Result<Response, StagerunError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_body(status.as_u16(), body).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        let client = ApiClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().base_url, "http://localhost:8000");
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let config = ClientConfig::default().with_header("bad header", "x");
        let err = ApiClient::new(config).unwrap_err();
        assert!(matches!(err, StagerunError::Config(_)));
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = ApiClient::new(ClientConfig::default().with_base_url("ftp://x")).unwrap_err();
        assert!(matches!(err, StagerunError::Config(_)));
    }
}
