//! Connection settings for the research service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::StagerunError;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const ENV_API_URL: &str = "STAGERUN_API_URL";
/// Environment variable overriding [`ClientConfig::request_timeout_seconds`].
pub const ENV_REQUEST_TIMEOUT: &str = "STAGERUN_REQUEST_TIMEOUT";
/// Environment variable overriding [`ClientConfig::report_timeout_seconds`].
pub const ENV_REPORT_TIMEOUT: &str = "STAGERUN_REPORT_TIMEOUT";

/// Configuration for talking to the research service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service root, without the `/api` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for ordinary request/response calls, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// Timeout for report generation, in seconds.
    #[serde(default = "default_report_timeout")]
    pub report_timeout_seconds: f64,
    /// Connect timeout for every call, in seconds. The only limit on streams.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> f64 {
    30.0
}

fn default_report_timeout() -> f64 {
    300.0
}

fn default_connect_timeout() -> f64 {
    10.0
}

fn default_user_agent() -> String {
    concat!("stagerun/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
            report_timeout_seconds: default_report_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the `STAGERUN_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a config error if a timeout variable is not a positive number.
    pub fn from_env() -> Result<Self, StagerunError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`] but reading from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a config error if a timeout value is not a positive number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StagerunError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout_seconds = parse_seconds(ENV_REQUEST_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REPORT_TIMEOUT) {
            config.report_timeout_seconds = parse_seconds(ENV_REPORT_TIMEOUT, &raw)?;
        }
        Ok(config)
    }

    /// Sets the service root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the report timeout.
    #[must_use]
    pub fn with_report_timeout(mut self, seconds: f64) -> Self {
        self.report_timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }

    /// Report timeout as a Duration.
    #[must_use]
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.report_timeout_seconds)
    }

    /// Connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.connect_timeout_seconds)
    }

    /// Joins `path` onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns a config error naming the first invalid field.
    pub fn validate(&self) -> Result<(), StagerunError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(StagerunError::config(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        for (name, value) in [
            ("request_timeout_seconds", self.request_timeout_seconds),
            ("report_timeout_seconds", self.report_timeout_seconds),
            ("connect_timeout_seconds", self.connect_timeout_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(StagerunError::config(format!("{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<f64, StagerunError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err(StagerunError::config(format!(
            "{key} must be a positive number of seconds, got {raw:?}"
        ))),
    }
}
