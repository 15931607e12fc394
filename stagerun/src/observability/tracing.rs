//! Span attributes, timing and subscriber setup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::errors::StagerunError;

/// Attributes describing one stage run, attached to its log lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSpanAttributes {
    /// Run id.
    pub run_id: Option<Uuid>,
    /// Project id.
    pub project_id: String,
    /// Stage number.
    pub stage_number: u32,
    /// Final outcome: `complete`, `failed` or `cancelled`.
    pub outcome: Option<String>,
    /// Number of events folded.
    pub events: u64,
    /// Run duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if the run failed.
    pub error: Option<String>,
}

impl RunSpanAttributes {
    /// Creates attributes for a run.
    #[must_use]
    pub fn new(run_id: Uuid, project_id: impl Into<String>, stage_number: u32) -> Self {
        Self {
            run_id: Some(run_id),
            project_id: project_id.into(),
            stage_number,
            ..Default::default()
        }
    }

    /// Sets the number of events folded.
    #[must_use]
    pub fn with_events(mut self, events: u64) -> Self {
        self.events = events;
        self
    }

    /// Sets the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Flattens to dotted attribute keys.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(id) = self.run_id {
            attrs.insert("stage_run.id".to_string(), id.to_string());
        }
        attrs.insert("stage_run.project_id".to_string(), self.project_id.clone());
        attrs.insert("stage_run.stage".to_string(), self.stage_number.to_string());
        attrs.insert("stage_run.events".to_string(), self.events.to_string());
        if let Some(ref v) = self.outcome {
            attrs.insert("stage_run.outcome".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("stage_run.duration_ms".to_string(), format!("{v:.2}"));
        }
        if let Some(ref v) = self.error {
            attrs.insert("stage_run.error".to_string(), v.clone());
        }

        attrs
    }
}

/// Measures how long something took.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The timer's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, falling back to `default_filter`.
///
/// # Errors
///
/// Returns a config error if the filter is invalid or a global subscriber
/// is already installed.
pub fn init_tracing(format: LogFormat, default_filter: &str) -> Result<(), StagerunError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| {
                StagerunError::config(format!("invalid log filter {default_filter:?}: {e}"))
            })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed
        .map_err(|e| StagerunError::config(format!("failed to install tracing subscriber: {e}")))
}
