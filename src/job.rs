use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unit of work handed over by the dispatcher
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    /// Dispatcher-assigned identifier, used for log attribution
    #[serde(default)]
    pub id: Option<String>,
    /// Caller payload; only `audio_url` and `timestamps` are read
    #[serde(default)]
    pub input: Value,
}

impl Job {
    /// Job with the given input payload and no id
    #[must_use]
    pub const fn with_input(input: Value) -> Self {
        Self { id: None, input }
    }

    /// Non-empty `input.audio_url`, if present
    #[must_use]
    pub fn audio_url(&self) -> Option<&str> {
        self.input
            .get("audio_url")
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
    }

    /// Per-job override of timestamped formatting
    #[must_use]
    pub fn timestamps(&self) -> Option<bool> {
        self.input.get("timestamps").and_then(Value::as_bool)
    }
}

/// What the handler returns to the dispatcher; exactly one shape per job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResult {
    /// Pipeline completed
    Success {
        /// Formatted transcript, trimmed
        transcript: String,
        /// Probed audio duration in seconds
        duration_seconds: f64,
    },
    /// Pipeline stopped at some step
    Failure {
        /// Human-readable reason
        error: String,
    },
}

impl JobResult {
    /// Failure result carrying `error`
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    /// Error message, when this is a failure
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success { .. } => None,
        }
    }
}
