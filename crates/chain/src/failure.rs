//! Terminal outcomes of a chain run that did not produce an assessment.

use analyst_schema::ValidationError;
use serde::Serialize;
use thiserror::Error;

/// Why a run gave up. Serialized with a `kind` tag for front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainFailure {
    /// The provider kept failing.
    #[error("LLM call failed after {attempt} attempt(s): {detail}")]
    LlmCallFailed { detail: String, attempt: u32 },

    /// The last output could not be parsed as JSON.
    #[error("Invalid JSON after {attempt} attempt(s): {detail}")]
    InvalidJson {
        raw: String,
        detail: String,
        attempt: u32,
    },

    /// The last output parsed but did not match the schema.
    #[error("Validation failed after {attempt} attempt(s): {validation}")]
    ValidationFailed {
        validation: ValidationError,
        raw: String,
        attempt: u32,
    },

    /// The loop stopped without reaching any other terminal state.
    #[error("Exceeded retries without a result")]
    ExceededRetries { last_output: Option<String> },
}

/// The `kind` tag of a [`ChainFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    LlmCallFailed,
    InvalidJson,
    ValidationFailed,
    ExceededRetries,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::LlmCallFailed => "llm_call_failed",
            FailureKind::InvalidJson => "invalid_json",
            FailureKind::ValidationFailed => "validation_failed",
            FailureKind::ExceededRetries => "exceeded_retries",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChainFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ChainFailure::LlmCallFailed { .. } => FailureKind::LlmCallFailed,
            ChainFailure::InvalidJson { .. } => FailureKind::InvalidJson,
            ChainFailure::ValidationFailed { .. } => FailureKind::ValidationFailed,
            ChainFailure::ExceededRetries { .. } => FailureKind::ExceededRetries,
        }
    }

    /// The last raw model output, when one was received.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ChainFailure::InvalidJson { raw, .. } | ChainFailure::ValidationFailed { raw, .. } => {
                Some(raw)
            }
            ChainFailure::ExceededRetries { last_output } => last_output.as_deref(),
            ChainFailure::LlmCallFailed { .. } => None,
        }
    }

    /// Attempt number at which the run stopped, when known.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            ChainFailure::LlmCallFailed { attempt, .. }
            | ChainFailure::InvalidJson { attempt, .. }
            | ChainFailure::ValidationFailed { attempt, .. } => Some(*attempt),
            ChainFailure::ExceededRetries { .. } => None,
        }
    }
}
