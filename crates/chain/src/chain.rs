//! The generate-parse-validate-retry state machine.

use std::sync::Arc;
use std::time::Duration;

use analyst_config::{ChainConfig, MAX_TEMPERATURE};
use analyst_core::memory::SessionMemory;
use analyst_core::provider::{Provider, ProviderRequest};
use analyst_schema::{Assessment, InvestPolicy, ValidationError, Validator};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::failure::ChainFailure;
use crate::prompts;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_GENERATION_BACKOFF: Duration = Duration::from_millis(500);
const DEFAULT_CORRECTION_BACKOFF: Duration = Duration::from_millis(200);

/// Worst case per attempt: generate, parse, validate, retry.
const TRANSITIONS_PER_ATTEMPT: usize = 4;

/// What the chain knows about the attempt in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttemptRecord {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Raw text of the most recent generation, if any came back.
    pub last_raw: Option<String>,
    /// The most recent provider, parse, or validation error.
    pub last_error: Option<String>,
}

enum State {
    BuildPrompt,
    Generate,
    Parse(String),
    Validate { raw: String, value: Value },
    Retry(Duration),
    Success { assessment: Assessment, summary: String },
    Fail(ChainFailure),
}

/// Turns a free-text startup description into a validated [`Assessment`].
///
/// One instance is shared across sessions; per-run state lives on the stack
/// of [`run`](DeterministicChain::run).
pub struct DeterministicChain {
    provider: Arc<dyn Provider>,
    memory: Arc<dyn SessionMemory>,
    model: String,
    system: String,
    max_retries: u32,
    temperature: f32,
    max_tokens: Option<u32>,
    generation_backoff: Duration,
    correction_backoff: Duration,
    validator: Validator,
}

impl DeterministicChain {
    pub fn new(
        provider: Arc<dyn Provider>,
        memory: Arc<dyn SessionMemory>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            memory,
            model: model.into(),
            system: prompts::system_prompt(),
            max_retries: DEFAULT_MAX_RETRIES,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            generation_backoff: DEFAULT_GENERATION_BACKOFF,
            correction_backoff: DEFAULT_CORRECTION_BACKOFF,
            validator: Validator::default(),
        }
    }

    /// Compose a chain from the `[chain]` config section.
    pub fn from_config(
        config: &ChainConfig,
        provider: Arc<dyn Provider>,
        memory: Arc<dyn SessionMemory>,
        model: impl Into<String>,
    ) -> Self {
        Self::new(provider, memory, model)
            .with_max_retries(config.max_retries)
            .with_temperature(config.temperature)
            .with_backoff(
                Duration::from_millis(config.generation_backoff_ms),
                Duration::from_millis(config.correction_backoff_ms),
            )
            .with_invest_policy(config.invest_policy)
    }

    /// Extra attempts after the first one.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delays after a provider failure and after bad output.
    pub fn with_backoff(mut self, generation: Duration, correction: Duration) -> Self {
        self.generation_backoff = generation;
        self.correction_backoff = correction;
        self
    }

    /// Clamped to `0.0..=MAX_TEMPERATURE`.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = if temperature.is_nan() {
            DEFAULT_TEMPERATURE
        } else {
            temperature.clamp(0.0, MAX_TEMPERATURE)
        };
        self
    }

    pub fn with_invest_policy(mut self, policy: InvestPolicy) -> Self {
        self.validator = Validator::new(policy);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn memory(&self) -> &Arc<dyn SessionMemory> {
        &self.memory
    }

    /// The system prompt sent on every attempt.
    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    /// The first-attempt user prompt for `input` in `session_id`.
    pub async fn user_prompt(&self, input: &str, session_id: Option<&str>) -> String {
        let recent = self.memory.get_recent(session_key(session_id)).await;
        prompts::user_prompt(input, &recent)
    }

    /// Run the chain once for `input`.
    ///
    /// Memory for `session_id` is read before the first attempt and written
    /// only when a valid assessment comes back.
    pub async fn run(
        &self,
        input: &str,
        session_id: Option<&str>,
    ) -> Result<Assessment, ChainFailure> {
        self.run_with_record(input, session_id).await.0
    }

    /// Like [`run`](Self::run), also returning the final attempt record.
    pub async fn run_with_record(
        &self,
        input: &str,
        session_id: Option<&str>,
    ) -> (Result<Assessment, ChainFailure>, AttemptRecord) {
        let session_id = session_key(session_id);
        let max_attempts = self.max_retries.saturating_add(1);
        let max_transitions = TRANSITIONS_PER_ATTEMPT * max_attempts as usize + 2;

        let mut record = AttemptRecord {
            attempt: 1,
            ..AttemptRecord::default()
        };
        let mut user = String::new();
        let mut state = State::BuildPrompt;

        info!(
            provider = self.provider.name(),
            model = %self.model,
            session = session_id.unwrap_or("-"),
            max_attempts,
            "Chain run starting"
        );

        for _ in 0..max_transitions {
            state = match state {
                State::BuildPrompt => {
                    user = self.user_prompt(input, session_id).await;
                    debug!(
                        system_chars = self.system.len(),
                        user_chars = user.len(),
                        "Prompts built"
                    );
                    State::Generate
                }

                State::Generate => {
                    info!(attempt = record.attempt, "Generating");
                    let request = ProviderRequest::new(
                        self.model.clone(),
                        self.system.clone(),
                        user.clone(),
                        self.temperature,
                    )
                    .with_max_tokens(self.max_tokens);

                    match self.provider.complete(request).await {
                        Ok(response) => {
                            record.last_raw = Some(response.text.clone());
                            State::Parse(response.text)
                        }
                        Err(e) => {
                            let detail = e.to_string();
                            record.last_error = Some(detail.clone());
                            if record.attempt >= max_attempts {
                                State::Fail(ChainFailure::LlmCallFailed {
                                    detail,
                                    attempt: record.attempt,
                                })
                            } else {
                                warn!(attempt = record.attempt, error = %detail, "Generation failed, retrying");
                                State::Retry(self.generation_backoff * record.attempt)
                            }
                        }
                    }
                }

                State::Parse(raw) => match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => State::Validate { raw, value },
                    Err(e) => {
                        let detail = e.to_string();
                        record.last_error = Some(detail.clone());
                        if record.attempt >= max_attempts {
                            State::Fail(ChainFailure::InvalidJson {
                                raw,
                                detail,
                                attempt: record.attempt,
                            })
                        } else {
                            warn!(attempt = record.attempt, error = %detail, "Output is not JSON, retrying");
                            user = prompts::with_json_correction(&user);
                            State::Retry(self.correction_backoff * record.attempt)
                        }
                    }
                },

                State::Validate { raw, value } => match self.validator.validate(&value) {
                    Ok(assessment) => State::Success {
                        assessment,
                        summary: summary_of(&value),
                    },
                    Err(validation) => {
                        record.last_error = Some(validation.to_string());
                        if record.attempt >= max_attempts {
                            State::Fail(ChainFailure::ValidationFailed {
                                validation,
                                raw,
                                attempt: record.attempt,
                            })
                        } else {
                            self.warn_invalid(record.attempt, &validation);
                            user = prompts::with_validation_correction(&user, &validation);
                            State::Retry(self.correction_backoff * record.attempt)
                        }
                    }
                },

                State::Retry(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "Backing off");
                    tokio::time::sleep(delay).await;
                    record.attempt += 1;
                    State::Generate
                }

                State::Success {
                    assessment,
                    summary,
                } => {
                    if let Some(session) = session_id {
                        self.memory.add(session, format!("USER: {input}")).await;
                        self.memory
                            .add(session, format!("ASSISTANT_SUMMARY: {summary}"))
                            .await;
                    }
                    info!(attempt = record.attempt, name = %assessment.name, "Assessment produced");
                    return (Ok(assessment), record);
                }

                State::Fail(failure) => {
                    warn!(kind = %failure.kind(), attempt = record.attempt, "Chain run failed");
                    return (Err(failure), record);
                }
            };
        }

        warn!(max_transitions, "Chain exceeded its transition bound");
        let failure = ChainFailure::ExceededRetries {
            last_output: record.last_raw.clone(),
        };
        (Err(failure), record)
    }

    fn warn_invalid(&self, attempt: u32, validation: &ValidationError) {
        warn!(
            attempt,
            issues = validation.issues.len(),
            first = %validation.first().map(ToString::to_string).unwrap_or_default(),
            "Output failed validation, retrying"
        );
    }
}

/// `summary` from the raw JSON, or empty when absent or not a string.
/// An empty session id means no session.
fn session_key(session_id: Option<&str>) -> Option<&str> {
    session_id.filter(|id| !id.is_empty())
}

fn summary_of(value: &Value) -> String {
    value
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
