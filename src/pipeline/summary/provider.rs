//! Optional model-backed summary with a two-tier fallback chain.
//!
//! Every failure is logged and collapses to `None`; callers fill the gaps
//! with deterministic heuristics.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::client::{CompletionRequest, LlmClient, OpenAiClient};
use super::parser::parse_summary;
use super::prompt::build_instructions;
use super::vote;
use super::{CancelFlag, SummaryError};
use crate::config::SummaryConfig;
use crate::pipeline::redact::RedactedText;
use crate::pipeline::types::SummaryResult;

/// Sampling temperature of the first attempt.
const BASE_TEMPERATURE: f32 = 0.2;
/// Added per self-consistency attempt.
const TEMPERATURE_STEP: f32 = 0.15;
/// How often a waiting caller checks for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The endpoint rejected the JSON-schema response format.
    SchemaUnsupported,
    /// The model does not exist or cannot serve chat completions.
    ModelUnavailable,
}

/// Result of one call, tagged so the chain can branch without inspecting errors.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(SummaryResult),
    Retryable(RetryReason, SummaryError),
    Fatal(SummaryError),
}

impl AttemptOutcome {
    /// Classify a transport error.
    pub fn from_error(err: SummaryError) -> Self {
        let reason = match &err {
            SummaryError::Http { status, body } => {
                let body = body.to_lowercase();
                if matches!(*status, 400 | 422) && mentions_schema(&body) {
                    Some(RetryReason::SchemaUnsupported)
                } else if *status == 404 || mentions_missing_model(&body) {
                    Some(RetryReason::ModelUnavailable)
                } else {
                    None
                }
            }
            _ => None,
        };
        match reason {
            Some(reason) => AttemptOutcome::Retryable(reason, err),
            None => AttemptOutcome::Fatal(err),
        }
    }
}

fn mentions_schema(body: &str) -> bool {
    body.contains("response_format") || body.contains("json_schema")
}

fn mentions_missing_model(body: &str) -> bool {
    [
        "model_not_found",
        "does not exist",
        "not a chat model",
        "not supported in the v1/chat/completions",
        "does not support",
    ]
    .iter()
    .any(|needle| body.contains(needle))
}

pub struct SummaryProvider {
    client: Arc<dyn LlmClient>,
    config: SummaryConfig,
}

impl SummaryProvider {
    /// Build the OpenAI-backed provider. `None` when no credential is configured
    /// or the HTTP client cannot be created.
    pub fn from_config(config: SummaryConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        match OpenAiClient::new(&config.base_url, &api_key, config.timeout) {
            Ok(client) => Some(Self::with_client(Arc::new(client), config)),
            Err(e) => {
                tracing::warn!(error = %e, "Summary provider disabled");
                None
            }
        }
    }

    pub fn with_client(client: Arc<dyn LlmClient>, config: SummaryConfig) -> Self {
        Self { client, config }
    }

    /// Summarize redacted report text. Never fails: any problem yields `None`.
    pub fn summarize(
        &self,
        text: &RedactedText,
        language: &str,
        cancel: &CancelFlag,
    ) -> Option<SummaryResult> {
        if !self.config.has_credential() {
            tracing::debug!(reason = SummaryError::MissingCredential.kind(), "Summary skipped");
            return None;
        }
        if text.is_empty() {
            tracing::debug!("Summary skipped for empty text");
            return None;
        }

        let started = Instant::now();
        let attempts = self.config.self_consistency.max(1);
        let system = build_instructions(language);

        let results: Vec<Option<SummaryResult>> = if attempts == 1 {
            vec![self.run_chain(text, &system, 0, cancel)]
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = (0..attempts)
                    .map(|index| {
                        let system = &system;
                        scope.spawn(move || self.run_chain(text, system, index, cancel))
                    })
                    .collect();
                // Joined in attempt order so the vote never depends on arrival order.
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or(None))
                    .collect()
            })
        };

        let successes: Vec<SummaryResult> = results.into_iter().flatten().collect();
        let merged = match successes.len() {
            0 => None,
            1 => successes.into_iter().next(),
            n => {
                tracing::info!(attempts = attempts, succeeded = n, "Merging summary attempts");
                Some(vote::merge(&successes))
            }
        };

        self.pace(started, cancel);
        if cancel.is_cancelled() {
            tracing::info!("Summary abandoned by caller");
            return None;
        }
        merged
    }

    /// Primary model with schema, then without schema, then the fallback model.
    fn run_chain(
        &self,
        text: &RedactedText,
        system: &str,
        index: usize,
        cancel: &CancelFlag,
    ) -> Option<SummaryResult> {
        let temperature = BASE_TEMPERATURE + TEMPERATURE_STEP * index as f32;
        let primary = self.config.primary_model.as_str();

        let mut outcome = self.attempt(primary, true, text, system, temperature, index, cancel);
        if let AttemptOutcome::Retryable(RetryReason::SchemaUnsupported, _) = outcome {
            tracing::info!(model = primary, attempt = index, "Retrying without response schema");
            outcome = self.attempt(primary, false, text, system, temperature, index, cancel);
        }

        match outcome {
            AttemptOutcome::Success(summary) => Some(summary),
            AttemptOutcome::Retryable(RetryReason::ModelUnavailable, _) => {
                let Some(fallback) = self.config.fallback_model.as_deref() else {
                    tracing::warn!(model = primary, attempt = index, "Model unavailable and no fallback configured");
                    return None;
                };
                tracing::info!(model = fallback, attempt = index, "Retrying with fallback model");
                match self.attempt(fallback, false, text, system, temperature, index, cancel) {
                    AttemptOutcome::Success(summary) => Some(summary),
                    _ => None,
                }
            }
            AttemptOutcome::Retryable(RetryReason::SchemaUnsupported, _) | AttemptOutcome::Fatal(_) => {
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt(
        &self,
        model: &str,
        json_schema: bool,
        text: &RedactedText,
        system: &str,
        temperature: f32,
        index: usize,
        cancel: &CancelFlag,
    ) -> AttemptOutcome {
        if cancel.is_cancelled() {
            return AttemptOutcome::Fatal(SummaryError::Cancelled);
        }

        let request = CompletionRequest {
            model: model.to_string(),
            system: system.to_string(),
            user: text.as_str().to_string(),
            temperature,
            max_output_tokens: self.config.max_output_tokens,
            reasoning_effort: self.config.reasoning_effort,
            json_schema,
        };

        let started = Instant::now();
        let result = self
            .call_cancellable(request, cancel)
            .and_then(|reply| parse_summary(&reply));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(summary) => {
                tracing::info!(model, attempt = index, json_schema, elapsed_ms, "Summary attempt succeeded");
                AttemptOutcome::Success(summary)
            }
            Err(err) => {
                tracing::warn!(
                    model,
                    attempt = index,
                    json_schema,
                    elapsed_ms,
                    error_class = err.kind(),
                    "Summary attempt failed"
                );
                AttemptOutcome::from_error(err)
            }
        }
    }

    /// Run the blocking call on a worker thread while watching the cancel flag.
    fn call_cancellable(
        &self,
        request: CompletionRequest,
        cancel: &CancelFlag,
    ) -> Result<String, SummaryError> {
        let client = Arc::clone(&self.client);
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("summary-call".into())
            .spawn(move || {
                let _ = tx.send(client.complete(&request));
            })
            .map_err(|e| SummaryError::HttpClient(e.to_string()))?;

        loop {
            match rx.recv_timeout(CANCEL_POLL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        return Err(SummaryError::Cancelled);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SummaryError::HttpClient("summary worker exited".into()));
                }
            }
        }
    }

    /// Hold the result until the configured minimum time has passed.
    fn pace(&self, started: Instant, cancel: &CancelFlag) {
        let min = self.config.min_think;
        while started.elapsed() < min && !cancel.is_cancelled() {
            let remaining = min.saturating_sub(started.elapsed());
            thread::sleep(remaining.min(CANCEL_POLL));
        }
    }
}
