use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SummaryError;
use crate::config::ReasoningEffort;

/// One chat-completion call. The user content is already redacted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub reasoning_effort: Option<ReasoningEffort>,
    /// Ask the endpoint to enforce the summary JSON schema.
    pub json_schema: bool,
}

/// Transport to a language model. Blocking; called from worker threads.
pub trait LlmClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, SummaryError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SummaryError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(30).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| SummaryError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Reasoning model families reject any sampling temperature.
fn accepts_temperature(model: &str) -> bool {
    let lower = model.to_lowercase();
    !["gpt-5", "o1", "o3", "o4"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

impl LlmClient for OpenAiClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, SummaryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_completion_tokens: request.max_output_tokens,
            temperature: accepts_temperature(&request.model).then_some(request.temperature),
            reasoning_effort: request.reasoning_effort.map(|e| e.as_str()),
            response_format: request
                .json_schema
                .then(super::prompt::summary_response_format),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    SummaryError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    SummaryError::Timeout(self.timeout_secs)
                } else {
                    SummaryError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummaryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| SummaryError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SummaryError::MalformedResponse("no message content".into()))
    }
}

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, SummaryError> + Send + Sync>;

/// Mock client for tests: scripted or computed replies, with recorded requests.
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, SummaryError>>>,
    responder: Option<Responder>,
    delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Always reply with `response`.
    pub fn new(response: &str) -> Self {
        let response = response.to_string();
        Self::with_responder(move |_| Ok(response.clone()))
    }

    /// Reply from `script` in order; once it runs out, calls fail as malformed.
    pub fn scripted(script: Vec<Result<String, SummaryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            responder: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Compute each reply from the request.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, SummaryError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(responder)),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl LlmClient for MockLlmClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, SummaryError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(responder) = &self.responder {
            return responder(request);
        }
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| Err(SummaryError::MalformedResponse("mock script exhausted".into())))
    }
}
