//! OpenAI-compatible provider using the streaming `/chat/completions` API.
//!
//! DashScope's compatible mode speaks the same protocol, so both providers
//! share this implementation and differ only in base URL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::stream::{spawn_line_stream, LineOutcome};
use super::{ensure_success, ChatRequest, LlmProvider, ProviderError, TextStream};

const DEFAULT_MAX_TOKENS: u32 = 2048;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAiMessage>,
    /// Always `true`.
    pub stream: bool,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum completion tokens.
    pub max_tokens: u32,
}

/// A message in OpenAI chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// Role (`system`, `user`, `assistant`).
    pub role: String,
    /// Text content.
    pub content: String,
}

/// One `data:` payload of the event stream.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChunk {
    /// Incremental choices.
    #[serde(default)]
    pub choices: Vec<OpenAiChunkChoice>,
    /// In-stream error object.
    pub error: Option<OpenAiError>,
}

/// One streamed choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChunkChoice {
    /// Content delta.
    #[serde(default)]
    pub delta: OpenAiDelta,
    /// Set on the final chunk.
    pub finish_reason: Option<String>,
}

/// Content delta of a streamed choice.
#[doc(hidden)]
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiDelta {
    /// New text, if any.
    pub content: Option<String>,
}

/// Error object some compatible servers embed in the stream.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiError {
    /// Human-readable message.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI-compatible streaming chat provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    model_spec: String,
    model_name: String,
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model_spec", &self.model_spec)
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Create a provider posting to `{api_base}/chat/completions`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the HTTP client cannot be built.
    pub fn new(
        model_spec: String,
        model_name: String,
        api_base: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model_spec,
            model_name,
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            api_key,
            client,
        })
    }

    /// Full URL requests are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build the wire request from a chat request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &ChatRequest) -> OpenAiRequest {
    OpenAiRequest {
        model: model.to_owned(),
        messages: request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.as_str().to_owned(),
                content: m.content.clone(),
            })
            .collect(),
        stream: true,
        temperature: request.temperature,
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    }
}

/// Interpret one line of the server-sent event stream.
///
/// # Errors
///
/// Returns `ProviderError::Parse` for a malformed `data:` payload and
/// `ProviderError::Upstream` for an in-stream error object.
#[doc(hidden)]
pub fn parse_stream_line(line: &str) -> Result<LineOutcome, ProviderError> {
    let Some(payload) = line.strip_prefix("data:") else {
        // Blank separators, comments, `event:` and `id:` fields.
        return Ok(LineOutcome::Skip);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(LineOutcome::Done);
    }
    if payload.is_empty() {
        return Ok(LineOutcome::Skip);
    }

    let chunk: OpenAiChunk =
        serde_json::from_str(payload).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Upstream(error.message));
    }

    let text: String = chunk
        .choices
        .iter()
        .filter_map(|c| c.delta.content.as_deref())
        .collect();
    if text.is_empty() {
        Ok(LineOutcome::Skip)
    } else {
        Ok(LineOutcome::Text(text))
    }
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, ProviderError> {
        let api_request = build_request(&self.model_name, &request);

        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(spawn_line_stream(response, parse_stream_line))
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
