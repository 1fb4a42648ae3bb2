//! Ollama provider implementation using the streaming `/api/chat` API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::stream::{spawn_line_stream, LineOutcome};
use super::{ensure_success, ChatRequest, LlmProvider, ProviderError, TextStream};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Ollama chat API request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaRequest {
    /// Model name.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OllamaMessage>,
    /// Always `true`.
    pub stream: bool,
    /// Generation options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

/// A message in Ollama format.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message content.
    pub content: String,
}

/// Ollama generation options.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OllamaOptions {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// One NDJSON line of a streamed chat response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OllamaChunk {
    /// Partial assistant message.
    pub message: Option<OllamaMessage>,
    /// Set on the final line.
    #[serde(default)]
    pub done: bool,
    /// Error reported mid-stream.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Ollama chat API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    model_spec: String,
    model_name: String,
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for a local or remote Ollama server.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Request` if the HTTP client cannot be built.
    pub fn new(
        model_spec: String,
        model_name: String,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            model_spec,
            model_name,
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }
}

/// Build the wire request from a chat request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &ChatRequest) -> OllamaRequest {
    let options = if request.temperature.is_some() || request.max_tokens.is_some() {
        Some(OllamaOptions {
            temperature: request.temperature,
            num_predict: request.max_tokens,
        })
    } else {
        None
    };

    OllamaRequest {
        model: model.to_owned(),
        messages: request
            .messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_owned(),
                content: m.content.clone(),
            })
            .collect(),
        stream: true,
        options,
    }
}

/// Interpret one NDJSON line.
///
/// # Errors
///
/// Returns `ProviderError::Parse` for malformed JSON and
/// `ProviderError::Upstream` for an error line.
#[doc(hidden)]
pub fn parse_stream_line(line: &str) -> Result<LineOutcome, ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineOutcome::Skip);
    }
    let chunk: OllamaChunk =
        serde_json::from_str(line).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Upstream(error));
    }
    match chunk.message {
        Some(message) if !message.content.is_empty() => Ok(LineOutcome::Text(message.content)),
        _ if chunk.done => Ok(LineOutcome::Done),
        _ => Ok(LineOutcome::Skip),
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, ProviderError> {
        let body = build_request(&self.model_name, &request);
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(spawn_line_stream(response, parse_stream_line))
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
