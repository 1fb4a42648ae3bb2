//! LLM provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the shared request types used by all
//! provider implementations. Every provider streams: a chat call resolves to
//! a [`TextStream`] of incremental text fragments.
//!
//! Two providers are implemented:
//! - [`openai::OpenAiProvider`]: OpenAI-compatible `/chat/completions` (SSE),
//!   also used for DashScope's compatible mode
//! - [`ollama::OllamaProvider`]: Ollama `/api/chat` (NDJSON)

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::config::ChatConfig;

pub mod ollama;
pub mod openai;
pub mod stream;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction text.
    System,
    /// Human user message.
    User,
    /// Assistant (LLM) message.
    Assistant,
}

impl Role {
    /// Wire name shared by the OpenAI and Ollama chat formats.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged message (a conversation turn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Text content.
    pub content: String,
}

impl Message {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Whether the content is empty after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A streaming chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Ordered messages, instruction text first.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
}

/// Incremental text fragments from a provider, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitised response body.
        body: String,
    },
    /// The provider reported an error inside the stream.
    #[error("provider stream error: {0}")]
    Upstream(String),
    /// Provider cannot satisfy the request with current configuration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers (useful for all providers)
// ---------------------------------------------------------------------------

/// Pass a successful response through, or turn it into a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await?;
    Err(ProviderError::HttpStatus {
        status: status.as_u16(),
        body: sanitize_http_error_body(&body),
    })
}

/// Collapse whitespace, redact token-like strings, and truncate an error body.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-ant-[A-Za-z0-9_\-]{10,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"tk-[A-Za-z0-9]{20,}",
        r"Bearer [A-Za-z0-9_\-\.]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core LLM provider interface.
///
/// All provider implementations must be `Send + Sync` so a session can hold
/// one behind an `Arc` across tasks.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start a streaming chat completion.
    ///
    /// Resolves once the upstream accepted the request; fragments then
    /// arrive through the returned stream. Dropping the stream abandons the
    /// upstream call.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request cannot be sent or is rejected.
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream, ProviderError>;

    /// The model spec string this provider is instantiated for.
    fn model_id(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// DashScope's OpenAI-compatible endpoint.
pub const DASHSCOPE_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// OpenAI's public endpoint.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Parse a provider string like `"ollama/qwen3:8b"` into components.
///
/// Returns `(provider_name, model_name)`.
///
/// # Errors
///
/// Returns an error if the string has no `/` separator or either side is empty.
pub fn parse_provider_string(s: &str) -> anyhow::Result<(&str, &str)> {
    let (provider, model) = s.split_once('/').ok_or_else(|| {
        anyhow::anyhow!("invalid provider string: {s:?}, expected format 'provider/model'")
    })?;
    if provider.is_empty() || model.is_empty() {
        anyhow::bail!("invalid provider string: {s:?}, both provider and model must be non-empty");
    }
    Ok((provider, model))
}

/// Build the provider named by `config.model`.
///
/// A bare model name (no `/`) is served by DashScope.
///
/// # Errors
///
/// Returns an error for an unknown provider prefix, a missing API key for a
/// hosted provider, or an HTTP client build failure.
pub fn from_config(config: &ChatConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let spec = if config.model.contains('/') {
        config.model.clone()
    } else {
        format!("dashscope/{}", config.model)
    };
    let (provider, model) = parse_provider_string(&spec)?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let built: Arc<dyn LlmProvider> = match provider {
        "dashscope" | "openai" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("missing API key for provider '{provider}' (set DASHSCOPE_API_KEY)")
            })?;
            let default_base = if provider == "openai" {
                OPENAI_API_BASE
            } else {
                DASHSCOPE_API_BASE
            };
            let base = config.api_base.as_deref().unwrap_or(default_base);
            Arc::new(openai::OpenAiProvider::new(
                spec.clone(),
                model.to_owned(),
                base,
                api_key,
                timeout,
            )?)
        }
        "ollama" => {
            let base = config
                .api_base
                .as_deref()
                .unwrap_or(ollama::DEFAULT_OLLAMA_URL);
            Arc::new(ollama::OllamaProvider::new(
                spec.clone(),
                model.to_owned(),
                base,
                timeout,
            )?)
        }
        other => anyhow::bail!("unsupported provider '{other}'"),
    };
    tracing::info!(model = %spec, "provider configured");
    Ok(built)
}
