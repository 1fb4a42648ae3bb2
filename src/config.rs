//! Configuration loading and validation.
//!
//! Settings come from `config.toml` (path: `$ROLEBOT_CONFIG`, else
//! `~/.rolebot/config.toml`), then environment variables override file
//! values. A `.env` file in the working directory is loaded first so it can
//! supply those variables. Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::catalog::DEFAULT_ROLE_ID;
use crate::personality::Personality;
use crate::roles::Role;

/// Environment variable naming an explicit config file path.
pub const CONFIG_PATH_ENV: &str = "ROLEBOT_CONFIG";

/// Accepted `log_level` values.
const VALID_LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// Chat assistant configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Provider API key. Required for hosted providers, unused by Ollama.
    pub api_key: Option<String>,
    /// Override for the provider base URL.
    pub api_base: Option<String>,
    /// Model spec: `provider/model`, or a bare model name for DashScope.
    pub model: String,
    /// Sampling temperature (0.0 to 2.0).
    pub temperature: f32,
    /// Maximum completion tokens (1 to 32000).
    pub max_tokens: u32,
    /// Number of most recent stored turns sent with each request.
    pub max_history_length: usize,
    /// Longest accepted user message, in characters. Zero disables the check.
    pub max_input_chars: usize,
    /// Name substituted into every role preamble.
    pub assistant_name: String,
    /// Role a new session starts in.
    pub default_role: String,
    /// Custom preamble template (see `agent::prompt::PreambleTemplate`).
    pub preamble_template: Option<String>,
    /// HTTP timeout for provider calls, in seconds.
    pub request_timeout_secs: u64,
    /// Verbose logging.
    pub enable_debug: bool,
    /// Log each completed exchange at debug level.
    pub enable_conversation_logging: bool,
    /// One of `DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`.
    pub log_level: String,
    /// Extra personalities registered at startup.
    pub personalities: Vec<Personality>,
    /// Extra roles registered at startup.
    pub roles: Vec<Role>,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("api_key", &self.masked_api_key())
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_history_length", &self.max_history_length)
            .field("assistant_name", &self.assistant_name)
            .field("default_role", &self.default_role)
            .finish_non_exhaustive()
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            model: default_model(),
            temperature: 0.7,
            max_tokens: 2048,
            max_history_length: 20,
            max_input_chars: 2000,
            assistant_name: "AI Assistant".to_owned(),
            default_role: DEFAULT_ROLE_ID.to_owned(),
            preamble_template: None,
            request_timeout_secs: 60,
            enable_debug: false,
            enable_conversation_logging: true,
            log_level: "INFO".to_owned(),
            personalities: Vec::new(),
            roles: Vec::new(),
        }
    }
}

fn default_model() -> String {
    "dashscope/qwen-turbo".to_owned()
}

impl ChatConfig {
    /// Apply environment overrides through `env`.
    ///
    /// Takes a resolver so tests can inject values without touching the
    /// process environment. Unparseable numeric values are ignored with a
    /// warning and the previous value is kept.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("DASHSCOPE_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env("DASHSCOPE_API_BASE") {
            self.api_base = Some(v);
        }
        if let Some(v) = env("MODEL_NAME") {
            self.model = v;
        }
        if let Some(v) = env("ASSISTANT_NAME") {
            self.assistant_name = v;
        }
        if let Some(v) = env("LOG_LEVEL") {
            self.log_level = v.to_uppercase();
        }
        override_parsed(&env, "TEMPERATURE", &mut self.temperature);
        override_parsed(&env, "MAX_TOKENS", &mut self.max_tokens);
        override_parsed(&env, "MAX_HISTORY_LENGTH", &mut self.max_history_length);
        override_bool(&env, "DEBUG", &mut self.enable_debug);
        override_bool(
            &env,
            "ENABLE_CONVERSATION_LOGGING",
            &mut self.enable_conversation_logging,
        );
    }

    /// Check ranges and formats.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(key) = &self.api_key {
            if key.is_empty() {
                anyhow::bail!("API key cannot be empty");
            }
            if !key.starts_with("sk-") && !key.starts_with("tk-") {
                anyhow::bail!("API key format is incorrect, should start with 'sk-' or 'tk-'");
            }
        }
        if let Some(base) = &self.api_base {
            url::Url::parse(base).with_context(|| format!("invalid api_base URL: {base}"))?;
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "temperature should be between 0.0-2.0, current value: {}",
                self.temperature
            );
        }
        if !(1..=32_000).contains(&self.max_tokens) {
            anyhow::bail!(
                "max tokens should be between 1-32000, current value: {}",
                self.max_tokens
            );
        }
        if self.assistant_name.trim().is_empty() {
            anyhow::bail!("assistant name cannot be empty");
        }
        if !VALID_LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            anyhow::bail!(
                "log level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            );
        }
        Ok(())
    }

    /// The API key with all but its last four characters masked.
    pub fn masked_api_key(&self) -> String {
        match &self.api_key {
            Some(key) if key.chars().count() > 4 => {
                let skip = key.chars().count().saturating_sub(4);
                let tail: String = key.chars().skip(skip).collect();
                format!("***{tail}")
            }
            Some(_) => "***".to_owned(),
            None => "(unset)".to_owned(),
        }
    }

    /// One-line summary safe to print or log.
    pub fn redacted_summary(&self) -> String {
        let mut parts = vec![
            format!("Model: {}", self.model),
            format!("API Key: {}", self.masked_api_key()),
            format!("Temperature: {}", self.temperature),
            format!("Max Tokens: {}", self.max_tokens),
            format!("History Length: {}", self.max_history_length),
            format!("Assistant Name: {}", self.assistant_name),
        ];
        if self.enable_debug {
            parts.push("Debug Mode: Enabled".to_owned());
        }
        if self.enable_conversation_logging {
            parts.push(format!("Logging: {}", self.log_level));
        }
        parts.join(" | ")
    }

    /// `tracing` filter directive matching `log_level` and `enable_debug`.
    pub fn tracing_filter(&self) -> &'static str {
        if self.enable_debug {
            return "debug";
        }
        match self.log_level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

fn override_parsed<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(v) = env(key) {
        match v.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!(var = key, value = %v, "ignoring invalid env override"),
        }
    }
}

fn override_bool(env: &impl Fn(&str) -> Option<String>, key: &str, target: &mut bool) {
    if let Some(v) = env(key) {
        if !v.is_empty() {
            *target = matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
        }
    }
}

/// Load config from `path` (defaults if the file is missing), apply
/// overrides from `env`, and validate.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// validation fails.
pub fn load_config_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ChatConfig> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), "loading config from file");
            toml::from_str::<ChatConfig>(&contents)
                .with_context(|| format!("failed to parse config at {}", path.display()))?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            ChatConfig::default()
        }
        Err(e) => {
            return Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            ))
        }
    };
    config.apply_overrides(env);
    config.validate()?;
    Ok(config)
}

/// Load `.env`, resolve the config path, and load from the process environment.
///
/// # Errors
///
/// Returns an error if the config path cannot be resolved or loading fails.
pub fn load_default_config() -> anyhow::Result<ChatConfig> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    let path = config_path_with(|key| std::env::var(key).ok())?;
    load_config_with(&path, |key| std::env::var(key).ok())
}

/// Resolve the config file path using a custom env resolver.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<PathBuf> {
    if let Some(p) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

/// Resolve the default config directory (`~/.rolebot/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".rolebot"))
}
