//! Configuration management for scholar-chat.
//!
//! Configuration is read from environment variables (a `.env` file in the
//! working directory is loaded first by the binary):
//! - `API_KEY` - Required. Key for the model provider. `GROQ_API_KEY` is accepted as a fallback.
//! - `MODEL` - Optional. Model identifier. Defaults to `gemma2-9b-it`.
//! - `MODEL_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to Groq.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `MAX_ROUNDS` - Optional. Model round-trips allowed per turn. Defaults to `10`.
//! - `TOOL_TOP_K` - Optional. Source results each lookup tool considers. Defaults to `1`.
//! - `TOOL_MAX_CHARS` - Optional. Character budget of a tool result. Defaults to `300`.
//! - `MODEL_TIMEOUT_SECS` - Optional. Timeout of a single model call. Defaults to `60`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Timeout of a single tool call. Defaults to `20`.
//! - `PARALLEL_TOOLS` - Optional. Run the tool calls of one round concurrently. Defaults to `false`.
//! - `SESSION_IDLE_SECS` - Optional. Idle time after which a chat session is dropped. Defaults to `3600`.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Limits shared by every lookup tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLimits {
    /// Maximum number of source results considered per query
    pub top_k: usize,

    /// Maximum number of characters returned to the model
    pub max_chars: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            top_k: 1,
            max_chars: 300,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model provider API key
    pub api_key: String,

    /// Model identifier sent with every completion request
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub model_base_url: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum model round-trips per user turn
    pub max_rounds: usize,

    /// Lookup tool limits
    pub tool_limits: ToolLimits,

    /// Timeout for one model call
    pub model_timeout: Duration,

    /// Timeout for one tool call
    pub tool_timeout: Duration,

    /// Run the tool calls of a round concurrently
    pub parallel_tools: bool,

    /// Idle time after which a session is discarded
    pub session_idle: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither `API_KEY` nor `GROQ_API_KEY` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("API_KEY".to_string()))?;

        let defaults = Self::new(api_key);

        let model = std::env::var("MODEL").unwrap_or(defaults.model);
        let model_base_url = std::env::var("MODEL_BASE_URL").unwrap_or(defaults.model_base_url);
        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = env_parse("PORT", defaults.port)?;

        let max_rounds = non_zero(env_parse("MAX_ROUNDS", defaults.max_rounds)?, "MAX_ROUNDS")?;
        let tool_limits = ToolLimits {
            top_k: non_zero(env_parse("TOOL_TOP_K", defaults.tool_limits.top_k)?, "TOOL_TOP_K")?,
            max_chars: non_zero(
                env_parse("TOOL_MAX_CHARS", defaults.tool_limits.max_chars)?,
                "TOOL_MAX_CHARS",
            )?,
        };

        let model_timeout = Duration::from_secs(env_parse(
            "MODEL_TIMEOUT_SECS",
            defaults.model_timeout.as_secs(),
        )?);
        let tool_timeout = Duration::from_secs(env_parse(
            "TOOL_TIMEOUT_SECS",
            defaults.tool_timeout.as_secs(),
        )?);
        let session_idle = Duration::from_secs(env_parse(
            "SESSION_IDLE_SECS",
            defaults.session_idle.as_secs(),
        )?);

        let parallel_tools = std::env::var("PARALLEL_TOOLS")
            .ok()
            .map(|v| {
                parse_bool(&v).map_err(|e| ConfigError::InvalidValue("PARALLEL_TOOLS".to_string(), e))
            })
            .transpose()?
            .unwrap_or(defaults.parallel_tools);

        Ok(Self {
            api_key: defaults.api_key,
            model,
            model_base_url,
            host,
            port,
            max_rounds,
            tool_limits,
            model_timeout,
            tool_timeout,
            parallel_tools,
            session_idle,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            model_base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_rounds: 10,
            tool_limits: ToolLimits::default(),
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(20),
            parallel_tools: false,
            session_idle: Duration::from_secs(3600),
        }
    }
}

fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e)))
}

fn non_zero(value: usize, name: &str) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(value)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}
