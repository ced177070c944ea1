//! Configuration management for the agent server.
//!
//! Configuration can be set via environment variables:
//! - `LLM_API_KEY` - Required (falls back to `DEEPSEEK_API_KEY`). Completion service key.
//! - `LLM_BASE_URL` - Optional. OpenAI-compatible base URL. Defaults to `https://api.deepseek.com/v1`.
//! - `DEFAULT_MODEL` - Optional. The model to use. Defaults to `deepseek-chat`.
//! - `LLM_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.0`.
//! - `LLM_MAX_TOKENS` - Optional. Completion token cap.
//! - `LLM_TIMEOUT_SECS` - Optional. Completion request timeout. Defaults to `30`.
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `MAX_ITERATIONS` - Optional. Default agent loop iteration cap. Defaults to `5`.
//! - `MAX_ITERATIONS_LIMIT` - Optional. Highest cap a request may ask for. Defaults to `20`.
//! - `TOOL_TIMEOUT_SECS` - Optional. Per tool call timeout. Defaults to `10`.
//! - `PARSE_RETRIES` - Optional. Consecutive unparseable replies tolerated. Defaults to `1`, at most `5`.
//! - `VERBOSE` - Optional. Log every transcript turn at info level.
//! - `CORS_ORIGINS` - Optional. Comma separated list of allowed origins.

use std::time::Duration;
use thiserror::Error;

/// Upper bound on `PARSE_RETRIES`. Parse failures don't consume iterations.
pub const MAX_PARSE_RETRIES: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Completion service configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer key for the completion service
    pub api_key: String,

    /// OpenAI-compatible base URL (without `/chat/completions`)
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Optional completion token cap
    pub max_tokens: Option<u32>,

    /// Request timeout
    pub timeout: Duration,
}

/// Server and agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Completion service settings
    pub llm: LlmConfig,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Default iteration cap for runs that don't specify one
    pub max_iterations: usize,

    /// Highest iteration cap a request may ask for
    pub max_iterations_limit: usize,

    /// Timeout applied to every tool invocation
    pub tool_timeout: Duration,

    /// Consecutive parse failures tolerated before a run aborts
    pub parse_retries: u32,

    /// Default verbosity for runs
    pub verbose: bool,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if neither `LLM_API_KEY` nor
    /// `DEEPSEEK_API_KEY` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("DEEPSEEK_API_KEY"))
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY".to_string()))?;

        let base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string());

        let model = std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());

        let temperature = parse_env("LLM_TEMPERATURE", 0.0f32)?;

        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|e| ConfigError::InvalidValue("LLM_MAX_TOKENS".to_string(), format!("{}", e)))
            })
            .transpose()?;

        let llm_timeout_secs = parse_env("LLM_TIMEOUT_SECS", 30u64)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = parse_env("PORT", 8000u16)?;

        let max_iterations = parse_env("MAX_ITERATIONS", 5usize)?;
        let max_iterations_limit = parse_env("MAX_ITERATIONS_LIMIT", 20usize)?;

        let tool_timeout_secs = parse_env("TOOL_TIMEOUT_SECS", 10u64)?;
        let parse_retries = parse_env("PARSE_RETRIES", 1u32)?;

        let verbose = std::env::var("VERBOSE")
            .ok()
            .map(|v| parse_bool(&v).map_err(|e| ConfigError::InvalidValue("VERBOSE".to_string(), e)))
            .transpose()?
            .unwrap_or(false);

        let cors_origins = std::env::var("CORS_ORIGINS")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        let config = Self {
            llm: LlmConfig {
                api_key,
                base_url,
                model,
                temperature,
                max_tokens,
                timeout: Duration::from_secs(llm_timeout_secs),
            },
            host,
            port,
            max_iterations,
            max_iterations_limit,
            tool_timeout: Duration::from_secs(tool_timeout_secs),
            parse_retries,
            verbose,
            cors_origins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the agent bounds: `1 <= max_iterations <= max_iterations_limit`
    /// and `parse_retries <= MAX_PARSE_RETRIES`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.max_iterations > self.max_iterations_limit {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                format!("must not exceed MAX_ITERATIONS_LIMIT ({})", self.max_iterations_limit),
            ));
        }
        if self.parse_retries > MAX_PARSE_RETRIES {
            return Err(ConfigError::InvalidValue(
                "PARSE_RETRIES".to_string(),
                format!("must be at most {}", MAX_PARSE_RETRIES),
            ));
        }
        Ok(())
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_key: api_key.into(),
                base_url: base_url.into(),
                model: model.into(),
                temperature: 0.0,
                max_tokens: None,
                timeout: Duration::from_secs(30),
            },
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_iterations: 5,
            max_iterations_limit: 20,
            tool_timeout: Duration::from_secs(10),
            parse_retries: 1,
            verbose: false,
            cors_origins: Vec::new(),
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("expected boolean-like value, got: {}", other)),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool(" off "), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn parse_list_drops_blanks() {
        assert_eq!(
            parse_list("http://localhost, ,http://localhost:3000,"),
            vec!["http://localhost".to_string(), "http://localhost:3000".to_string()]
        );
    }

    #[test]
    fn new_uses_agent_defaults() {
        let config = Config::new("k", "http://x", "m");
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.tool_timeout, Duration::from_secs(10));
        assert_eq!(config.parse_retries, 1);
        assert_eq!(config.max_iterations_limit, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unbounded_agent_settings() {
        let mut config = Config::new("k", "http://x", "m");
        config.parse_retries = 1_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(name, _)) if name == "PARSE_RETRIES"
        ));

        let mut config = Config::new("k", "http://x", "m");
        config.max_iterations = 21;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(name, _)) if name == "MAX_ITERATIONS"
        ));

        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }
}
