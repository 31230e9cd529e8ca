//! Processor configuration: YAML sections, environment overrides and validation.
//!
//! ```yaml
//! model:
//!   name: gpt-4o-mini
//!   timeout_ms: 60000
//! batch:
//!   size: 10
//!   max_concurrent: 5
//! rate_limit:
//!   requests_per_minute: 60
//! retry:
//!   max_retries: 3
//!   initial_delay_ms: 2000
//!   max_delay_ms: 10000
//!   exponential_backoff: true
//! monitoring:
//!   track_usage: true
//! ```
//!
//! Every section and field is optional; missing values take the defaults below.

use crate::resilience::RetryPolicy;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a data analysis assistant. Respond with exactly the JSON object requested, without markdown or any other text.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub model: ModelConfig,
    pub batch: BatchSettings,
    pub rate_limit: RateLimitSettings,
    pub retry: RetrySettings,
    pub monitoring: MonitoringSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier sent with every request; also selects the pricing tier.
    pub name: String,
    pub base_url: String,
    /// Usually supplied through `OPENAI_API_KEY` rather than the file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_completion_tokens: Option<u32>,
    /// Absolute timeout for one call, connect through body.
    pub timeout_ms: u64,
    pub system_message: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: None,
            max_completion_tokens: None,
            timeout_ms: 60_000,
            system_message: None,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn system_message(&self) -> &str {
        self.system_message
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub size: usize,
    pub max_concurrent: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            size: 10,
            max_concurrent: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests_per_minute: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 2_000,
            max_delay_ms: 10_000,
            exponential_backoff: true,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.exponential_backoff,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub track_usage: bool,
    pub track_timing: bool,
    pub show_progress: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            track_usage: true,
            track_timing: false,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `ai_batch_rust=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl ProcessorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_yaml_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the environment:
    /// `OPENAI_API_KEY`, `AI_BATCH_BASE_URL`, `AI_BATCH_TIMEOUT_MS`, `AI_BATCH_REQUESTS_PER_MINUTE`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.model.api_key = Some(key);
            }
        }
        if let Ok(url) = env::var("AI_BATCH_BASE_URL") {
            if !url.trim().is_empty() {
                self.model.base_url = url;
            }
        }
        if let Some(ms) = env::var("AI_BATCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.model.timeout_ms = ms;
        }
        if let Some(rpm) = env::var("AI_BATCH_REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            self.rate_limit.requests_per_minute = rpm;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.size == 0 {
            return Err(invalid("batch size must be greater than zero", "batch.size"));
        }
        if self.batch.max_concurrent == 0 {
            return Err(invalid(
                "max_concurrent must be greater than zero",
                "batch.max_concurrent",
            ));
        }
        if self.rate_limit.requests_per_minute == 0 {
            return Err(invalid(
                "requests_per_minute must be at least 1",
                "rate_limit.requests_per_minute",
            ));
        }
        if self.retry.exponential_backoff && self.retry.initial_delay_ms > self.retry.max_delay_ms
        {
            return Err(Error::configuration_with_context(
                "initial retry delay exceeds max retry delay",
                ErrorContext::new()
                    .with_field_path("retry.max_delay_ms")
                    .with_details(format!(
                        "initial_delay_ms={}, max_delay_ms={}",
                        self.retry.initial_delay_ms, self.retry.max_delay_ms
                    ))
                    .with_source("config"),
            ));
        }
        if self.model.timeout_ms == 0 {
            return Err(invalid("call timeout must be non-zero", "model.timeout_ms"));
        }
        if self.model.name.trim().is_empty() {
            return Err(invalid("model name must not be empty", "model.name"));
        }
        if let Err(e) = url::Url::parse(&self.model.base_url) {
            return Err(Error::configuration_with_context(
                "base_url is not a valid URL",
                ErrorContext::new()
                    .with_field_path("model.base_url")
                    .with_details(e.to_string())
                    .with_source("config"),
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str, field: &str) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new().with_field_path(field).with_source("config"),
    )
}
