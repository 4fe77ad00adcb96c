// Copilot runtime configuration
// Feature: AI Copilot orchestration core

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::detector::DEFAULT_CONFIDENCE_THRESHOLD;
use super::error::{CopilotError, CopilotResult};
use super::orchestrator::{OrchestratorConfig, DEFAULT_GRACE_PERIOD};

pub const ENV_CHAT_ENDPOINT: &str = "COPILOT_CHAT_ENDPOINT";
pub const ENV_CLASSIFY_ENDPOINT: &str = "COPILOT_CLASSIFY_ENDPOINT";
pub const ENV_MODEL: &str = "COPILOT_MODEL";
pub const ENV_TEMPERATURE: &str = "COPILOT_TEMPERATURE";
pub const ENV_GRACE_PERIOD_MS: &str = "COPILOT_GRACE_PERIOD_MS";

fn default_model() -> String {
    String::from("gpt-4o-mini")
}

fn default_temperature() -> f32 {
    0.7
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD.as_millis() as u64
}

fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Endpoints and tuning knobs for a copilot session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CopilotConfig {
    pub chat_endpoint: String,
    /// Remote classifier; keyword-only detection when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classify_endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Legacy flag, see `normalize_block_configs`
    #[serde(default)]
    pub hide_json_blocks: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl CopilotConfig {
    pub fn new(chat_endpoint: impl Into<String>) -> Self {
        Self {
            chat_endpoint: chat_endpoint.into(),
            classify_endpoint: None,
            model: default_model(),
            temperature: default_temperature(),
            grace_period_ms: default_grace_period_ms(),
            confidence_threshold: default_confidence_threshold(),
            hide_json_blocks: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Read configuration from `COPILOT_*` environment variables
    pub fn from_env() -> CopilotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> CopilotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let chat_endpoint = get(ENV_CHAT_ENDPOINT)
            .ok_or_else(|| CopilotError::InvalidConfig(format!("{} is not set", ENV_CHAT_ENDPOINT)))?;

        let mut config = Self::new(chat_endpoint);
        config.classify_endpoint = get(ENV_CLASSIFY_ENDPOINT);

        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_TEMPERATURE) {
            config.temperature = raw.parse().map_err(|_| {
                CopilotError::InvalidConfig(format!("{} must be a number, got '{}'", ENV_TEMPERATURE, raw))
            })?;
        }
        if let Some(raw) = get(ENV_GRACE_PERIOD_MS) {
            config.grace_period_ms = raw.parse().map_err(|_| {
                CopilotError::InvalidConfig(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    ENV_GRACE_PERIOD_MS, raw
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CopilotResult<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CopilotError::InvalidConfig(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(CopilotError::InvalidConfig(format!(
                "confidence threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            grace_period: Duration::from_millis(self.grace_period_ms),
        }
    }
}
