//! Client configuration loaded from the environment

use std::time::Duration;
use thiserror::Error;

pub const API_URL_VAR: &str = "AGENT_CHAT_API_URL";
pub const CONNECT_TIMEOUT_VAR: &str = "AGENT_CHAT_CONNECT_TIMEOUT_SECS";
pub const IDLE_TIMEOUT_VAR: &str = "AGENT_CHAT_IDLE_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("Invalid API URL {0:?}: expected an http or https URL")]
    InvalidUrl(String),
}

/// Settings for the chat API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL; endpoint paths are appended to it
    pub api_url: String,
    pub connect_timeout: Duration,
    /// Maximum wait between body reads before the stream is declared stalled.
    /// `None` waits indefinitely.
    pub idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup(API_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        validate_url(&api_url)?;

        let connect_timeout = parse_secs(CONNECT_TIMEOUT_VAR, lookup(CONNECT_TIMEOUT_VAR))?
            .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
        let idle_timeout = parse_secs(IDLE_TIMEOUT_VAR, lookup(IDLE_TIMEOUT_VAR))?;

        Ok(Self {
            api_url,
            connect_timeout,
            idle_timeout,
        })
    }
}

fn validate_url(url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

fn parse_secs(var: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}
