//! Process configuration read from the environment

use crate::debate::DebateSettings;
use crate::llm::{
    DEFAULT_DEEPSEEK_MODEL, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL,
    DEFAULT_OPENROUTER_BASE_URL,
};
use crate::session::DEFAULT_HISTORY_CAP;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_TURN_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_TURNS: usize = 40;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a valid number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("HISTORY_CAP must be at least 2, got {0}")]
    HistoryCapTooSmall(usize),
}

/// Credentials and endpoint for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// Only origin allowed by CORS
    pub frontend_url: String,
    pub gemini: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub history_cap: usize,
    pub turn_delay: Duration,
    /// `None` means runs continue until cancelled
    pub max_turns: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let history_cap = parse(&get, "HISTORY_CAP")?.unwrap_or(DEFAULT_HISTORY_CAP);
        if history_cap < 2 {
            return Err(ConfigError::HistoryCapTooSmall(history_cap));
        }
        let max_turns = parse(&get, "DEBATE_MAX_TURNS")?.unwrap_or(DEFAULT_MAX_TURNS);

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
            frontend_url: or("FRONTEND_URL", DEFAULT_FRONTEND_URL),
            gemini: ProviderConfig {
                api_key: get("GEMINI_API_KEY"),
                model: or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                base_url: or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            },
            deepseek: ProviderConfig {
                api_key: get("OPENROUTER_API_KEY"),
                model: or("DEEPSEEK_MODEL", DEFAULT_DEEPSEEK_MODEL),
                base_url: or("OPENROUTER_BASE_URL", DEFAULT_OPENROUTER_BASE_URL),
            },
            history_cap,
            turn_delay: Duration::from_millis(
                parse(&get, "TURN_DELAY_MS")?.unwrap_or(DEFAULT_TURN_DELAY_MS),
            ),
            max_turns: (max_turns > 0).then_some(max_turns),
        })
    }

    pub fn debate_settings(&self) -> DebateSettings {
        DebateSettings {
            turn_delay: self.turn_delay,
            max_turns: self.max_turns,
        }
    }

    /// Environment variables of providers that have no key
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gemini.api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.deepseek.api_key.is_none() {
            missing.push("OPENROUTER_API_KEY");
        }
        missing
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
