//! Runtime settings for a research run.
//!
//! [`ResearchConfig`] is a plain struct. Build it by hand, start from
//! [`Default`], or read it from the environment with
//! [`ResearchConfig::from_env`]. No config-file format is involved.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `RESEARCH_TOKEN_BUDGET` | token ceiling checked between waves, `0` = unlimited | unlimited |
//! | `RESEARCH_AGENT_TIMEOUT_SECS` | per-agent deadline | `180` |
//! | `ANTHROPIC_API_KEY` | key for the model client | none |
//! | `RESEARCH_MODEL` | model identifier | `claude-sonnet-4-0` |
//! | `RESEARCH_MAX_OUTPUT_TOKENS` | completion cap per call | `8192` |
//!
//! # Example
//!
//! ```rust
//! use marketscout::ResearchConfig;
//! use std::time::Duration;
//!
//! let config = ResearchConfig::default().with_token_budget(250_000);
//! assert_eq!(config.agent_timeout, Duration::from_secs(180));
//! assert_eq!(config.token_budget, 250_000);
//! ```

use crate::marketscout::ledger::CostRates;
use std::error::Error;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-0";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

#[derive(Debug)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    InvalidValue {
        variable: &'static str,
        value: String,
        reason: String,
    },
    /// A variable the caller needs is not set.
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue {
                variable,
                value,
                reason,
            } => write!(f, "Invalid value {:?} for {}: {}", value, variable, reason),
            ConfigError::Missing(variable) => write!(f, "{} is not set", variable),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    /// Token ceiling checked at wave boundaries. `0` disables the check.
    pub token_budget: u64,
    pub agent_timeout: Duration,
    pub cost_rates: CostRates,
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            token_budget: 0,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            cost_rates: CostRates::default(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl ResearchConfig {
    /// Read settings from the process environment. Unset or blank variables
    /// keep their defaults; malformed numbers are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(raw) = read("RESEARCH_TOKEN_BUDGET") {
            config.token_budget = parse_number("RESEARCH_TOKEN_BUDGET", &raw)?;
        }
        if let Some(raw) = read("RESEARCH_AGENT_TIMEOUT_SECS") {
            let secs: u64 = parse_number("RESEARCH_AGENT_TIMEOUT_SECS", &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    variable: "RESEARCH_AGENT_TIMEOUT_SECS",
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.agent_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = read("RESEARCH_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = parse_number("RESEARCH_MAX_OUTPUT_TOKENS", &raw)?;
        }
        if let Some(model) = read("RESEARCH_MODEL") {
            config.model = model;
        }
        config.api_key = read("ANTHROPIC_API_KEY");
        Ok(config)
    }

    pub fn with_token_budget(mut self, token_budget: u64) -> Self {
        self.token_budget = token_budget;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_cost_rates(mut self, rates: CostRates) -> Self {
        self.cost_rates = rates;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The API key, or [`ConfigError::Missing`] when none was configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))
    }
}

fn parse_number<T>(variable: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        variable,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ResearchConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResearchConfig::default());
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn test_reads_budget_and_timeout() {
        let config = ResearchConfig::from_lookup(lookup(&[
            ("RESEARCH_TOKEN_BUDGET", "50000"),
            ("RESEARCH_AGENT_TIMEOUT_SECS", "30"),
            ("RESEARCH_MODEL", "claude-opus-4-1"),
            ("ANTHROPIC_API_KEY", " sk-test "),
        ]))
        .unwrap();

        assert_eq!(config.token_budget, 50_000);
        assert_eq!(config.agent_timeout, Duration::from_secs(30));
        assert_eq!(config.model, "claude-opus-4-1");
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn test_blank_budget_means_unlimited() {
        let config = ResearchConfig::from_lookup(lookup(&[("RESEARCH_TOKEN_BUDGET", "  ")])).unwrap();
        assert_eq!(config.token_budget, 0);
    }

    #[test]
    fn test_rejects_negative_budget() {
        let err = ResearchConfig::from_lookup(lookup(&[("RESEARCH_TOKEN_BUDGET", "-5")])).unwrap_err();
        assert!(err.to_string().contains("RESEARCH_TOKEN_BUDGET"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(ResearchConfig::from_lookup(lookup(&[("RESEARCH_AGENT_TIMEOUT_SECS", "0")])).is_err());
    }
}
