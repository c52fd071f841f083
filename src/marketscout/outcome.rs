//! Agent results and token usage.
//!
//! The invocation boundary hands back loosely shaped JSON. Before anything is
//! stored the orchestrator splits off the embedded `_token_usage` record with
//! [`split_token_usage`] and classifies the remainder into an [`AgentOutcome`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::AddAssign;

/// Reserved key carrying token usage inside a raw agent result.
pub const TOKEN_USAGE_KEY: &str = "_token_usage";

/// Key marking a result as a failure record.
pub const ERROR_KEY: &str = "error";

/// Fallback key used when the model did not return parseable structured output.
pub const RESPONSE_KEY: &str = "response";

/// How many tokens were spent on prompt vs. completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Parse a `{input_tokens, output_tokens}` record. Missing or non-integer
    /// counts read as zero; anything that is not an object yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        let count = |key: &str| record.get(key).and_then(Value::as_u64).unwrap_or(0);
        Some(Self::new(count("input_tokens"), count("output_tokens")))
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
    }
}

/// Separate the `_token_usage` record from a raw result.
///
/// Returns a new value; the input is left untouched. Results that are not
/// objects, or carry no usage record, come back unchanged with `None`.
pub fn split_token_usage(raw: &Value) -> (Value, Option<TokenUsage>) {
    match raw {
        Value::Object(map) if map.contains_key(TOKEN_USAGE_KEY) => {
            let usage = map.get(TOKEN_USAGE_KEY).and_then(TokenUsage::from_json);
            let clean: Map<String, Value> = map
                .iter()
                .filter(|(key, _)| key.as_str() != TOKEN_USAGE_KEY)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            (Value::Object(clean), usage)
        }
        other => (other.clone(), None),
    }
}

/// What one agent produced in one run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// A JSON object with the agent's findings.
    Structured(Map<String, Value>),
    /// Free text the model returned instead of JSON.
    RawText(String),
    /// The agent failed; carries the error message.
    Failed(String),
}

impl AgentOutcome {
    /// Classify a cleaned agent result.
    ///
    /// Objects holding `error` are failures. An object whose only key is a
    /// string `response` is raw text, as is a bare string. Everything else that
    /// is an object is structured; other JSON shapes are kept as raw text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                if let Some(error) = map.get(ERROR_KEY) {
                    let message = match error {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return AgentOutcome::Failed(message);
                }
                if map.len() == 1 {
                    if let Some(Value::String(text)) = map.get(RESPONSE_KEY) {
                        return AgentOutcome::RawText(text.clone());
                    }
                }
                AgentOutcome::Structured(map)
            }
            Value::String(text) => AgentOutcome::RawText(text),
            other => AgentOutcome::RawText(other.to_string()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        AgentOutcome::Failed(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AgentOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// JSON shape handed to later agents and the export layer:
    /// the object itself, `{response: text}`, or `{error: message}`.
    pub fn to_value(&self) -> Value {
        match self {
            AgentOutcome::Structured(map) => Value::Object(map.clone()),
            AgentOutcome::RawText(text) => {
                let mut map = Map::new();
                map.insert(RESPONSE_KEY.to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
            AgentOutcome::Failed(message) => {
                let mut map = Map::new();
                map.insert(ERROR_KEY.to_string(), Value::String(message.clone()));
                Value::Object(map)
            }
        }
    }

    /// Best text rendering of the outcome, used to scan a report for links.
    ///
    /// Prefers a string `report`, then `response`, then the serialized object.
    pub fn text_content(&self) -> Option<String> {
        match self {
            AgentOutcome::Structured(map) => {
                for key in ["report", RESPONSE_KEY] {
                    if let Some(Value::String(text)) = map.get(key) {
                        return Some(text.clone());
                    }
                }
                serde_json::to_string(map).ok()
            }
            AgentOutcome::RawText(text) => Some(text.clone()),
            AgentOutcome::Failed(_) => None,
        }
    }
}

impl Serialize for AgentOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
