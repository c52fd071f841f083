//! Anthropic Messages API client for research agents.
//!
//! [`AnthropicInvoker`] renders the agent's prompt, sends it as a single user
//! turn, joins the text blocks of the reply, and parses them as JSON. Models
//! often wrap JSON in a ```` ```json ```` fence; that is tolerated. Replies that
//! are not a JSON object come back as `{"response": text}`. The API's usage
//! block is embedded under `_token_usage`.
//!
//! # Example
//!
//! ```rust,no_run
//! use marketscout::clients::anthropic::AnthropicInvoker;
//! use marketscout::{ResearchConfig, ResearchOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ResearchConfig::from_env()?;
//!     let invoker = AnthropicInvoker::from_config(&config)?;
//!     let orchestrator = ResearchOrchestrator::new(Arc::new(invoker)).with_config(&config);
//!     println!("{} agents ready", orchestrator.roster().len());
//!     Ok(())
//! }
//! ```

use crate::marketscout::agent::{AgentContext, AgentError, AgentInvoker, AgentSpec};
use crate::marketscout::brief::ResearchBrief;
use crate::marketscout::config::{ResearchConfig, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::marketscout::outcome::{RESPONSE_KEY, TOKEN_USAGE_KEY};
use crate::marketscout::prompts::build_prompt;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap();
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Serialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// [`AgentInvoker`] backed by the Anthropic Messages API.
pub struct AnthropicInvoker {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicInvoker {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, AgentError> {
        let client = reqwest::ClientBuilder::new()
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Build from a [`ResearchConfig`]; fails when no API key is configured.
    pub fn from_config(config: &ResearchConfig) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let api_key = config.require_api_key()?;
        let invoker = Self::new(api_key, config.model.clone())?
            .with_max_tokens(config.max_output_tokens);
        Ok(invoker)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Point at a different host, e.g. a proxy or a local stub server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, prompt: &str) -> Result<MessagesResponse, AgentError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::TimedOut
                } else {
                    AgentError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| AgentError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl AgentInvoker for AnthropicInvoker {
    async fn invoke(
        &self,
        agent: &AgentSpec,
        brief: &ResearchBrief,
        context: &AgentContext,
    ) -> Result<Value, AgentError> {
        let prompt = build_prompt(agent, brief, context);
        log::debug!(
            "{} sending {} char prompt to {}",
            agent.name,
            prompt.len(),
            self.model
        );

        let response = self.send(&prompt).await?;
        let text: Vec<&str> = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.is_empty() {
            return Err(AgentError::MalformedResponse(
                "response contained no text blocks".to_string(),
            ));
        }

        let mut result = parse_model_output(&text.join("\n"));
        if let (Some(usage), Value::Object(map)) = (response.usage, &mut result) {
            let usage = serde_json::to_value(usage)
                .map_err(|e| AgentError::MalformedResponse(e.to_string()))?;
            map.insert(TOKEN_USAGE_KEY.to_string(), usage);
        }
        Ok(result)
    }
}

/// Turn model text into a result object.
///
/// Tries the whole text as JSON, then the first fenced block. Anything that
/// does not yield a JSON object becomes `{"response": text}`.
pub fn parse_model_output(text: &str) -> Value {
    let trimmed = text.trim();
    let candidates = std::iter::once(trimmed).chain(
        JSON_FENCE
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
    );
    for candidate in candidates {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            return Value::Object(map);
        }
    }

    let mut fallback = Map::new();
    fallback.insert(RESPONSE_KEY.to_string(), Value::String(trimmed.to_string()));
    Value::Object(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_bare_json() {
        assert_eq!(
            parse_model_output(r#"  {"trends": ["solar"]} "#),
            json!({"trends": ["solar"]})
        );
    }

    #[test]
    fn test_parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"competitors\": []}\n```\nGood luck.";
        assert_eq!(parse_model_output(text), json!({"competitors": []}));
    }

    #[test]
    fn test_prose_falls_back_to_response() {
        assert_eq!(
            parse_model_output("I could not find anything."),
            json!({"response": "I could not find anything."})
        );
    }

    #[test]
    fn test_non_object_json_falls_back_to_response() {
        assert_eq!(parse_model_output("[1, 2]"), json!({"response": "[1, 2]"}));
    }
}
