//! Research agents and the model invocation boundary.
//!
//! An agent is just a name and a mission; the work happens behind
//! [`AgentInvoker`], which turns an agent, a brief, and optional context into
//! loosely shaped JSON. [`AnthropicInvoker`](crate::clients::anthropic::AnthropicInvoker)
//! is the production implementation; tests supply their own.
//!
//! # Example
//!
//! ```rust
//! use marketscout::agent::AgentRoster;
//!
//! let roster = AgentRoster::default();
//! assert_eq!(roster.len(), 8);
//! assert!(roster.get("TrendDetector").is_some());
//! assert!(roster.get("Oracle").is_none());
//! ```

use crate::marketscout::brief::ResearchBrief;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// A named research role with the mission it is prompted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub name: String,
    pub mission: String,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, mission: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mission: mission.into(),
        }
    }
}

/// Ordered collection of agents known to an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRoster {
    agents: Vec<AgentSpec>,
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::empty()
            .with_agent(AgentSpec::new(
                "CommunityMapper",
                "Find where the target audience gathers online: specific communities, \
                 platforms, influencers and forums.",
            ))
            .with_agent(AgentSpec::new(
                "LocalContext",
                "Research the geographic and cultural factors that shape go-to-market \
                 strategy in the target region.",
            ))
            .with_agent(AgentSpec::new(
                "VoiceMiner",
                "Capture the authentic voice of the audience: verbatim quotes, pain points, \
                 desires, objections and recurring language.",
            ))
            .with_agent(AgentSpec::new(
                "CompetitorProfiler",
                "Profile competitors in depth: offerings, positioning, strengths, weaknesses \
                 and customer sentiment.",
            ))
            .with_agent(AgentSpec::new(
                "PricingIntel",
                "Map the pricing landscape, local economic context and willingness-to-pay \
                 signals for the target market.",
            ))
            .with_agent(AgentSpec::new(
                "TrendDetector",
                "Identify momentum, timing signals and trend data around the research topic.",
            ))
            .with_agent(AgentSpec::new(
                "OpportunitySynthesizer",
                "Combine every agent's findings into a professional market research report.",
            ))
            .with_agent(AgentSpec::new(
                "SourceVerifier",
                "Check every source cited in the report: that links resolve and that they \
                 support the claims attached to them.",
            ))
    }
}

impl AgentRoster {
    pub fn empty() -> Self {
        Self { agents: Vec::new() }
    }

    /// Add an agent, replacing any existing agent with the same name.
    pub fn with_agent(mut self, agent: AgentSpec) -> Self {
        match self.agents.iter_mut().find(|a| a.name == agent.name) {
            Some(existing) => *existing = agent,
            None => self.agents.push(agent),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentSpec> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Extra input handed to an agent beyond the brief.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentContext {
    /// Independent research agents see only the brief.
    None,
    /// Everything the earlier waves produced, keyed by agent name.
    Findings(BTreeMap<String, Value>),
    /// The synthesized report, or an empty object when there is none.
    Report(Value),
}

/// Why a single invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// The call did not finish within its deadline.
    TimedOut,
    /// The model API rejected the request.
    Api { status: u16, message: String },
    /// The request never completed (connection, TLS, body read).
    Transport(String),
    /// The API answered but the payload could not be understood.
    MalformedResponse(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::TimedOut => write!(f, "Agent timed out"),
            AgentError::Api { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            AgentError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AgentError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

impl Error for AgentError {}

/// The single model call behind every agent.
///
/// Implementations return a JSON object of findings, a `{"response": text}`
/// fallback, or a failure. A `_token_usage` object may be embedded in the
/// result; the orchestrator strips it before storage.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        agent: &AgentSpec,
        brief: &ResearchBrief,
        context: &AgentContext,
    ) -> Result<Value, AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_order() {
        let roster = AgentRoster::default();
        let names: Vec<&str> = roster.names().collect();
        assert_eq!(
            names,
            vec![
                "CommunityMapper",
                "LocalContext",
                "VoiceMiner",
                "CompetitorProfiler",
                "PricingIntel",
                "TrendDetector",
                "OpportunitySynthesizer",
                "SourceVerifier",
            ]
        );
    }

    #[test]
    fn test_with_agent_replaces_by_name() {
        let roster = AgentRoster::default().with_agent(AgentSpec::new("VoiceMiner", "quotes only"));
        assert_eq!(roster.len(), 8);
        assert_eq!(roster.get("VoiceMiner").map(|a| a.mission.as_str()), Some("quotes only"));
    }
}
