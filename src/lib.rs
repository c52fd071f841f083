//! # marketscout
//!
//! marketscout runs a team of LLM-backed research agents over a business idea
//! and turns their findings into a market research report.
//!
//! The crate provides:
//!
//! * **Research briefs**: [`ResearchBrief`] captures the idea being researched. Required
//!   answers are validated and trimmed once at construction; the brief is immutable after.
//! * **Wave orchestration**: [`ResearchOrchestrator`] runs eight agents in five ordered
//!   waves. Agents in a wave run concurrently; one failing or hanging never cancels the
//!   others.
//! * **Token budgets**: every agent's usage is tallied in a [`ledger::TokenLedger`]; an
//!   optional ceiling stops the run between waves and keeps partial results.
//! * **Schema checks**: [`schema::SchemaRegistry`] flags results that miss the keys an agent
//!   is expected to produce. Warnings are logged, never fatal.
//! * **Source verification**: [`source_checker`] probes every link in the synthesized report
//!   and classifies it as alive, dead, timed out, invalid or errored.
//! * **Provider seam**: [`agent::AgentInvoker`] abstracts the model call;
//!   [`clients::anthropic::AnthropicInvoker`] implements it for the Anthropic Messages API.
//!
//! ## Running research
//!
//! ```rust,no_run
//! use marketscout::clients::anthropic::AnthropicInvoker;
//! use marketscout::{ResearchBrief, ResearchConfig, ResearchOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     marketscout::init_logger();
//!
//!     let config = ResearchConfig::from_env()?;
//!     let brief = ResearchBrief::builder(
//!         "Meal-prep subscription",
//!         "No time to cook healthy food",
//!         "Young professionals",
//!         "Lisbon, Portugal",
//!         "Is there room for a premium tier?",
//!     )
//!     .known_competitors(vec!["HelloFresh".into()])
//!     .build()?;
//!
//!     let invoker = Arc::new(AnthropicInvoker::from_config(&config)?);
//!     let mut orchestrator = ResearchOrchestrator::new(invoker).with_config(&config);
//!     let run = orchestrator.run_all(&brief).await?;
//!     run.save_json("research_results.json").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Testing without a model
//!
//! Anything implementing [`agent::AgentInvoker`] can stand in for the model:
//!
//! ```rust
//! use async_trait::async_trait;
//! use marketscout::agent::{AgentContext, AgentError, AgentInvoker, AgentSpec};
//! use marketscout::ResearchBrief;
//! use serde_json::{json, Value};
//!
//! struct Canned;
//!
//! #[async_trait]
//! impl AgentInvoker for Canned {
//!     async fn invoke(
//!         &self,
//!         agent: &AgentSpec,
//!         _brief: &ResearchBrief,
//!         _context: &AgentContext,
//!     ) -> Result<Value, AgentError> {
//!         Ok(json!({"response": format!("{} found nothing", agent.name)}))
//!     }
//! }
//! ```
//!
//! ## Logging
//!
//! All diagnostics go through the [`log`] facade. Call [`init_logger`] once to route them to
//! `env_logger` and control verbosity with `RUST_LOG`, e.g. `RUST_LOG=marketscout=info`.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Applications that already install a logger can skip this; every message goes
/// through the `log` facade either way.
///
/// ```rust
/// marketscout::init_logger();
/// marketscout::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `marketscout` module.
pub mod marketscout;

// Re-exporting key items for easier external access.
pub use marketscout::agent;
pub use marketscout::agent::{AgentContext, AgentError, AgentInvoker, AgentRoster, AgentSpec};
pub use marketscout::brief;
pub use marketscout::brief::{BriefError, Depth, ResearchBrief};
pub use marketscout::clients;
pub use marketscout::config;
pub use marketscout::config::{ConfigError, ResearchConfig};
pub use marketscout::event;
pub use marketscout::event::{EventHandler, ResearchEvent};
pub use marketscout::ledger;
pub use marketscout::orchestrator;
pub use marketscout::orchestrator::{wave_description, ResearchError, WaveTopology};
pub use marketscout::outcome;
pub use marketscout::outcome::{AgentOutcome, TokenUsage};
pub use marketscout::prompts;
pub use marketscout::schema;
pub use marketscout::source_checker;
pub use marketscout::{ResearchOrchestrator, ResearchRun};
