//! Full Research Run Example
//!
//! Runs all eight research agents against a brief and writes the results,
//! including the source-check summary, to `research_results.json`.
//!
//! # Usage
//!
//! ```text
//! cargo run --example run_research -- path/to/brief.json
//! ```
//!
//! Without an argument a built-in sample brief is used.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY` (required)
//! - `RESEARCH_MODEL` (optional, defaults to `claude-sonnet-4-0`)
//! - `RESEARCH_TOKEN_BUDGET` (optional, `0` or unset means unlimited)
//! - `RESEARCH_AGENT_TIMEOUT_SECS` (optional, defaults to 180)
//! - `RUST_LOG` (e.g. `marketscout=info`)

use async_trait::async_trait;
use marketscout::clients::anthropic::AnthropicInvoker;
use marketscout::event::{EventHandler, ResearchEvent};
use marketscout::{ResearchBrief, ResearchConfig, ResearchOrchestrator};
use std::sync::Arc;

/// Prints progress to stdout as the run unfolds.
struct ProgressPrinter;

#[async_trait]
impl EventHandler for ProgressPrinter {
    async fn on_research_event(&self, event: &ResearchEvent) {
        match event {
            ResearchEvent::RunStarted {
                run_id,
                wave_count,
                agent_count,
            } => {
                println!("Run {}: {} agents in {} waves", run_id, agent_count, wave_count);
            }
            ResearchEvent::WaveStarted {
                description, agents, ..
            } => {
                println!("\n{}\n  agents: {}", description, agents.join(", "));
            }
            ResearchEvent::AgentCompleted { agent, usage, .. } => match usage {
                Some(usage) => println!("  ✓ {} ({} tokens)", agent, usage.total()),
                None => println!("  ✓ {}", agent),
            },
            ResearchEvent::AgentFailed { agent, error, .. } => {
                println!("  ✗ {}: {}", agent, error);
            }
            ResearchEvent::BudgetExhausted {
                tokens_used,
                token_budget,
                ..
            } => {
                println!("\nToken budget reached ({} / {}), stopping", tokens_used, token_budget);
            }
            ResearchEvent::SourceCheckCompleted { summary, .. } => {
                println!(
                    "\nSources: {} alive, {} dead, {} timed out, {} errors",
                    summary.alive, summary.dead, summary.timeout, summary.errors
                );
            }
            ResearchEvent::RunCompleted { cost, .. } => {
                println!(
                    "\nDone: {} tokens, estimated ${:.4}",
                    cost.total_tokens(),
                    cost.estimated_cost_usd
                );
            }
            _ => {}
        }
    }
}

fn sample_brief() -> Result<ResearchBrief, marketscout::BriefError> {
    ResearchBrief::builder(
        "Mobile bookkeeping app for market traders",
        "Traders lose track of cash sales and stock",
        "Open-air market traders",
        "Lagos, Nigeria",
        "Would traders pay a monthly fee, and how much?",
    )
    .known_competitors(vec!["Kippa".to_string(), "Bumpa".to_string()])
    .stage("exploring")
    .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    marketscout::init_logger();

    let brief = match std::env::args().nth(1) {
        Some(path) => ResearchBrief::load(path).await?,
        None => sample_brief()?,
    };
    let config = ResearchConfig::from_env()?;
    let invoker = Arc::new(AnthropicInvoker::from_config(&config)?);

    let mut orchestrator = ResearchOrchestrator::new(invoker)
        .with_config(&config)
        .with_event_handler(Arc::new(ProgressPrinter));

    let run = orchestrator.run_all(&brief).await?;
    run.save_json("research_results.json").await?;
    println!("\nResults written to research_results.json");
    Ok(())
}
