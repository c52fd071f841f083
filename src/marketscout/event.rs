//! Run event system.
//!
//! Implement [`EventHandler`] to observe a research run as it happens: wave
//! boundaries, per-agent completions and failures, budget stops, and the
//! source-check pass. The handler is registered on the orchestrator with
//! [`with_event_handler`](crate::orchestrator::ResearchOrchestrator::with_event_handler)
//! and shared as `Arc<dyn EventHandler>`.
//!
//! [`ResearchEvent::WaveCompleted`] carries the wave's results and is the hook
//! for streaming partial findings to a UI or progress bar.
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use marketscout::event::{EventHandler, ResearchEvent};
//!
//! struct ProgressPrinter;
//!
//! #[async_trait]
//! impl EventHandler for ProgressPrinter {
//!     async fn on_research_event(&self, event: &ResearchEvent) {
//!         match event {
//!             ResearchEvent::WaveStarted { description, .. } => println!("{}", description),
//!             ResearchEvent::WaveCompleted { wave_index, results, .. } => {
//!                 println!("wave {} finished with {} results", wave_index + 1, results.len());
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use crate::marketscout::ledger::CostSummary;
use crate::marketscout::outcome::{AgentOutcome, TokenUsage};
use crate::marketscout::source_checker::SourceCheckSummary;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Events emitted by [`ResearchOrchestrator`](crate::orchestrator::ResearchOrchestrator).
///
/// Every variant carries the `run_id` so handlers shared across runs can tell
/// them apart. Wave indices are 0-based.
///
/// # Event Flow (during a complete `run_all()`)
///
/// ```text
/// RunStarted
///   └─ WaveStarted { wave_index: 0 }
///       ├─ AgentCompleted / AgentFailed   (one per agent, in join order)
///   └─ WaveCompleted { wave_index: 0 }
///   └─ ... remaining waves, or BudgetExhausted
/// SourceCheckCompleted | SourceCheckSkipped
/// RunCompleted
/// ```
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    RunStarted {
        run_id: String,
        wave_count: usize,
        agent_count: usize,
    },

    WaveStarted {
        run_id: String,
        wave_index: usize,
        description: String,
        agents: Vec<String>,
    },

    /// An agent returned successfully. `usage` is the delta for this call.
    AgentCompleted {
        run_id: String,
        agent: String,
        usage: Option<TokenUsage>,
    },

    /// An agent failed or timed out. The failure is recorded, not propagated.
    AgentFailed {
        run_id: String,
        agent: String,
        error: String,
    },

    /// All agents in the wave have an entry in `results`.
    WaveCompleted {
        run_id: String,
        wave_index: usize,
        results: BTreeMap<String, AgentOutcome>,
    },

    /// The ledger reached the budget ceiling before `next_wave` could start.
    BudgetExhausted {
        run_id: String,
        next_wave: usize,
        tokens_used: u64,
        token_budget: u64,
    },

    SourceCheckCompleted {
        run_id: String,
        summary: SourceCheckSummary,
    },

    /// The verification pass did not produce a summary.
    SourceCheckSkipped { run_id: String, reason: String },

    RunCompleted {
        run_id: String,
        waves_completed: usize,
        cost: CostSummary,
    },
}

/// Receives [`ResearchEvent`]s. The default implementation ignores them.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_research_event(&self, _event: &ResearchEvent) {}
}
