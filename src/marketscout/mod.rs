// src/marketscout/mod.rs

pub mod agent;
pub mod brief;
pub mod clients;
pub mod config;
pub mod event;
pub mod ledger;
pub mod orchestrator;
pub mod outcome;
pub mod prompts;
pub mod schema;
pub mod source_checker;

// Export the orchestrator at the module root so callers can write
// marketscout::ResearchOrchestrator instead of the full path.
pub use orchestrator::{ResearchOrchestrator, ResearchRun};
