//! Wave-based research orchestration.
//!
//! A [`ResearchOrchestrator`] runs the agent roster in ordered waves. Agents
//! inside a wave each run on their own spawned task and are joined so that
//! one failure, timeout or panic never cancels its siblings. Results accumulate in a
//! shared map that later waves can read:
//!
//! - the **synthesizer** sees every earlier result (failures included),
//! - the **verifier** sees only the synthesizer's result,
//! - every other agent sees just the brief.
//!
//! ```text
//! run_all
//!   ├─ wave 1: CommunityMapper, LocalContext
//!   ├─ wave 2: VoiceMiner, CompetitorProfiler, PricingIntel
//!   ├─ wave 3: TrendDetector
//!   ├─ wave 4: OpportunitySynthesizer   (findings context)
//!   ├─ wave 5: SourceVerifier           (report context)
//!   ├─ link check of the synthesized report
//!   └─ token / cost summary
//! ```
//!
//! A token budget, when set, is checked before each wave; once the ledger
//! reaches it the run stops and keeps what it has. Per-agent failures are
//! recorded as [`AgentOutcome::Failed`] and never escalate. Only programming
//! errors (bad wave index, unknown agent, inconsistent topology) come back as
//! [`ResearchError`].
//!
//! # Example
//!
//! ```rust,no_run
//! use marketscout::clients::anthropic::AnthropicInvoker;
//! use marketscout::{ResearchBrief, ResearchConfig, ResearchOrchestrator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ResearchConfig::from_env()?;
//!     let brief = ResearchBrief::builder(
//!         "AI bookkeeping assistant",
//!         "Receipts pile up and taxes are late",
//!         "Freelance designers",
//!         "Nairobi, Kenya",
//!         "Would they pay $10/month?",
//!     )
//!     .build()?;
//!
//!     let invoker = Arc::new(AnthropicInvoker::from_config(&config)?);
//!     let mut orchestrator = ResearchOrchestrator::new(invoker).with_config(&config);
//!     let run = orchestrator.run_all(&brief).await?;
//!
//!     println!("{} results, ${:.2}", run.results.len(), run.cost.estimated_cost_usd);
//!     Ok(())
//! }
//! ```

use crate::marketscout::agent::{AgentContext, AgentError, AgentInvoker, AgentRoster, AgentSpec};
use crate::marketscout::brief::ResearchBrief;
use crate::marketscout::config::{ResearchConfig, DEFAULT_AGENT_TIMEOUT};
use crate::marketscout::event::{EventHandler, ResearchEvent};
use crate::marketscout::ledger::{CostRates, CostSummary, TokenLedger};
use crate::marketscout::outcome::{split_token_usage, AgentOutcome};
use crate::marketscout::schema::SchemaRegistry;
use crate::marketscout::source_checker::{SourceCheckSummary, SourceChecker};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Key the source-check summary is stored under in exported results.
pub const SOURCE_CHECK_KEY: &str = "_source_check";

/// Human-readable label for a 0-based wave index of the default topology.
pub fn wave_description(index: usize) -> String {
    match index {
        0 => "Wave 1: Foundation - Finding communities and local context".to_string(),
        1 => "Wave 2: Deep Research - Voice mining, competitor profiling, pricing intel"
            .to_string(),
        2 => "Wave 3: Trends - Analyzing momentum and timing".to_string(),
        3 => "Wave 4: Synthesis - Combining all findings into report".to_string(),
        4 => "Wave 5: Verification - Checking all sources and claims".to_string(),
        n => format!("Wave {}", n + 1),
    }
}

/// Errors that indicate a misconfigured orchestrator rather than a failed agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchError {
    InvalidWaveIndex { index: usize, wave_count: usize },
    /// A wave or role names an agent missing from the roster.
    UnknownAgent(String),
    InvalidTopology(String),
}

impl fmt::Display for ResearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResearchError::InvalidWaveIndex { index, wave_count } => write!(
                f,
                "Invalid wave index {} (orchestrator has {} waves)",
                index, wave_count
            ),
            ResearchError::UnknownAgent(name) => write!(f, "Unknown agent: {}", name),
            ResearchError::InvalidTopology(msg) => write!(f, "Invalid topology: {}", msg),
        }
    }
}

impl Error for ResearchError {}

/// Ordered partition of agents into waves, plus the two context roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveTopology {
    waves: Vec<Vec<String>>,
    synthesizer: String,
    verifier: String,
}

impl Default for WaveTopology {
    fn default() -> Self {
        let wave = |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
        Self {
            waves: vec![
                wave(&["CommunityMapper", "LocalContext"]),
                wave(&["VoiceMiner", "CompetitorProfiler", "PricingIntel"]),
                wave(&["TrendDetector"]),
                wave(&["OpportunitySynthesizer"]),
                wave(&["SourceVerifier"]),
            ],
            synthesizer: "OpportunitySynthesizer".to_string(),
            verifier: "SourceVerifier".to_string(),
        }
    }
}

impl WaveTopology {
    pub fn new(
        waves: Vec<Vec<String>>,
        synthesizer: impl Into<String>,
        verifier: impl Into<String>,
    ) -> Self {
        Self {
            waves,
            synthesizer: synthesizer.into(),
            verifier: verifier.into(),
        }
    }

    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn wave(&self, index: usize) -> Option<&[String]> {
        self.waves.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.waves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    pub fn synthesizer(&self) -> &str {
        &self.synthesizer
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Every named agent must exist in `roster` and appear in exactly one
    /// wave; both roles must be scheduled, the verifier after the synthesizer.
    pub fn validate(&self, roster: &AgentRoster) -> Result<(), ResearchError> {
        let mut seen = HashSet::new();
        for (index, wave) in self.waves.iter().enumerate() {
            if wave.is_empty() {
                return Err(ResearchError::InvalidTopology(format!(
                    "wave {} is empty",
                    index + 1
                )));
            }
            for name in wave {
                if !roster.contains(name) {
                    return Err(ResearchError::UnknownAgent(name.clone()));
                }
                if !seen.insert(name.as_str()) {
                    return Err(ResearchError::InvalidTopology(format!(
                        "{} appears in more than one wave",
                        name
                    )));
                }
            }
        }

        let wave_of = |name: &str| self.waves.iter().position(|w| w.iter().any(|n| n == name));
        let synth_wave = wave_of(&self.synthesizer).ok_or_else(|| {
            ResearchError::InvalidTopology(format!(
                "synthesizer {} is not scheduled",
                self.synthesizer
            ))
        })?;
        let verifier_wave = wave_of(&self.verifier).ok_or_else(|| {
            ResearchError::InvalidTopology(format!("verifier {} is not scheduled", self.verifier))
        })?;
        if verifier_wave <= synth_wave {
            return Err(ResearchError::InvalidTopology(
                "verifier must run in a later wave than the synthesizer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a finished (or budget-stopped) run produced.
///
/// `results` holds agent outcomes only. Use [`ResearchRun::to_json`] for the
/// exported results shape, which adds the link check under `_source_check`.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Outcome per agent name.
    pub results: BTreeMap<String, AgentOutcome>,
    pub token_usage: TokenLedger,
    /// Link check of the synthesized report; `None` when it was skipped.
    pub source_check: Option<SourceCheckSummary>,
    pub cost: CostSummary,
    /// 0-based index of the wave that was skipped because the budget ran out.
    pub stopped_at_wave: Option<usize>,
}

impl ResearchRun {
    /// Results keyed by agent, with the link check under `_source_check`.
    /// This is the shape handed to the export layer.
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self
            .results
            .iter()
            .map(|(agent, outcome)| (agent.clone(), outcome.to_value()))
            .collect();
        if let Some(summary) = &self.source_check {
            if let Ok(value) = serde_json::to_value(summary) {
                map.insert(SOURCE_CHECK_KEY.to_string(), value);
            }
        }
        Value::Object(map)
    }

    /// Write [`to_json`](Self::to_json) to `path`, pretty-printed.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.to_json())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, bytes).await
    }

    pub fn budget_exhausted(&self) -> bool {
        self.stopped_at_wave.is_some()
    }
}

/// Drives a research brief through the agent waves.
///
/// One orchestrator holds the state of one run: results and token usage
/// accumulate across [`run_wave`](Self::run_wave) calls and are never reset.
pub struct ResearchOrchestrator {
    run_id: String,
    invoker: Arc<dyn AgentInvoker>,
    roster: AgentRoster,
    topology: WaveTopology,
    schemas: SchemaRegistry,
    agent_timeout: Duration,
    token_budget: u64,
    cost_rates: CostRates,
    source_checker: SourceChecker,
    event_handler: Option<Arc<dyn EventHandler>>,
    results: BTreeMap<String, AgentOutcome>,
    ledger: TokenLedger,
}

impl ResearchOrchestrator {
    /// Create an orchestrator with the eight default agents in five waves,
    /// a 180 s agent timeout, and no token budget.
    pub fn new(invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            invoker,
            roster: AgentRoster::default(),
            topology: WaveTopology::default(),
            schemas: SchemaRegistry::default(),
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            token_budget: 0,
            cost_rates: CostRates::default(),
            source_checker: SourceChecker::new(),
            event_handler: None,
            results: BTreeMap::new(),
            ledger: TokenLedger::new(),
        }
    }

    /// Apply timeout, budget and cost rates from `config`.
    pub fn with_config(mut self, config: &ResearchConfig) -> Self {
        self.agent_timeout = config.agent_timeout;
        self.token_budget = config.token_budget;
        self.cost_rates = config.cost_rates;
        self
    }

    /// Replace the roster and wave layout together. Fails if they disagree.
    pub fn with_topology(
        mut self,
        roster: AgentRoster,
        topology: WaveTopology,
    ) -> Result<Self, ResearchError> {
        topology.validate(&roster)?;
        self.roster = roster;
        self.topology = topology;
        Ok(self)
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    /// Token ceiling checked before each wave. `0` means unlimited.
    pub fn with_token_budget(mut self, token_budget: u64) -> Self {
        self.token_budget = token_budget;
        self
    }

    pub fn with_cost_rates(mut self, rates: CostRates) -> Self {
        self.cost_rates = rates;
        self
    }

    pub fn with_source_checker(mut self, checker: SourceChecker) -> Self {
        self.source_checker = checker;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn topology(&self) -> &WaveTopology {
        &self.topology
    }

    pub fn get_agent(&self, name: &str) -> Option<&AgentSpec> {
        self.roster.get(name)
    }

    pub fn wave_count(&self) -> usize {
        self.topology.len()
    }

    pub fn wave_description(&self, index: usize) -> String {
        wave_description(index)
    }

    /// Accumulated results of every wave run so far.
    pub fn results(&self) -> &BTreeMap<String, AgentOutcome> {
        &self.results
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    async fn emit(&self, event: ResearchEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_research_event(&event).await;
        }
    }

    fn context_for(&self, agent: &str) -> AgentContext {
        let synthesizer = self.topology.synthesizer();
        if agent == synthesizer {
            let findings = self
                .results
                .iter()
                .filter(|(name, _)| name.as_str() != synthesizer)
                .map(|(name, outcome)| (name.clone(), outcome.to_value()))
                .collect();
            AgentContext::Findings(findings)
        } else if agent == self.topology.verifier() {
            let report = self
                .results
                .get(synthesizer)
                .map(AgentOutcome::to_value)
                .unwrap_or_else(|| Value::Object(Map::new()));
            AgentContext::Report(report)
        } else {
            AgentContext::None
        }
    }

    /// Run one wave (0-based) and return its results.
    ///
    /// Every agent in the wave gets an entry, successful or not, and the
    /// entries are also merged into [`results`](Self::results).
    pub async fn run_wave(
        &mut self,
        wave_index: usize,
        brief: &ResearchBrief,
    ) -> Result<BTreeMap<String, AgentOutcome>, ResearchError> {
        let names = self
            .topology
            .wave(wave_index)
            .ok_or(ResearchError::InvalidWaveIndex {
                index: wave_index,
                wave_count: self.topology.len(),
            })?;
        let agents = names
            .iter()
            .map(|name| {
                self.roster
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ResearchError::UnknownAgent(name.clone()))
            })
            .collect::<Result<Vec<AgentSpec>, ResearchError>>()?;
        let contexts: Vec<AgentContext> = agents.iter().map(|a| self.context_for(&a.name)).collect();

        let description = wave_description(wave_index);
        log::info!("[{}] {}", self.run_id, description);
        self.emit(ResearchEvent::WaveStarted {
            run_id: self.run_id.clone(),
            wave_index,
            description,
            agents: agents.iter().map(|a| a.name.clone()).collect(),
        })
        .await;

        let timeout = self.agent_timeout;
        let brief = Arc::new(brief.clone());
        let handles: Vec<_> = agents
            .into_iter()
            .zip(contexts)
            .map(|(agent, context)| {
                let invoker = Arc::clone(&self.invoker);
                let brief = Arc::clone(&brief);
                let name = agent.name.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::timeout(timeout, invoker.invoke(&agent, &brief, &context)).await
                });
                (name, handle)
            })
            .collect();

        let mut wave_results = BTreeMap::new();
        for (name, handle) in handles {
            let outcome = match handle.await {
                Err(join_err) => {
                    log::error!("{} task failed: {}", name, join_err);
                    AgentOutcome::failed(format!("Agent task failed: {}", join_err))
                }
                Ok(Err(_)) | Ok(Ok(Err(AgentError::TimedOut))) => {
                    log::error!("{} timed out after {}s", name, timeout.as_secs());
                    AgentOutcome::failed(format!(
                        "Agent timed out after {}s",
                        timeout.as_secs()
                    ))
                }
                Ok(Ok(Err(e))) => {
                    log::error!("{} failed: {}", name, e);
                    AgentOutcome::failed(e.to_string())
                }
                Ok(Ok(Ok(raw))) => self.accept(&name, raw).await,
            };

            if let AgentOutcome::Failed(error) = &outcome {
                self.emit(ResearchEvent::AgentFailed {
                    run_id: self.run_id.clone(),
                    agent: name.clone(),
                    error: error.clone(),
                })
                .await;
            }
            self.results.insert(name.clone(), outcome.clone());
            wave_results.insert(name, outcome);
        }

        self.emit(ResearchEvent::WaveCompleted {
            run_id: self.run_id.clone(),
            wave_index,
            results: wave_results.clone(),
        })
        .await;
        Ok(wave_results)
    }

    /// Record usage, classify and validate a successful invocation.
    async fn accept(&mut self, agent: &str, raw: Value) -> AgentOutcome {
        let (clean, usage) = split_token_usage(&raw);
        if let Some(usage) = usage {
            self.ledger.record(agent, usage);
            log::info!(
                "{} used {} input + {} output tokens (running total: {})",
                agent,
                usage.input_tokens,
                usage.output_tokens,
                self.ledger.total_tokens()
            );
        }

        let outcome = AgentOutcome::from_value(clean.clone());
        match &outcome {
            AgentOutcome::Structured(_) => {
                for warning in self.schemas.validate(agent, &clean) {
                    log::warn!("Schema warning: {}", warning);
                }
                log::info!("{} completed", agent);
            }
            AgentOutcome::RawText(text) => {
                log::debug!("{} returned {} chars of unstructured text", agent, text.len());
            }
            AgentOutcome::Failed(error) => {
                log::error!("{} returned an error: {}", agent, error);
            }
        }

        if !outcome.is_error() {
            self.emit(ResearchEvent::AgentCompleted {
                run_id: self.run_id.clone(),
                agent: agent.to_string(),
                usage,
            })
            .await;
        }
        outcome
    }

    /// Run every wave in order, then check the report's links and summarize cost.
    ///
    /// Stops early, keeping partial results, when the token budget is reached
    /// at a wave boundary.
    pub async fn run_all(&mut self, brief: &ResearchBrief) -> Result<ResearchRun, ResearchError> {
        let started_at = Utc::now();
        log::info!(
            "[{}] Starting research run: {} waves, {} agents",
            self.run_id,
            self.topology.len(),
            self.roster.len()
        );
        self.emit(ResearchEvent::RunStarted {
            run_id: self.run_id.clone(),
            wave_count: self.topology.len(),
            agent_count: self.roster.len(),
        })
        .await;

        let mut stopped_at_wave = None;
        let mut waves_completed = 0;
        for wave_index in 0..self.topology.len() {
            let used = self.ledger.total_tokens();
            if self.token_budget > 0 && used >= self.token_budget {
                log::warn!(
                    "[{}] Token budget exhausted ({} / {}), stopping before wave {}",
                    self.run_id,
                    used,
                    self.token_budget,
                    wave_index + 1
                );
                self.emit(ResearchEvent::BudgetExhausted {
                    run_id: self.run_id.clone(),
                    next_wave: wave_index,
                    tokens_used: used,
                    token_budget: self.token_budget,
                })
                .await;
                stopped_at_wave = Some(wave_index);
                break;
            }
            self.run_wave(wave_index, brief).await?;
            waves_completed += 1;
        }

        let source_check = self.check_report_sources().await;

        let cost = self.ledger.summarize(&self.cost_rates);
        cost.log();
        self.emit(ResearchEvent::RunCompleted {
            run_id: self.run_id.clone(),
            waves_completed,
            cost: cost.clone(),
        })
        .await;
        log::info!("[{}] Research run finished", self.run_id);

        Ok(ResearchRun {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            results: self.results.clone(),
            token_usage: self.ledger.clone(),
            source_check,
            cost,
            stopped_at_wave,
        })
    }

    /// Best-effort link check of the synthesizer's report. Never fails the run.
    async fn check_report_sources(&self) -> Option<SourceCheckSummary> {
        let report = self
            .results
            .get(self.topology.synthesizer())
            .and_then(AgentOutcome::text_content);
        let report = match report {
            Some(report) => report,
            None => {
                log::info!("[{}] No synthesized report, skipping source check", self.run_id);
                self.emit(ResearchEvent::SourceCheckSkipped {
                    run_id: self.run_id.clone(),
                    reason: "no synthesized report".to_string(),
                })
                .await;
                return None;
            }
        };

        match self.source_checker.verify(&report).await {
            Ok(summary) => {
                self.emit(ResearchEvent::SourceCheckCompleted {
                    run_id: self.run_id.clone(),
                    summary: summary.clone(),
                })
                .await;
                Some(summary)
            }
            Err(e) => {
                log::warn!("[{}] Source verification failed: {}", self.run_id, e);
                self.emit(ResearchEvent::SourceCheckSkipped {
                    run_id: self.run_id.clone(),
                    reason: e.to_string(),
                })
                .await;
                None
            }
        }
    }
}
