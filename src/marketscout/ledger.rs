//! Per-agent token accounting and cost estimation.

use crate::marketscout::outcome::TokenUsage;
use serde::Serialize;
use std::collections::BTreeMap;

/// Dollar rates per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostRates {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for CostRates {
    /// Claude Sonnet list pricing: $3 in, $15 out.
    fn default() -> Self {
        Self {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }
    }
}

impl CostRates {
    pub fn estimate(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (usage.output_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

/// Accumulated usage per agent. Only ever grows during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenLedger {
    entries: BTreeMap<String, TokenUsage>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `usage` to the agent's entry and return the agent's new total.
    pub fn record(&mut self, agent: &str, usage: TokenUsage) -> TokenUsage {
        let entry = self.entries.entry(agent.to_string()).or_default();
        *entry += usage;
        *entry
    }

    pub fn get(&self, agent: &str) -> Option<&TokenUsage> {
        self.entries.get(agent)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TokenUsage)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of input and output counts over every agent.
    pub fn totals(&self) -> TokenUsage {
        let mut sum = TokenUsage::default();
        for usage in self.entries.values() {
            sum += *usage;
        }
        sum
    }

    pub fn total_tokens(&self) -> u64 {
        self.totals().total()
    }

    pub fn summarize(&self, rates: &CostRates) -> CostSummary {
        let totals = self.totals();
        CostSummary {
            input_tokens: totals.input_tokens,
            output_tokens: totals.output_tokens,
            estimated_cost_usd: rates.estimate(&totals),
            per_agent: self
                .entries
                .iter()
                .map(|(agent, usage)| {
                    (
                        agent.clone(),
                        AgentCost {
                            input_tokens: usage.input_tokens,
                            output_tokens: usage.output_tokens,
                            estimated_cost_usd: rates.estimate(usage),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentCost {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
}

/// Totals and per-agent breakdown logged at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostSummary {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost_usd: f64,
    pub per_agent: BTreeMap<String, AgentCost>,
}

impl CostSummary {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Emit the summary through the `log` facade.
    pub fn log(&self) {
        log::info!(
            "Token usage: {} input, {} output, {} total (estimated cost ${:.4})",
            self.input_tokens,
            self.output_tokens,
            self.total_tokens(),
            self.estimated_cost_usd
        );
        for (agent, cost) in &self.per_agent {
            log::info!(
                "  {}: {} input, {} output (${:.4})",
                agent,
                cost.input_tokens,
                cost.output_tokens,
                cost.estimated_cost_usd
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates() {
        let mut ledger = TokenLedger::new();
        ledger.record("VoiceMiner", TokenUsage::new(100, 20));
        let total = ledger.record("VoiceMiner", TokenUsage::new(50, 5));

        assert_eq!(total, TokenUsage::new(150, 25));
        assert_eq!(ledger.total_tokens(), 175);
    }

    #[test]
    fn test_cost_estimate() {
        let rates = CostRates::default();
        let cost = rates.estimate(&TokenUsage::new(1_000_000, 1_000_000));
        assert!((cost - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_breakdown() {
        let mut ledger = TokenLedger::new();
        ledger.record("A", TokenUsage::new(2_000_000, 0));
        ledger.record("B", TokenUsage::new(0, 100_000));

        let summary = ledger.summarize(&CostRates::default());

        assert_eq!(summary.total_tokens(), 2_100_000);
        assert!((summary.estimated_cost_usd - 7.5).abs() < 1e-9);
        assert!((summary.per_agent["B"].estimated_cost_usd - 1.5).abs() < 1e-9);
    }
}
