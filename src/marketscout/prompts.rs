//! Prompt text for each research role.
//!
//! [`build_prompt`] picks a template from the agent name and the context it
//! was handed. Agents without a dedicated template get the generic one.

use crate::marketscout::agent::{AgentContext, AgentSpec};
use crate::marketscout::brief::ResearchBrief;
use serde_json::Value;
use std::collections::BTreeMap;

/// Render the prompt for `agent`.
///
/// Findings context selects the synthesis template and report context the
/// verification template, whatever the agent is called.
pub fn build_prompt(agent: &AgentSpec, brief: &ResearchBrief, context: &AgentContext) -> String {
    match context {
        AgentContext::Findings(findings) => synthesis_prompt(agent, brief, findings),
        AgentContext::Report(report) => verification_prompt(agent, brief, report),
        AgentContext::None => match agent.name.as_str() {
            "CommunityMapper" => community_prompt(agent, brief),
            "CompetitorProfiler" => competitor_prompt(agent, brief),
            _ => generic_prompt(agent, brief),
        },
    }
}

fn generic_prompt(agent: &AgentSpec, brief: &ResearchBrief) -> String {
    format!(
        "You are {name}, a specialized market research agent.\n\n\
         Mission: {mission}\n\n\
         Research depth: {depth}\n\n\
         ## Research Brief\n\n{brief}\n\n\
         Conduct your research and return your findings as a single JSON object.\n",
        name = agent.name,
        mission = agent.mission,
        depth = brief.depth(),
        brief = brief.to_markdown(),
    )
}

fn community_prompt(agent: &AgentSpec, brief: &ResearchBrief) -> String {
    format!(
        "You are {name}, a specialized market research agent.\n\n\
         Mission: {mission}\n\n\
         ## Research Brief\n\n\
         **Target Customer:** {customer}\n\
         **Geography:** {geography}\n\
         **Topic:** {what} - {problem}\n\
         **Primary Question:** {question}\n\n\
         ## Your Task\n\n\
         Find the communities where {customer} in {geography} talk about {what}. Cover \
         Reddit, X/Twitter, Facebook groups, LinkedIn groups, YouTube channels, \
         Discord and Telegram servers, and niche forums.\n\n\
         For each community give its platform and URL, size and activity, a relevance \
         score from 1 to 5, sample content showing why it is relevant, and the key \
         voices worth following.\n\n\
         Return a JSON object with `communities` and `platforms` keys.\n",
        name = agent.name,
        mission = agent.mission,
        customer = brief.target_customer(),
        geography = brief.geography(),
        what = brief.offering_what(),
        problem = brief.offering_problem(),
        question = brief.primary_question(),
    )
}

fn competitor_prompt(agent: &AgentSpec, brief: &ResearchBrief) -> String {
    let known = if brief.known_competitors().is_empty() {
        "None specified".to_string()
    } else {
        brief.known_competitors().join(", ")
    };
    format!(
        "You are {name}, a specialized market research agent.\n\n\
         Mission: {mission}\n\n\
         ## Research Brief\n\n\
         **Offering:** {what}\n\
         **Target Customer:** {customer}\n\
         **Geography:** {geography}\n\
         **Known Competitors:** {known}\n\n\
         ## Your Task\n\n\
         Start from the known competitors ({known}) and find the ones the brief missed. \
         For each, research background, offering and features, pricing and packaging, \
         positioning, target audience, reviews, strengths and weaknesses. Close with the \
         gaps and white space you see.\n\n\
         Return a JSON object with a `competitors` key.\n",
        name = agent.name,
        mission = agent.mission,
        what = brief.offering_what(),
        customer = brief.target_customer(),
        geography = brief.geography(),
        known = known,
    )
}

fn synthesis_prompt(
    agent: &AgentSpec,
    brief: &ResearchBrief,
    findings: &BTreeMap<String, Value>,
) -> String {
    let sections: Vec<String> = findings
        .iter()
        .map(|(name, data)| format!("### {}\n{}", name, data))
        .collect();
    format!(
        "You are {name}, the final research agent.\n\n\
         Mission: {mission}\n\n\
         ## Research Brief\n\n{brief}\n\n\
         ## Findings from Other Agents\n\n{findings}\n\n\
         ## Your Task\n\n\
         Write a professional market research report with these sections: Executive \
         Summary, Research Methodology, Market Landscape, Customer Deep Dive, Competitive \
         Analysis, Pricing & Willingness to Pay, Go-to-Market Considerations, Strategic \
         Recommendations, Appendices.\n\n\
         Back every claim with evidence from the findings and cite source URLs inline. \
         Keep the primary question in focus: {question}\n\n\
         Return a JSON object with `executive_summary` and `report` (markdown) keys.\n",
        name = agent.name,
        mission = agent.mission,
        brief = brief.to_markdown(),
        findings = sections.join("\n\n"),
        question = brief.primary_question(),
    )
}

fn verification_prompt(agent: &AgentSpec, brief: &ResearchBrief, report: &Value) -> String {
    let report_text = match report.get("report").and_then(Value::as_str) {
        Some(text) => text.to_string(),
        None => report.to_string(),
    };
    format!(
        "You are {name}, a research quality reviewer.\n\n\
         Mission: {mission}\n\n\
         ## Primary Question\n\n{question}\n\n\
         ## Report Under Review\n\n{report}\n\n\
         ## Your Task\n\n\
         List every source the report cites and judge whether it supports the claim it \
         is attached to. Flag claims that have no supporting source.\n\n\
         Return a JSON object with `verification_score` (0-100), `sources` and \
         `unsupported_claims` keys.\n",
        name = agent.name,
        mission = agent.mission,
        question = brief.primary_question(),
        report = report_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketscout::agent::AgentRoster;
    use serde_json::json;

    fn brief() -> ResearchBrief {
        ResearchBrief::builder(
            "Bookkeeping app",
            "Messy receipts",
            "Freelancers",
            "Lagos",
            "Will they pay monthly?",
        )
        .build()
        .unwrap()
    }

    #[test]
    fn test_competitor_prompt_without_known_competitors() {
        let roster = AgentRoster::default();
        let agent = roster.get("CompetitorProfiler").unwrap();
        let prompt = build_prompt(agent, &brief(), &AgentContext::None);
        assert!(prompt.contains("**Known Competitors:** None specified"));
    }

    #[test]
    fn test_synthesis_prompt_lists_findings() {
        let roster = AgentRoster::default();
        let agent = roster.get("OpportunitySynthesizer").unwrap();
        let mut findings = BTreeMap::new();
        findings.insert("VoiceMiner".to_string(), json!({"quotes": ["too many receipts"]}));

        let prompt = build_prompt(agent, &brief(), &AgentContext::Findings(findings));

        assert!(prompt.contains("### VoiceMiner"));
        assert!(prompt.contains("too many receipts"));
    }

    #[test]
    fn test_verification_prompt_embeds_report_text() {
        let roster = AgentRoster::default();
        let agent = roster.get("SourceVerifier").unwrap();
        let report = json!({"report": "# Findings\nSee https://example.com"});

        let prompt = build_prompt(agent, &brief(), &AgentContext::Report(report));

        assert!(prompt.contains("# Findings\nSee https://example.com"));
    }
}
