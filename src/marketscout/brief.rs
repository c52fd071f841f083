//! Research brief captured at intake time.
//!
//! A [`ResearchBrief`] is validated once when it is built and is read-only afterwards.
//! Construction goes through [`ResearchBriefBuilder`], either directly or by
//! deserializing JSON (deserialization runs the same validation).
//!
//! # Example
//!
//! ```
//! use marketscout::brief::{Depth, ResearchBrief};
//!
//! let brief = ResearchBrief::builder(
//!     "productivity app",
//!     "designers waste time on admin",
//!     "freelance designers",
//!     "United States",
//!     "What features matter most?",
//! )
//! .known_competitors(vec!["Notion".into(), "Asana".into()])
//! .depth(Depth::Overview)
//! .build()
//! .unwrap();
//!
//! assert_eq!(brief.geography(), "United States");
//! assert!(brief.to_markdown().contains("Notion, Asana"));
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How much effort the agents should spend on the research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Overview,
    Thorough,
    DeepDive,
}

impl Default for Depth {
    fn default() -> Self {
        Depth::Thorough
    }
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Overview => "overview",
            Depth::Thorough => "thorough",
            Depth::DeepDive => "deep_dive",
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Depth::Overview),
            "thorough" => Ok(Depth::Thorough),
            "deep_dive" => Ok(Depth::DeepDive),
            other => Err(BriefError::InvalidDepth(other.to_string())),
        }
    }
}

/// Errors raised while building or loading a brief.
#[derive(Debug)]
pub enum BriefError {
    /// A required text field was empty after trimming. Carries the field label.
    EmptyField(&'static str),
    /// `depth` was not one of `overview`, `thorough`, `deep_dive`.
    InvalidDepth(String),
    /// The brief file could not be read.
    Io(std::io::Error),
    /// The brief file was not valid JSON or failed validation.
    Parse(String),
}

impl fmt::Display for BriefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BriefError::EmptyField(label) => write!(f, "{} cannot be empty", label),
            BriefError::InvalidDepth(depth) => write!(
                f,
                "depth must be one of overview, thorough, deep_dive, got '{}'",
                depth
            ),
            BriefError::Io(e) => write!(f, "Failed to read brief: {}", e),
            BriefError::Parse(msg) => write!(f, "Failed to parse brief: {}", msg),
        }
    }
}

impl Error for BriefError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BriefError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// The user's intake answers. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResearchBriefBuilder")]
pub struct ResearchBrief {
    offering_what: String,
    offering_problem: String,
    target_customer: String,
    geography: String,
    primary_question: String,
    offering_delivery: Option<String>,
    offering_pricing_model: Option<String>,
    customer_conversations: Option<String>,
    segments_include_exclude: Option<String>,
    known_competitors: Vec<String>,
    opportunity_thesis: Option<String>,
    stage: Option<String>,
    resources: Option<String>,
    kill_criteria: Option<String>,
    already_known: Option<String>,
    depth: Depth,
}

/// Unvalidated brief fields. Call [`build`](ResearchBriefBuilder::build) to validate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResearchBriefBuilder {
    offering_what: String,
    offering_problem: String,
    target_customer: String,
    geography: String,
    primary_question: String,
    #[serde(default)]
    offering_delivery: Option<String>,
    #[serde(default)]
    offering_pricing_model: Option<String>,
    #[serde(default)]
    customer_conversations: Option<String>,
    #[serde(default)]
    segments_include_exclude: Option<String>,
    #[serde(default)]
    known_competitors: Vec<String>,
    #[serde(default)]
    opportunity_thesis: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    resources: Option<String>,
    #[serde(default)]
    kill_criteria: Option<String>,
    #[serde(default)]
    already_known: Option<String>,
    #[serde(default)]
    depth: Depth,
}

impl ResearchBriefBuilder {
    pub fn offering_delivery(mut self, value: impl Into<String>) -> Self {
        self.offering_delivery = Some(value.into());
        self
    }

    pub fn offering_pricing_model(mut self, value: impl Into<String>) -> Self {
        self.offering_pricing_model = Some(value.into());
        self
    }

    pub fn customer_conversations(mut self, value: impl Into<String>) -> Self {
        self.customer_conversations = Some(value.into());
        self
    }

    pub fn segments_include_exclude(mut self, value: impl Into<String>) -> Self {
        self.segments_include_exclude = Some(value.into());
        self
    }

    pub fn known_competitors(mut self, competitors: Vec<String>) -> Self {
        self.known_competitors = competitors;
        self
    }

    pub fn opportunity_thesis(mut self, value: impl Into<String>) -> Self {
        self.opportunity_thesis = Some(value.into());
        self
    }

    /// One of exploring, committed, expanding, entering. Not validated.
    pub fn stage(mut self, value: impl Into<String>) -> Self {
        self.stage = Some(value.into());
        self
    }

    pub fn resources(mut self, value: impl Into<String>) -> Self {
        self.resources = Some(value.into());
        self
    }

    pub fn kill_criteria(mut self, value: impl Into<String>) -> Self {
        self.kill_criteria = Some(value.into());
        self
    }

    pub fn already_known(mut self, value: impl Into<String>) -> Self {
        self.already_known = Some(value.into());
        self
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    /// Validate and freeze the brief.
    ///
    /// Required fields are trimmed and must be non-empty. Optional fields are
    /// trimmed and dropped when blank.
    pub fn build(self) -> Result<ResearchBrief, BriefError> {
        Ok(ResearchBrief {
            offering_what: required(self.offering_what, "What you're building")?,
            offering_problem: required(self.offering_problem, "Problem it solves")?,
            target_customer: required(self.target_customer, "Target customer")?,
            geography: required(self.geography, "Geography/market")?,
            primary_question: required(self.primary_question, "Primary research question")?,
            offering_delivery: optional(self.offering_delivery),
            offering_pricing_model: optional(self.offering_pricing_model),
            customer_conversations: optional(self.customer_conversations),
            segments_include_exclude: optional(self.segments_include_exclude),
            known_competitors: self.known_competitors,
            opportunity_thesis: optional(self.opportunity_thesis),
            stage: optional(self.stage),
            resources: optional(self.resources),
            kill_criteria: optional(self.kill_criteria),
            already_known: optional(self.already_known),
            depth: self.depth,
        })
    }
}

impl TryFrom<ResearchBriefBuilder> for ResearchBrief {
    type Error = BriefError;

    fn try_from(builder: ResearchBriefBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

fn required(value: String, label: &'static str) -> Result<String, BriefError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BriefError::EmptyField(label));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ResearchBrief {
    /// Start a brief from the five required answers.
    pub fn builder(
        offering_what: impl Into<String>,
        offering_problem: impl Into<String>,
        target_customer: impl Into<String>,
        geography: impl Into<String>,
        primary_question: impl Into<String>,
    ) -> ResearchBriefBuilder {
        ResearchBriefBuilder {
            offering_what: offering_what.into(),
            offering_problem: offering_problem.into(),
            target_customer: target_customer.into(),
            geography: geography.into(),
            primary_question: primary_question.into(),
            ..Default::default()
        }
    }

    /// Read and validate a JSON brief file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BriefError> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(BriefError::Io)?;
        serde_json::from_str(&raw).map_err(|e| BriefError::Parse(e.to_string()))
    }

    pub fn offering_what(&self) -> &str {
        &self.offering_what
    }

    pub fn offering_problem(&self) -> &str {
        &self.offering_problem
    }

    pub fn target_customer(&self) -> &str {
        &self.target_customer
    }

    pub fn geography(&self) -> &str {
        &self.geography
    }

    pub fn primary_question(&self) -> &str {
        &self.primary_question
    }

    pub fn offering_delivery(&self) -> Option<&str> {
        self.offering_delivery.as_deref()
    }

    pub fn offering_pricing_model(&self) -> Option<&str> {
        self.offering_pricing_model.as_deref()
    }

    pub fn customer_conversations(&self) -> Option<&str> {
        self.customer_conversations.as_deref()
    }

    pub fn segments_include_exclude(&self) -> Option<&str> {
        self.segments_include_exclude.as_deref()
    }

    pub fn known_competitors(&self) -> &[String] {
        &self.known_competitors
    }

    pub fn opportunity_thesis(&self) -> Option<&str> {
        self.opportunity_thesis.as_deref()
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn resources(&self) -> Option<&str> {
        self.resources.as_deref()
    }

    pub fn kill_criteria(&self) -> Option<&str> {
        self.kill_criteria.as_deref()
    }

    pub fn already_known(&self) -> Option<&str> {
        self.already_known.as_deref()
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Serialized form handed to agents and the export layer.
    pub fn to_json(&self) -> serde_json::Value {
        // A struct of strings, lists and unit enums always serializes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Render the brief as a markdown document, omitting absent optional answers.
    pub fn to_markdown(&self) -> String {
        let mut lines = vec![
            "# Research Brief".to_string(),
            String::new(),
            "## The Offering".to_string(),
            format!("- **What:** {}", self.offering_what),
            format!("- **Problem Solved:** {}", self.offering_problem),
        ];
        push_optional(&mut lines, "Delivery Model", &self.offering_delivery);
        push_optional(&mut lines, "Pricing Model", &self.offering_pricing_model);

        lines.push(String::new());
        lines.push("## Customer Hypothesis".to_string());
        lines.push(format!("- **Target Customer:** {}", self.target_customer));
        push_optional(&mut lines, "Customer Conversations", &self.customer_conversations);
        push_optional(&mut lines, "Include/Exclude", &self.segments_include_exclude);

        lines.push(String::new());
        lines.push("## Market Context".to_string());
        lines.push(format!("- **Geography:** {}", self.geography));
        if !self.known_competitors.is_empty() {
            lines.push(format!(
                "- **Known Competitors:** {}",
                self.known_competitors.join(", ")
            ));
        }
        push_optional(&mut lines, "Opportunity Thesis", &self.opportunity_thesis);

        lines.push(String::new());
        lines.push("## Business Reality".to_string());
        push_optional(&mut lines, "Stage", &self.stage);
        push_optional(&mut lines, "Resources", &self.resources);

        lines.push(String::new());
        lines.push("## Research Priorities".to_string());
        lines.push(format!("- **#1 Question:** {}", self.primary_question));
        push_optional(&mut lines, "Kill Criteria", &self.kill_criteria);
        push_optional(&mut lines, "Already Known", &self.already_known);

        lines.join("\n")
    }
}

fn push_optional(lines: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = value {
        lines.push(format!("- **{}:** {}", label, value));
    }
}
