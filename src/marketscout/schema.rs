//! Advisory validation of agent results against expected top-level keys.
//!
//! Validation never fails the caller. Every problem is reported as a
//! [`SchemaWarning`] that the orchestrator logs and otherwise ignores.
//!
//! ```
//! use marketscout::schema::validate_agent_result;
//! use serde_json::json;
//!
//! assert!(validate_agent_result("TrendDetector", &json!({"trends": ["ai agents"]})).is_empty());
//! assert!(validate_agent_result("TrendDetector", &json!({"error": "boom"})).is_empty());
//! assert_eq!(validate_agent_result("TrendDetector", &json!({"trends": null})).len(), 1);
//! ```

use crate::marketscout::outcome::{ERROR_KEY, TOKEN_USAGE_KEY};
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

lazy_static! {
    static ref DEFAULT_SCHEMAS: SchemaRegistry = SchemaRegistry::default();
}

/// One finding from [`SchemaRegistry::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaWarning {
    /// The result was not a JSON object. Carries the observed JSON type.
    NotAnObject { agent: String, found: &'static str },
    /// No schema is registered for this agent.
    UnknownAgent { agent: String },
    /// None of the expected keys is present.
    NoExpectedKeys {
        agent: String,
        found: Vec<String>,
        expected: Vec<String>,
    },
    /// An expected key is present but holds null, "", [] or {}.
    EmptyValue { agent: String, key: String },
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaWarning::NotAnObject { agent, found } => {
                write!(f, "{}: result is not an object (got {})", agent, found)
            }
            SchemaWarning::UnknownAgent { agent } => {
                write!(f, "{}: unknown agent type, cannot validate", agent)
            }
            SchemaWarning::NoExpectedKeys {
                agent,
                found,
                expected,
            } => write!(
                f,
                "{}: result has no expected keys. Got {:?}, expected at least one of {:?}",
                agent, found, expected
            ),
            SchemaWarning::EmptyValue { agent, key } => {
                write!(f, "{}: key '{}' is empty", agent, key)
            }
        }
    }
}

/// Expected top-level keys per agent type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRegistry {
    schemas: HashMap<String, BTreeSet<String>>,
}

impl Default for SchemaRegistry {
    /// The schemas of the eight research agents. Every set includes `response`,
    /// the fallback key for non-JSON model output.
    fn default() -> Self {
        Self::empty()
            .with_schema("CommunityMapper", &["communities", "platforms", "response"])
            .with_schema(
                "VoiceMiner",
                &["quotes", "pain_points", "desires", "language_patterns", "response"],
            )
            .with_schema(
                "PricingIntel",
                &["competitor_pricing", "market_rates", "willingness_to_pay", "response"],
            )
            .with_schema("CompetitorProfiler", &["competitors", "response"])
            .with_schema(
                "LocalContext",
                &["economic_context", "digital_landscape", "cultural_factors", "response"],
            )
            .with_schema("TrendDetector", &["trends", "search_trends", "funding", "response"])
            .with_schema(
                "OpportunitySynthesizer",
                &["report", "executive_summary", "response"],
            )
            .with_schema(
                "SourceVerifier",
                &["verification_score", "sources", "unsupported_claims", "response"],
            )
    }
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Register (or replace) the expected keys for `agent` (builder pattern).
    pub fn with_schema(mut self, agent: impl Into<String>, keys: &[&str]) -> Self {
        self.schemas
            .insert(agent.into(), keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn expected_keys(&self, agent: &str) -> Option<&BTreeSet<String>> {
        self.schemas.get(agent)
    }

    /// Check `result` against the schema registered for `agent`.
    ///
    /// Failure records (objects holding `error`) are always valid. The
    /// `_token_usage` key is neither expected nor unexpected. `0` and `false`
    /// count as values; only null, "", [] and {} count as empty.
    pub fn validate(&self, agent: &str, result: &Value) -> Vec<SchemaWarning> {
        let object = match result.as_object() {
            Some(object) => object,
            None => {
                return vec![SchemaWarning::NotAnObject {
                    agent: agent.to_string(),
                    found: json_type_name(result),
                }]
            }
        };

        if object.contains_key(ERROR_KEY) {
            return Vec::new();
        }

        let expected = match self.schemas.get(agent) {
            Some(expected) => expected,
            None => {
                return vec![SchemaWarning::UnknownAgent {
                    agent: agent.to_string(),
                }]
            }
        };

        let present: BTreeSet<&str> = object
            .keys()
            .map(String::as_str)
            .filter(|key| *key != TOKEN_USAGE_KEY)
            .collect();
        let matching: Vec<&str> = present
            .iter()
            .copied()
            .filter(|key| expected.contains(*key))
            .collect();

        let mut warnings = Vec::new();
        if matching.is_empty() {
            warnings.push(SchemaWarning::NoExpectedKeys {
                agent: agent.to_string(),
                found: present.iter().map(|k| k.to_string()).collect(),
                expected: expected.iter().cloned().collect(),
            });
        }

        for key in matching {
            if is_empty_value(&object[key]) {
                warnings.push(SchemaWarning::EmptyValue {
                    agent: agent.to_string(),
                    key: key.to_string(),
                });
            }
        }

        warnings
    }
}

/// Validate against the built-in research agent schemas.
pub fn validate_agent_result(agent: &str, result: &Value) -> Vec<SchemaWarning> {
    DEFAULT_SCHEMAS.validate(agent, result)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
