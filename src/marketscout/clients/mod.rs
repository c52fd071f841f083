//! Model provider implementations of [`AgentInvoker`](crate::agent::AgentInvoker).
//!
//! Each submodule speaks one vendor's API while honouring the invocation
//! contract the orchestrator relies on: findings as a JSON object, a
//! `{"response": text}` fallback, and an embedded `_token_usage` record.

pub mod anthropic;
