//! AI agent collaborators
//!
//! The optimization agent expands questions, the answering agent writes the
//! final prose. Both are consumed through traits so the pipeline can be driven
//! by HTTP clients in production and scripted agents in tests.

pub mod client;

use async_trait::async_trait;

use crate::errors::Result;

pub use client::AgentClient;

/// Agent that expands a raw question into structured search terms
#[async_trait]
pub trait OptimizationAgent: Send + Sync {
    /// Returns the agent's raw reply, expected to contain a JSON object
    async fn optimize(&self, question: &str) -> Result<String>;
}

/// Agent that synthesizes an answer from a prompt
#[async_trait]
pub trait AnsweringAgent: Send + Sync {
    async fn answer(&self, prompt: &str) -> Result<String>;
}
