//! Question optimizer: expands a raw question via the optimization agent
use std::sync::Arc;
use std::time::Duration;

use crate::agents::OptimizationAgent;
use crate::errors::{RagError, Result};
use crate::rag::with_timeout;
use crate::types::{ExpandedQuery, Stage};

/// Expands questions into `ExpandedQuery` values
pub struct QuestionOptimizer {
    agent: Arc<dyn OptimizationAgent>,
    timeout: Duration,
}

impl QuestionOptimizer {
    /// Create new optimizer
    pub fn new(agent: Arc<dyn OptimizationAgent>, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Ask the agent for an expansion, reporting any failure
    pub async fn try_optimize(&self, question: &str) -> Result<ExpandedQuery> {
        let raw = with_timeout(Stage::Optimize, self.timeout, self.agent.optimize(question)).await?;
        parse_expansion(&raw, question)
    }

    /// Expand a question, falling back to the trimmed question on any failure
    pub async fn optimize_question(&self, question: &str) -> ExpandedQuery {
        match self.try_optimize(question).await {
            Ok(expanded) => expanded,
            Err(e) => {
                tracing::warn!(error = %e, "Question optimization failed, using fallback");
                ExpandedQuery::fallback(question)
            }
        }
    }
}

/// Decode the agent's reply into a normalized expansion
pub fn parse_expansion(raw: &str, question: &str) -> Result<ExpandedQuery> {
    let json = extract_json_object(raw).ok_or_else(|| {
        RagError::InvalidResponse("Optimizer reply contains no JSON object".to_string())
    })?;

    let expanded: ExpandedQuery = serde_json::from_str(json)?;
    Ok(expanded.normalized(question))
}

/// Find the first balanced top-level JSON object in free text.
///
/// Braces inside string literals are ignored, so prose or code fences around
/// the object do not matter.
fn extract_json_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|s| &text[s..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
