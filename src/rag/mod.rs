//! Retrieval-augmented question answering
//!
//! Stages, in order:
//! - Optimizer: expand the question into structured search terms
//! - Retrieval: semantic and keyword hybrid searches against the store
//! - Re-ranking: fuse both hit lists into one deterministic ranking
//! - Context: tier the top results and render a marker-annotated block
//! - Answer: hand question and context to the answering agent
//! - Pipeline: end-to-end orchestration with per-stage fallbacks

pub mod optimizer;
pub mod retrieval;
pub mod reranking;
pub mod context;
pub mod answer;
pub mod pipeline;

use std::future::Future;
use std::time::Duration;

use crate::errors::{RagError, Result};
use crate::types::Stage;

// Re-export key types
pub use optimizer::QuestionOptimizer;
pub use retrieval::Retriever;
pub use reranking::FusionReranker;
pub use context::{ContextAssembler, ContextBlock};
pub use answer::AnswerGenerator;
pub use pipeline::RagPipeline;

/// Bound a collaborator call, turning an elapsed deadline into `RagError::Timeout`
pub(crate) async fn with_timeout<T, F>(stage: Stage, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RagError::Timeout {
            stage: stage.to_string(),
            duration_ms: limit.as_millis() as u64,
        }),
    }
}
