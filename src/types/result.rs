//! Terminal pipeline result returned to the caller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{ExpandedQuery, FusedResult};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Optimize,
    RetrieveSemantic,
    RetrieveKeyword,
    Fuse,
    Assemble,
    Answer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Optimize => "optimize",
            Stage::RetrieveSemantic => "retrieve_semantic",
            Stage::RetrieveKeyword => "retrieve_keyword",
            Stage::Fuse => "fuse",
            Stage::Assemble => "assemble",
            Stage::Answer => "answer",
        };
        f.write_str(name)
    }
}

/// Wall-clock seconds spent per stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub optimize: f64,
    /// Both retrievers, which run concurrently
    pub retrieve: f64,
    pub fuse: f64,
    pub assemble: f64,
    pub answer: f64,
}

/// Outcome of one `process_question` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// An answer was produced by the answering agent and the run was not cancelled
    pub success: bool,
    pub cancelled: bool,
    pub answer: String,
    pub question: String,
    pub expanded: ExpandedQuery,
    pub hits_sem: usize,
    pub hits_kw: usize,
    pub hits_final: usize,
    /// Results cited in the context block, in marker order
    pub sources: Vec<FusedResult>,
    pub context: String,
    /// Total wall-clock seconds
    pub total_time: f64,
    pub token_estimate: usize,
    pub timings: StageTimings,
    /// Stages that took their fallback path
    pub degraded: Vec<Stage>,
}

impl PipelineResult {
    /// Coarse token estimate for a rendered context (4 characters per token)
    pub fn estimate_tokens(context: &str) -> usize {
        context.chars().count() / 4
    }

    /// Whether any stage fell back
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}
