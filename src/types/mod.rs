//! Type definitions module
//!
//! Data transfer objects flowing between the pipeline stages.

pub mod query;
pub mod hits;
pub mod result;

// Re-export commonly used types
pub use query::ExpandedQuery;
pub use hits::{FusedResult, RetrievalHit, Tier};
pub use result::{PipelineResult, Stage, StageTimings};
