//! ItemRAG - Retrieval-Augmented Question Answering
//!
//! Answers a free-text question about a catalogue item by expanding it with an
//! optimization agent, running semantic and keyword hybrid searches against a
//! knowledge store, fusing both hit lists, assembling a tiered context and
//! handing it to an answering agent.
//!
//! # Architecture
//!
//! - **Collaborators**: `agents` and `store` (traits plus HTTP clients)
//! - **Pipeline**: `rag` stages and the orchestrating `RagPipeline`
//! - **Ambient**: errors, configuration, cancellation, per-run telemetry

pub mod errors;
pub mod types;
pub mod config;
pub mod cancel;

// Collaborators
pub mod agents;
pub mod store;

// Pipeline
pub mod rag;
pub mod telemetry;

// Command-line surface
pub mod cli;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::Config;
pub use errors::{RagError, Result};
pub use rag::RagPipeline;
pub use types::{ExpandedQuery, FusedResult, PipelineResult, RetrievalHit, Stage, Tier};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
