// Retrieval engine module
pub mod engine;

pub use engine::{keyword_query_text, semantic_query_text, Retriever};
