// Fusion re-ranking module
pub mod scorer;

pub use scorer::{tag_match, FusionReranker};
