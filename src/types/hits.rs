//! Retrieval hits and fused results

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hit produced by one retriever
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    /// Score from the vector-weighted search (0 when not retrieved semantically)
    #[serde(default)]
    pub score_semantic: f64,
    /// Score from the keyword-weighted search (0 when not retrieved by keywords)
    #[serde(default)]
    pub score_bm25: f64,
    #[serde(default)]
    pub source_item_id: Option<String>,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RetrievalHit {
    /// Whether this hit belongs to the given item
    pub fn belongs_to(&self, item_id: Option<&str>) -> bool {
        match (item_id, self.source_item_id.as_deref()) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => false,
        }
    }
}

/// Relevance/provenance tier of a context entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Same item, high score
    A,
    /// Same item, low score
    B,
    /// Everything else
    C,
}

impl Tier {
    /// Marker for the `n`-th (1-based) entry of this tier, e.g. `#A1`
    pub fn marker(self, n: usize) -> String {
        format!("#{}{}", self, n)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
        };
        f.write_str(letter)
    }
}

/// Hit after fusion, carrying the combined relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    #[serde(flatten)]
    pub hit: RetrievalHit,
    /// Normalized overlap between query tags and hit tags
    pub tag_match: f64,
    pub final_score: f64,
    /// Assigned once the result is placed into the context block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl FusedResult {
    pub fn id(&self) -> &str {
        &self.hit.id
    }

    pub fn title(&self) -> &str {
        &self.hit.title
    }

    pub fn excerpt(&self) -> &str {
        &self.hit.excerpt
    }
}
