//! Expanded query produced by the question optimizer
//!
//! Every field defaults to its empty value when the agent omits it or sends
//! `null`, so the rest of the pipeline never deals with missing data.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Structured expansion of a free-text question
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandedQuery {
    /// Detected language of the question (e.g. "de", "en")
    #[serde(deserialize_with = "null_as_default")]
    pub language: String,

    /// Core search phrase
    #[serde(deserialize_with = "null_as_default")]
    pub core: String,

    /// Alternative terms for the core phrase, most relevant first
    #[serde(deserialize_with = "null_as_default")]
    pub synonyms: Vec<String>,

    /// Multi-word phrases worth matching verbatim
    #[serde(deserialize_with = "null_as_default")]
    pub phrases: Vec<String>,

    /// Named entities keyed by entity type
    #[serde(deserialize_with = "null_as_default")]
    pub entities: BTreeMap<String, String>,

    /// Topic tags used for tag matching during fusion
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,

    /// Terms that must not be searched for
    #[serde(deserialize_with = "null_as_default")]
    pub ban: Vec<String>,

    /// Suggested follow-up questions for the caller
    #[serde(deserialize_with = "null_as_default")]
    pub followup_questions: Vec<String>,
}

/// Treat an explicit `null` like a missing field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExpandedQuery {
    /// Trivial expansion used when the optimization agent is unavailable
    pub fn fallback(question: &str) -> Self {
        Self {
            core: question.trim().to_string(),
            ..Default::default()
        }
    }

    /// Trim, drop empty entries and deduplicate lists.
    ///
    /// An empty core phrase is replaced with the trimmed question.
    pub fn normalized(self, question: &str) -> Self {
        let core = match self.core.trim() {
            "" => question.trim().to_string(),
            core => core.to_string(),
        };

        let entities = self
            .entities
            .into_iter()
            .filter_map(|(kind, value)| {
                let (kind, value) = (kind.trim().to_string(), value.trim().to_string());
                (!kind.is_empty() && !value.is_empty()).then_some((kind, value))
            })
            .collect();

        Self {
            language: self.language.trim().to_lowercase(),
            core,
            synonyms: clean_terms(self.synonyms),
            phrases: clean_terms(self.phrases),
            entities,
            tags: clean_terms(self.tags),
            ban: clean_terms(self.ban),
            followup_questions: clean_terms(self.followup_questions),
        }
    }

    /// Check whether a term is on the ban list (case-insensitive)
    pub fn is_banned(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.ban.iter().any(|banned| banned.to_lowercase() == term)
    }
}

/// Trim entries, drop empties and remove case-insensitive duplicates, keeping order
fn clean_terms(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty() && seen.insert(term.to_lowercase()))
        .collect()
}
