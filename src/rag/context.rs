// Context assembler: tiered, marker-annotated context block for the answering agent
use serde::{Deserialize, Serialize};

use crate::config::{ContextConfig, MAX_FUSED_RESULTS};
use crate::types::{FusedResult, Tier};

/// Header line opening every rendered context
pub const CONTEXT_HEADER: &str = "CONTEXT:";

/// Marker labelling the placeholder used when nothing relevant was found
pub const NO_CONTEXT_MARKER: &str = "[NO_CONTEXT]";

/// Rendered context when no results survive fusion
pub const NO_CONTEXT_TEXT: &str =
    "CONTEXT:\n\n[NO_CONTEXT] No relevant context found in the knowledge base.";

const UNTITLED: &str = "(untitled)";

/// Assembled context: the cited entries and their rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// Entries in render order (tier A, then B, then C); each carries its marker and tier
    pub entries: Vec<FusedResult>,
    /// Rendered text handed to the answering agent
    pub text: String,
}

impl ContextBlock {
    /// Block used when no results are available
    pub fn placeholder() -> Self {
        Self {
            entries: Vec::new(),
            text: NO_CONTEXT_TEXT.to_string(),
        }
    }

    /// Whether this block is the no-context placeholder
    pub fn is_placeholder(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of cited entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Buckets fused results into tiers and renders them
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    /// Create new assembler with default caps
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Tier of a fused result relative to the item being asked about
    pub fn classify(&self, result: &FusedResult, item_id: Option<&str>) -> Tier {
        if !result.hit.belongs_to(item_id) {
            Tier::C
        } else if result.final_score > self.config.tier_a_threshold {
            Tier::A
        } else {
            Tier::B
        }
    }

    /// Tier results (in their ranked order), cap each tier and render the block
    pub fn assemble_context(&self, results: &[FusedResult], item_id: Option<&str>) -> ContextBlock {
        let mut tiers: [Vec<FusedResult>; 3] = [Vec::new(), Vec::new(), Vec::new()];

        for result in results.iter().take(MAX_FUSED_RESULTS) {
            let tier = self.classify(result, item_id);
            let (slot, cap) = match tier {
                Tier::A => (0, self.config.tier_a_cap),
                Tier::B => (1, self.config.tier_b_cap),
                Tier::C => (2, self.config.tier_c_cap),
            };

            let bucket = &mut tiers[slot];
            if bucket.len() >= cap {
                continue;
            }

            let mut entry = result.clone();
            entry.tier = Some(tier);
            entry.marker = Some(tier.marker(bucket.len() + 1));
            bucket.push(entry);
        }

        let entries: Vec<FusedResult> = tiers.into_iter().flatten().collect();
        if entries.is_empty() {
            return ContextBlock::placeholder();
        }

        let text = self.render(&entries);
        ContextBlock { entries, text }
    }

    fn render(&self, entries: &[FusedResult]) -> String {
        let blocks: Vec<String> = entries
            .iter()
            .map(|entry| {
                let marker = entry.marker.as_deref().unwrap_or_default();
                let title = match entry.title().trim() {
                    "" => UNTITLED,
                    title => title,
                };
                let excerpt = truncate_chars(entry.excerpt().trim(), self.config.max_excerpt_chars);

                if excerpt.is_empty() {
                    format!("[{}] {}", marker, title)
                } else {
                    format!("[{}] {}\n{}", marker, title, excerpt)
                }
            })
            .collect();

        format!("{}\n\n{}", CONTEXT_HEADER, blocks.join("\n\n"))
    }

    /// Get current configuration
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut text to at most `max` characters, marking the cut with an ellipsis
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
    }
}
